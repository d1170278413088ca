// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered, type-constrained, observable value sequences.

use alloc::vec::Vec;
use core::mem;

use crate::error::{CollectionError, IterInvalidated};
use crate::heap::{Notification, ObjectHeap, ObjectId};
use crate::registry::PropertyId;
use crate::value::{Value, ValueKind};

/// One structural or in-place collection mutation, as carried by
/// [`Notification::CollectionChanged`].
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionChange {
    /// An element was inserted at `index`.
    Added {
        /// The insertion index after clamping.
        index: usize,
    },
    /// The element at `index` was removed.
    Removed {
        /// The index the element was removed from.
        index: usize,
        /// A copy of the removed value, without a reference count of its
        /// own.
        value: Value,
    },
    /// The element at `index` was replaced in place.
    Replaced {
        /// The replaced index.
        index: usize,
    },
    /// All elements are about to be removed.
    Clearing,
    /// All elements were removed.
    Cleared {
        /// How many elements were removed.
        removed: usize,
    },
}

/// An ordered sequence of same-kind [`Value`]s owned by one object.
///
/// Object elements are adopted on insertion: the collection takes a
/// reference, sets the element's logical parent to the collection's owner,
/// and propagates the owner's surface tag. Removal undoes all three.
///
/// Structural mutations bump a generation counter. Outstanding
/// [`CollectionIterator`]s compare against it and fail instead of walking a
/// mutated sequence, and the z-order cache uses it to decide staleness.
#[derive(Debug)]
pub struct Collection {
    element_kind: ValueKind,
    owner: Option<ObjectId>,
    items: Vec<Value>,
    generation: u64,
    z_sorted: Vec<ObjectId>,
    /// The generation [`Collection::z_sorted`] was computed at; `None` means
    /// the cache is explicitly invalid.
    z_generation: Option<u64>,
}

impl Collection {
    /// Creates an empty, unowned collection of `element_kind` values.
    #[must_use]
    pub fn new(element_kind: ValueKind) -> Self {
        Self {
            element_kind,
            owner: None,
            items: Vec::new(),
            generation: 0,
            z_sorted: Vec::new(),
            z_generation: None,
        }
    }

    /// Creates an empty collection whose object elements adopt `owner` as
    /// their logical parent.
    #[must_use]
    pub fn with_owner(element_kind: ValueKind, owner: ObjectId) -> Self {
        let mut collection = Self::new(element_kind);
        collection.owner = Some(owner);
        collection
    }

    /// Returns the accepted element kind.
    #[must_use]
    pub fn element_kind(&self) -> ValueKind {
        self.element_kind
    }

    /// Returns the owning object, if any.
    #[must_use]
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the structural generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the element at `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Like [`Collection::value_at`], but reports the failing index and the
    /// length.
    pub fn try_value_at(&self, index: usize) -> Result<&Value, CollectionError> {
        self.items.get(index).ok_or(CollectionError::OutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Returns the object id at `index`, if the element there is an object.
    #[must_use]
    pub fn object_at(&self, index: usize) -> Option<ObjectId> {
        self.items.get(index)?.as_object()
    }

    /// Returns the index of the first element equal to `value`.
    #[must_use]
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    /// Iterates the object ids among the elements, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.items.iter().filter_map(Value::as_object)
    }

    /// Creates a snapshot iterator over the current contents.
    #[must_use]
    pub fn iter(&self) -> CollectionIterator {
        CollectionIterator::new(self)
    }

    /// Appends `value`, returning its index.
    ///
    /// Returns `None` (and logs) when the element is rejected; see
    /// [`Collection::insert`] for the rejection rules.
    pub fn add(&mut self, heap: &mut ObjectHeap, value: Value) -> Option<usize> {
        let index = self.items.len();
        match self.insert(heap, index, value) {
            Ok(()) => Some(index),
            Err(err) => {
                log::warn!("collection add rejected: {err}");
                None
            }
        }
    }

    /// Inserts `value` at `index`, clamped to `[0, len]`.
    ///
    /// Fails with no mutation when the value's tag does not match the
    /// element kind, the object element is dead, or it already has a
    /// logical parent other than this collection's owner.
    pub fn insert(
        &mut self,
        heap: &mut ObjectHeap,
        index: usize,
        value: Value,
    ) -> Result<(), CollectionError> {
        self.admit(heap, &value)?;
        let index = index.min(self.items.len());
        self.adopt(heap, &value);
        self.items.insert(index, value);
        self.generation = self.generation.wrapping_add(1);
        heap.queue_notification(Notification::CollectionChanged {
            owner: self.owner,
            change: CollectionChange::Added { index },
        });
        Ok(())
    }

    /// Removes and returns the element at `index`.
    ///
    /// An object element is detached (parent, surface tag) and the
    /// collection's reference released before returning, so the returned id
    /// may already be dead; check
    /// [`ObjectHeap::is_alive`] before using it.
    pub fn remove_at(
        &mut self,
        heap: &mut ObjectHeap,
        index: usize,
    ) -> Result<Value, CollectionError> {
        if index >= self.items.len() {
            return Err(CollectionError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let value = self.items.remove(index);
        self.generation = self.generation.wrapping_add(1);
        heap.queue_notification(Notification::CollectionChanged {
            owner: self.owner,
            change: CollectionChange::Removed {
                index,
                value: value.clone(),
            },
        });
        self.detach(heap, &value);
        Ok(value)
    }

    /// Replaces the element at `index` in place.
    ///
    /// Not a structural mutation: the generation is left alone and
    /// outstanding iterators stay valid. The old element is detached and
    /// the new one adopted as usual.
    pub fn set_value_at(
        &mut self,
        heap: &mut ObjectHeap,
        index: usize,
        value: Value,
    ) -> Result<(), CollectionError> {
        if index >= self.items.len() {
            return Err(CollectionError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.admit(heap, &value)?;
        self.adopt(heap, &value);
        let old = mem::replace(&mut self.items[index], value);
        self.detach(heap, &old);
        heap.queue_notification(Notification::CollectionChanged {
            owner: self.owner,
            change: CollectionChange::Replaced { index },
        });
        Ok(())
    }

    /// Removes every element.
    ///
    /// Queues [`CollectionChange::Clearing`] before the removal and
    /// [`CollectionChange::Cleared`] after; every object element is
    /// detached. Returns `false` (and queues nothing) if already empty.
    pub fn clear(&mut self, heap: &mut ObjectHeap) -> bool {
        if self.items.is_empty() {
            return false;
        }
        heap.queue_notification(Notification::CollectionChanged {
            owner: self.owner,
            change: CollectionChange::Clearing,
        });
        let removed = mem::take(&mut self.items);
        self.generation = self.generation.wrapping_add(1);
        for value in &removed {
            self.detach(heap, value);
        }
        heap.queue_notification(Notification::CollectionChanged {
            owner: self.owner,
            change: CollectionChange::Cleared {
                removed: removed.len(),
            },
        });
        true
    }

    /// Detaches and releases every element without queueing notifications.
    ///
    /// Teardown path, used when the owner itself is going away and nobody
    /// is left to observe the collection.
    pub fn dispose(&mut self, heap: &mut ObjectHeap) {
        let removed = mem::take(&mut self.items);
        self.generation = self.generation.wrapping_add(1);
        for value in &removed {
            self.detach(heap, value);
        }
        self.z_sorted.clear();
        self.z_generation = None;
    }

    /// Marks the z-order cache stale.
    ///
    /// Structural mutations invalidate the cache through the generation;
    /// this is for z-index *property* changes, which the collection cannot
    /// see.
    pub fn invalidate_z_cache(&mut self) {
        self.z_generation = None;
    }

    /// Returns the object elements sorted by their z-index property.
    ///
    /// The sort is stable: equal z-indices keep insertion order. The result
    /// is cached against the structural generation; a cache whose length
    /// disagrees with the live contents is re-sorted defensively and logged.
    pub fn z_order(&mut self, heap: &ObjectHeap, z_index: PropertyId) -> &[ObjectId] {
        if self.z_generation != Some(self.generation) {
            self.resort(heap, z_index);
        } else {
            let live = self.items.iter().filter(|v| v.as_object().is_some()).count();
            if live != self.z_sorted.len() {
                log::warn!("z-order cache out of sync with collection contents, re-sorting");
                self.resort(heap, z_index);
            }
        }
        &self.z_sorted
    }

    fn resort(&mut self, heap: &ObjectHeap, z_index: PropertyId) {
        let mut keyed: Vec<(i32, usize, ObjectId)> = Vec::with_capacity(self.items.len());
        for (sequence, item) in self.items.iter().enumerate() {
            if let Value::Object(id) = *item {
                let z = heap.value(id, z_index).and_then(Value::as_int).unwrap_or(0);
                keyed.push((z, sequence, id));
            }
        }
        keyed.sort_by_key(|&(z, sequence, _)| (z, sequence));
        self.z_sorted.clear();
        self.z_sorted.extend(keyed.iter().map(|&(_, _, id)| id));
        self.z_generation = Some(self.generation);
    }

    fn admit(&self, heap: &ObjectHeap, value: &Value) -> Result<(), CollectionError> {
        if value.kind() != self.element_kind {
            return Err(CollectionError::TypeMismatch {
                expected: self.element_kind,
                found: value.kind(),
            });
        }
        if let Value::Object(id) = *value {
            if !heap.is_alive(id) {
                return Err(CollectionError::DeadElement);
            }
            if let Some(parent) = heap.parent(id)
                && Some(parent) != self.owner
            {
                return Err(CollectionError::AlreadyParented);
            }
        }
        Ok(())
    }

    fn adopt(&self, heap: &mut ObjectHeap, value: &Value) {
        if let Value::Object(id) = *value {
            heap.retain(id);
            if let Some(owner) = self.owner {
                heap.set_parent(id, Some(owner));
                let tag = heap.surface_tag(owner);
                heap.set_surface_tag(id, tag);
            }
        }
    }

    fn detach(&self, heap: &mut ObjectHeap, value: &Value) {
        if let Value::Object(id) = *value {
            if heap.parent(id).is_some() && heap.parent(id) == self.owner {
                heap.set_parent(id, None);
                heap.set_surface_tag(id, None);
            }
            heap.release(id);
        }
    }
}

/// A position in a [`Collection`], pinned to its structural generation.
///
/// The iterator holds no reference to the collection; each call takes it as
/// an argument. Once the collection mutates structurally, every method
/// returns [`IterInvalidated`] rather than touching the moved contents.
///
/// ```
/// use bower_object::{Collection, ObjectHeap, Value, ValueKind};
///
/// let mut heap = ObjectHeap::new();
/// let mut names = Collection::new(ValueKind::Str);
/// names.add(&mut heap, Value::Str("a".into()));
/// names.add(&mut heap, Value::Str("b".into()));
///
/// let mut iter = names.iter();
/// assert_eq!(iter.next(&names).unwrap(), Some(&Value::Str("a".into())));
///
/// names.add(&mut heap, Value::Str("c".into()));
/// assert!(iter.next(&names).is_err());
/// ```
#[derive(Debug)]
pub struct CollectionIterator {
    generation: u64,
    index: usize,
}

impl CollectionIterator {
    /// Creates an iterator pinned to the collection's current generation.
    #[must_use]
    pub fn new(collection: &Collection) -> Self {
        Self {
            generation: collection.generation(),
            index: 0,
        }
    }

    /// Returns the next element, or `None` past the end.
    pub fn next<'c>(
        &mut self,
        collection: &'c Collection,
    ) -> Result<Option<&'c Value>, IterInvalidated> {
        if self.generation != collection.generation() {
            return Err(IterInvalidated);
        }
        let value = collection.value_at(self.index);
        if value.is_some() {
            self.index += 1;
        }
        Ok(value)
    }

    /// Rewinds to the start.
    ///
    /// Fails like [`CollectionIterator::next`] once the collection has
    /// mutated; an invalidated iterator cannot be revived.
    pub fn reset(&mut self, collection: &Collection) -> Result<(), IterInvalidated> {
        if self.generation != collection.generation() {
            return Err(IterInvalidated);
        }
        self.index = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{SurfaceTag, TypeKind};
    use alloc::string::ToString;

    fn object_collection(heap: &mut ObjectHeap) -> (Collection, ObjectId) {
        let owner = heap.alloc(TypeKind::Container);
        (Collection::with_owner(ValueKind::Object, owner), owner)
    }

    #[test]
    fn add_adopts_object_elements() {
        let mut heap = ObjectHeap::new();
        let (mut children, owner) = object_collection(&mut heap);
        heap.set_surface_tag(owner, Some(SurfaceTag::new(3)));
        let child = heap.alloc(TypeKind::Visual);

        assert_eq!(children.add(&mut heap, Value::Object(child)), Some(0));
        assert_eq!(heap.parent(child), Some(owner));
        assert!(heap.is_attached_to(child, SurfaceTag::new(3)));
        assert_eq!(heap.refcount(child), Some(2));
    }

    #[test]
    fn remove_detaches_and_releases() {
        let mut heap = ObjectHeap::new();
        let (mut children, _) = object_collection(&mut heap);
        let child = heap.alloc(TypeKind::Visual);
        children.add(&mut heap, Value::Object(child));
        let _ = heap.take_notifications();

        let removed = children.remove_at(&mut heap, 0).unwrap();
        assert_eq!(removed, Value::Object(child));
        assert_eq!(heap.parent(child), None);
        assert_eq!(heap.surface_tag(child), None);
        assert_eq!(heap.refcount(child), Some(1));

        let notifications = heap.take_notifications();
        assert_eq!(notifications.len(), 1);
        match &notifications[0] {
            Notification::CollectionChanged { change, .. } => {
                assert_eq!(
                    *change,
                    CollectionChange::Removed {
                        index: 0,
                        value: Value::Object(child),
                    }
                );
            }
            other => panic!("expected CollectionChanged, got {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_rejected_without_mutation() {
        let mut heap = ObjectHeap::new();
        let (mut children, _) = object_collection(&mut heap);
        let generation = children.generation();

        assert_eq!(children.add(&mut heap, Value::Int(5)), None);
        assert!(children.is_empty());
        assert_eq!(children.generation(), generation);
        assert!(!heap.has_notifications());
    }

    #[test]
    fn foreign_parent_rejected() {
        let mut heap = ObjectHeap::new();
        let (mut children, _) = object_collection(&mut heap);
        let (mut other, _) = object_collection(&mut heap);
        let child = heap.alloc(TypeKind::Visual);

        children.add(&mut heap, Value::Object(child));
        let err = other.insert(&mut heap, 0, Value::Object(child)).unwrap_err();
        assert_eq!(err, CollectionError::AlreadyParented);
        assert!(other.is_empty());
    }

    #[test]
    fn insert_clamps_the_index() {
        let mut heap = ObjectHeap::new();
        let mut names = Collection::new(ValueKind::Str);
        names.insert(&mut heap, 100, Value::Str("a".to_string())).unwrap();
        names.insert(&mut heap, 0, Value::Str("b".to_string())).unwrap();
        assert_eq!(names.value_at(0), Some(&Value::Str("b".to_string())));
        assert_eq!(names.value_at(1), Some(&Value::Str("a".to_string())));
    }

    #[test]
    fn clear_brackets_removal_with_notifications() {
        let mut heap = ObjectHeap::new();
        let (mut children, _) = object_collection(&mut heap);
        let a = heap.alloc(TypeKind::Visual);
        let b = heap.alloc(TypeKind::Visual);
        children.add(&mut heap, Value::Object(a));
        children.add(&mut heap, Value::Object(b));
        let _ = heap.take_notifications();

        assert!(children.clear(&mut heap));
        assert!(children.is_empty());
        assert_eq!(heap.parent(a), None);
        assert_eq!(heap.parent(b), None);

        let changes: alloc::vec::Vec<CollectionChange> = heap
            .take_notifications()
            .into_iter()
            .map(|n| match n {
                Notification::CollectionChanged { change, .. } => change,
                other => panic!("unexpected notification {other:?}"),
            })
            .collect();
        assert_eq!(changes, [CollectionChange::Clearing, CollectionChange::Cleared { removed: 2 }]);

        // A second clear of the now-empty collection queues nothing.
        assert!(!children.clear(&mut heap));
        assert!(!heap.has_notifications());
    }

    #[test]
    fn replace_in_place_keeps_iterators_valid() {
        let mut heap = ObjectHeap::new();
        let mut names = Collection::new(ValueKind::Str);
        names.add(&mut heap, Value::Str("a".to_string()));
        names.add(&mut heap, Value::Str("b".to_string()));

        let mut iter = names.iter();
        assert_eq!(iter.next(&names).unwrap(), Some(&Value::Str("a".to_string())));

        names.set_value_at(&mut heap, 1, Value::Str("c".to_string())).unwrap();
        assert_eq!(iter.next(&names).unwrap(), Some(&Value::Str("c".to_string())));
        assert_eq!(iter.next(&names).unwrap(), None);
    }

    #[test]
    fn structural_mutation_invalidates_iterators() {
        let mut heap = ObjectHeap::new();
        let mut names = Collection::new(ValueKind::Str);
        names.add(&mut heap, Value::Str("a".to_string()));

        let mut iter = names.iter();
        names.add(&mut heap, Value::Str("b".to_string()));
        assert_eq!(iter.next(&names), Err(IterInvalidated));
        assert_eq!(iter.reset(&names), Err(IterInvalidated));
    }

    #[test]
    fn z_order_is_stable_and_cached() {
        let mut registry = crate::PropertyRegistry::new();
        let z_index =
            registry.register("ZIndex", crate::PropertyMetadata::new(ValueKind::Int));
        let mut heap = ObjectHeap::new();
        let (mut children, _) = object_collection(&mut heap);

        let low = heap.alloc(TypeKind::Visual);
        let high = heap.alloc(TypeKind::Visual);
        let also_low = heap.alloc(TypeKind::Visual);
        heap.set_value(high, z_index, Value::Int(5), &registry).unwrap();
        children.add(&mut heap, Value::Object(low));
        children.add(&mut heap, Value::Object(high));
        children.add(&mut heap, Value::Object(also_low));

        // Ties keep insertion order; higher z sorts later.
        assert_eq!(children.z_order(&heap, z_index), [low, also_low, high]);

        // A z-index property change is invisible to the generation; the
        // stale cache persists until explicitly invalidated.
        heap.set_value(low, z_index, Value::Int(9), &registry).unwrap();
        assert_eq!(children.z_order(&heap, z_index), [low, also_low, high]);
        children.invalidate_z_cache();
        assert_eq!(children.z_order(&heap, z_index), [also_low, high, low]);
    }
}

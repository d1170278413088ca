// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reference-counted object arena.

use alloc::vec::Vec;
use core::fmt;

use bower_dirty::DirtyFlags;
use smallvec::SmallVec;

use crate::collection::CollectionChange;
use crate::error::SetError;
use crate::registry::{PropertyId, PropertyRegistry};
use crate::table::PropertyTable;
use crate::value::Value;

/// A handle to a live object in an [`ObjectHeap`].
///
/// Handles are generational: once the object is freed, the slot's generation
/// moves on and the stale id stops resolving. A stale id never aliases a
/// newer object in the same slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    slot: u32,
    generation: u32,
}

impl ObjectId {
    /// Returns the slot index. Stable for the object's lifetime, reused
    /// after it is freed.
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Returns the slot generation this id was minted at.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

/// Coarse classification of a heap object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Data-only; never appears in the visual tree.
    Plain,
    /// A leaf visual.
    Visual,
    /// A visual that hosts child content.
    Container,
}

impl TypeKind {
    /// Returns `true` for kinds that can appear in the visual tree.
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual | Self::Container)
    }
}

/// Identifies the surface a subtree is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceTag(u32);

impl SurfaceTag {
    /// Creates a tag from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An opaque key naming a registered change listener.
///
/// The heap records listener ids per object and echoes them back in
/// [`Notification::PropertyChanged`]; dispatching to the listener itself is
/// the caller's business.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates a listener id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// What an object holds as child content.
///
/// The slot is a non-owning view used by tree traversal. A single child is
/// owned through whichever property slot stores it; a children collection is
/// owned by the surface and keyed by this object's id.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChildSlot {
    /// No child content.
    #[default]
    None,
    /// Exactly one non-collection child.
    Single(ObjectId),
    /// An ordered children collection lives outside the heap.
    Children,
}

/// A deferred observer record.
///
/// Mutation queues these instead of calling observers synchronously; the
/// surface drains the queue once per operation with
/// [`ObjectHeap::take_notifications`]. Values carried here are copies without
/// a reference count of their own.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// A property slot changed on `object`.
    PropertyChanged {
        /// The object whose slot changed.
        object: ObjectId,
        /// The property that changed.
        property: PropertyId,
        /// Listeners registered on the object at the time of the change.
        listeners: SmallVec<[ListenerId; 2]>,
    },
    /// A property changed somewhere below `parent`'s direct value.
    SubPropertyChanged {
        /// The logical parent being told about the change.
        parent: ObjectId,
        /// The object whose slot changed.
        source: ObjectId,
        /// The property that changed.
        property: PropertyId,
    },
    /// A children collection mutated structurally or in place.
    CollectionChanged {
        /// The collection's owner, if it has one.
        owner: Option<ObjectId>,
        /// The mutation.
        change: CollectionChange,
    },
}

/// The outcome of a successful property write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChangeSummary {
    /// `false` when the new value equaled the stored one and the write was
    /// skipped entirely.
    pub changed: bool,
    /// The dirty flags the caller should raise, per the property's metadata.
    pub affects: DirtyFlags,
}

#[derive(Debug)]
struct Entry {
    uid: u64,
    kind: TypeKind,
    refcount: u32,
    parent: Option<ObjectId>,
    surface: Option<SurfaceTag>,
    loaded: bool,
    table: PropertyTable,
    child: ChildSlot,
    listeners: SmallVec<[ListenerId; 2]>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// A generational arena of property objects.
///
/// The arena is the single owner of object storage. Reference counts gate
/// slot reuse: [`ObjectHeap::alloc`] hands out a count of one, adopting a
/// value into a property slot or collection takes another, and
/// [`ObjectHeap::release`] frees the object when the count reaches zero.
/// Freeing releases owned property values in turn, so dropping the last
/// reference to a subtree root tears the subtree down.
///
/// ```
/// use bower_object::{ObjectHeap, TypeKind};
///
/// let mut heap = ObjectHeap::new();
/// let node = heap.alloc(TypeKind::Visual);
/// assert!(heap.is_alive(node));
///
/// heap.release(node);
/// assert!(!heap.is_alive(node));
/// ```
#[derive(Debug, Default)]
pub struct ObjectHeap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_uid: u64,
    notifications: Vec<Notification>,
}

impl ObjectHeap {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object with a reference count of one.
    pub fn alloc(&mut self, kind: TypeKind) -> ObjectId {
        self.next_uid += 1;
        let entry = Entry {
            uid: self.next_uid,
            kind,
            refcount: 1,
            parent: None,
            surface: None,
            loaded: false,
            table: PropertyTable::default(),
            child: ChildSlot::None,
            listeners: SmallVec::new(),
        };
        if let Some(slot) = self.free.pop() {
            let record = &mut self.slots[slot as usize];
            record.entry = Some(entry);
            ObjectId {
                slot,
                generation: record.generation,
            }
        } else {
            let slot = u32::try_from(self.slots.len()).expect("object heap overflow");
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            ObjectId { slot, generation: 0 }
        }
    }

    /// Returns `true` if `id` resolves to a live object.
    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.entry(id).is_some()
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Returns the object's stable numeric identity.
    ///
    /// Uids are never reused, unlike slots; bridge layers key wrapper caches
    /// by uid.
    #[must_use]
    pub fn uid(&self, id: ObjectId) -> Option<u64> {
        self.entry(id).map(|entry| entry.uid)
    }

    /// Returns the object's kind.
    #[must_use]
    pub fn type_kind(&self, id: ObjectId) -> Option<TypeKind> {
        self.entry(id).map(|entry| entry.kind)
    }

    /// Returns the object's reference count.
    #[must_use]
    pub fn refcount(&self, id: ObjectId) -> Option<u32> {
        self.entry(id).map(|entry| entry.refcount)
    }

    /// Takes an additional reference to the object.
    pub fn retain(&mut self, id: ObjectId) {
        debug_assert!(self.is_alive(id), "retain of dead object {id}");
        if let Some(entry) = self.entry_mut(id) {
            entry.refcount += 1;
        } else {
            log::warn!("retain of dead object {id}");
        }
    }

    /// Drops one reference; frees the object at zero.
    ///
    /// Returns `true` if this call freed the object. Freeing detaches and
    /// releases every owned property value, so an entire subtree owned
    /// through property slots goes down with its root.
    pub fn release(&mut self, id: ObjectId) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            log::warn!("release of dead object {id}");
            return false;
        };
        entry.refcount -= 1;
        if entry.refcount > 0 {
            return false;
        }
        self.free_slot(id);
        true
    }

    fn free_slot(&mut self, id: ObjectId) {
        let record = &mut self.slots[id.slot as usize];
        let Some(entry) = record.entry.take() else {
            return;
        };
        record.generation = record.generation.wrapping_add(1);
        self.free.push(id.slot);
        for (_, value) in entry.table.into_entries() {
            if let Value::Object(child) = value {
                if self.parent(child) == Some(id) {
                    self.set_parent(child, None);
                    self.set_surface_tag(child, None);
                }
                self.release(child);
            }
        }
    }

    /// Takes a reference for an object value; other tags are untouched.
    pub fn retain_value(&mut self, value: &Value) {
        if let Value::Object(id) = *value {
            self.retain(id);
        }
    }

    /// Drops a reference for an object value; other tags are untouched.
    pub fn release_value(&mut self, value: &Value) {
        if let Value::Object(id) = *value {
            self.release(id);
        }
    }

    /// Returns the object's logical parent.
    #[must_use]
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.entry(id).and_then(|entry| entry.parent)
    }

    /// Sets or clears the logical parent back-reference.
    ///
    /// The back-reference is non-owning; ownership flows the other way,
    /// through the parent's property slot or collection.
    pub fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) {
        if let Some(entry) = self.entry_mut(id) {
            entry.parent = parent;
        } else {
            log::warn!("set_parent on dead object {id}");
        }
    }

    /// Returns the number of edges between `id` and its root.
    #[must_use]
    pub fn depth(&self, id: ObjectId) -> u32 {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Returns `id` followed by its ancestors up to the root.
    #[must_use]
    pub fn path_to_root(&self, id: ObjectId) -> SmallVec<[ObjectId; 8]> {
        let mut path = SmallVec::new();
        if !self.is_alive(id) {
            return path;
        }
        path.push(id);
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Returns the surface the object is attached to.
    #[must_use]
    pub fn surface_tag(&self, id: ObjectId) -> Option<SurfaceTag> {
        self.entry(id).and_then(|entry| entry.surface)
    }

    /// Returns `true` if the object is attached to the given surface.
    #[must_use]
    pub fn is_attached_to(&self, id: ObjectId, tag: SurfaceTag) -> bool {
        self.surface_tag(id) == Some(tag)
    }

    /// Tags `id` and everything the heap can reach below it.
    ///
    /// Reaches through single-child slots and object-valued properties.
    /// Children collections live outside the heap: they re-tag their
    /// elements on adoption, and the surface re-tags the full tree when a
    /// root is attached.
    pub fn set_surface_tag(&mut self, id: ObjectId, tag: Option<SurfaceTag>) {
        let mut stack: SmallVec<[ObjectId; 8]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            let mut reached: SmallVec<[ObjectId; 8]> = SmallVec::new();
            {
                let Some(entry) = self.entry_mut(current) else {
                    continue;
                };
                if entry.surface == tag {
                    continue;
                }
                entry.surface = tag;
                if let ChildSlot::Single(child) = entry.child {
                    reached.push(child);
                }
                for (_, value) in entry.table.iter() {
                    if let Value::Object(child) = *value {
                        reached.push(child);
                    }
                }
            }
            for child in reached {
                if self.parent(child) == Some(current) {
                    stack.push(child);
                }
            }
        }
    }

    /// Returns `true` once the object has completed its load pass.
    #[must_use]
    pub fn is_loaded(&self, id: ObjectId) -> bool {
        self.entry(id).is_some_and(|entry| entry.loaded)
    }

    /// Records whether the object has completed its load pass.
    pub fn set_loaded(&mut self, id: ObjectId, loaded: bool) {
        if let Some(entry) = self.entry_mut(id) {
            entry.loaded = loaded;
        }
    }

    /// Returns the object's child slot.
    #[must_use]
    pub fn child(&self, id: ObjectId) -> Option<ChildSlot> {
        self.entry(id).map(|entry| entry.child)
    }

    /// Sets the object's child slot. The slot is a traversal view and takes
    /// no reference.
    pub fn set_child(&mut self, id: ObjectId, child: ChildSlot) {
        if let Some(entry) = self.entry_mut(id) {
            entry.child = child;
        } else {
            log::warn!("set_child on dead object {id}");
        }
    }

    /// Registers a change listener on the object.
    pub fn add_change_listener(&mut self, id: ObjectId, listener: ListenerId) {
        if let Some(entry) = self.entry_mut(id)
            && !entry.listeners.contains(&listener)
        {
            entry.listeners.push(listener);
        }
    }

    /// Removes a change listener. Returns `true` if it was registered.
    pub fn remove_change_listener(&mut self, id: ObjectId, listener: ListenerId) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        let Some(index) = entry.listeners.iter().position(|l| *l == listener) else {
            return false;
        };
        entry.listeners.remove(index);
        true
    }

    /// Returns the stored value for a property, absent if never set.
    #[must_use]
    pub fn value(&self, id: ObjectId, property: PropertyId) -> Option<&Value> {
        self.entry(id)?.table.get(property)
    }

    /// Like [`ObjectHeap::value`], but distinguishes a dead id from an
    /// unset slot.
    pub fn value_checked(
        &self,
        id: ObjectId,
        property: PropertyId,
    ) -> Result<Option<&Value>, SetError> {
        let Some(entry) = self.entry(id) else {
            return Err(SetError::DeadObject);
        };
        Ok(entry.table.get(property))
    }

    /// Writes a property value.
    ///
    /// The write is validated before any side effect: the value's tag must
    /// match the registered kind, and an object value must not already have
    /// a different logical parent unless the property allows reparenting.
    /// Writing the currently stored value is a no-op reported via
    /// [`ChangeSummary::changed`].
    ///
    /// A successful write adopts an object value (parent back-reference and
    /// surface tag), invokes the property's changed hook, releases the
    /// previous value, and queues [`Notification::PropertyChanged`] plus a
    /// [`Notification::SubPropertyChanged`] for the owner's logical parent.
    pub fn set_value(
        &mut self,
        id: ObjectId,
        property: PropertyId,
        value: Value,
        registry: &PropertyRegistry,
    ) -> Result<ChangeSummary, SetError> {
        let Some(meta) = registry.metadata(property) else {
            return Err(SetError::UnknownProperty);
        };
        if !self.is_alive(id) {
            return Err(SetError::DeadObject);
        }
        if value.kind() != meta.kind() {
            return Err(SetError::TypeMismatch {
                expected: meta.kind(),
                found: value.kind(),
            });
        }
        if let Value::Object(target) = value {
            if !self.is_alive(target) {
                return Err(SetError::DeadObject);
            }
            if let Some(parent) = self.parent(target)
                && parent != id
                && !meta.reparent_allowed()
            {
                return Err(SetError::AlreadyParented);
            }
        }
        if self.value(id, property) == Some(&value) {
            return Ok(ChangeSummary {
                changed: false,
                affects: DirtyFlags::empty(),
            });
        }

        // Adopt before the swap so the changed hook observes a consistent
        // parent/surface on the new value.
        if let Value::Object(target) = value {
            self.retain(target);
            self.set_parent(target, Some(id));
            let tag = self.surface_tag(id);
            self.set_surface_tag(target, tag);
        }

        let old = match self.entry_mut(id) {
            Some(entry) => entry.table.set(property, value),
            None => return Err(SetError::DeadObject),
        };
        if let Some(new_value) = self.value(id, property) {
            meta.notify_changed(old.as_ref(), new_value);
        }
        if let Some(old) = old {
            if let Value::Object(previous) = old {
                if self.parent(previous) == Some(id) {
                    self.set_parent(previous, None);
                    self.set_surface_tag(previous, None);
                }
                self.release(previous);
            }
        }

        let listeners = self
            .entry(id)
            .map(|entry| entry.listeners.clone())
            .unwrap_or_default();
        self.notifications.push(Notification::PropertyChanged {
            object: id,
            property,
            listeners,
        });
        if let Some(parent) = self.parent(id) {
            self.notifications.push(Notification::SubPropertyChanged {
                parent,
                source: id,
                property,
            });
        }
        Ok(ChangeSummary {
            changed: true,
            affects: meta.affected(),
        })
    }

    /// Removes a property's stored value.
    ///
    /// Detaches and releases a removed object value, then queues the same
    /// notifications as a write. Returns `false` if the slot was unset.
    pub fn clear_value(&mut self, id: ObjectId, property: PropertyId) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            log::warn!("clear_value on dead object {id}");
            return false;
        };
        let Some(old) = entry.table.remove(property) else {
            return false;
        };
        if let Value::Object(previous) = old {
            if self.parent(previous) == Some(id) {
                self.set_parent(previous, None);
                self.set_surface_tag(previous, None);
            }
            self.release(previous);
        }
        let listeners = self
            .entry(id)
            .map(|entry| entry.listeners.clone())
            .unwrap_or_default();
        self.notifications.push(Notification::PropertyChanged {
            object: id,
            property,
            listeners,
        });
        if let Some(parent) = self.parent(id) {
            self.notifications.push(Notification::SubPropertyChanged {
                parent,
                source: id,
                property,
            });
        }
        true
    }

    /// Returns `true` if notifications are waiting to be drained.
    #[must_use]
    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    /// Drains the notification queue.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        core::mem::take(&mut self.notifications)
    }

    pub(crate) fn queue_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn entry(&self, id: ObjectId) -> Option<&Entry> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: ObjectId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }
}

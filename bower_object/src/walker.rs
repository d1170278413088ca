// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only traversal over a node's child content.

use smallvec::SmallVec;

use crate::collection::Collection;
use crate::heap::{ChildSlot, ObjectHeap, ObjectId};
use crate::registry::PropertyId;

/// The order a [`VisualTreeWalker`] yields children in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WalkDirection {
    /// Insertion order, ignoring z-indices.
    Logical,
    /// Back to front: lowest z-index first.
    ZForward,
    /// Front to back: highest z-index first. Hit testing walks this way.
    ZReverse,
}

/// A one-level walk over a node's children.
///
/// The child list is resolved once at construction, from the node's child
/// slot: a children collection (ordered per [`WalkDirection`]), a single
/// child, or nothing. Later tree mutation does not affect a walker already
/// built; callers hit-testing or painting re-create walkers per node visit.
#[derive(Debug)]
pub struct VisualTreeWalker {
    nodes: SmallVec<[ObjectId; 16]>,
    index: usize,
}

impl VisualTreeWalker {
    /// Builds a walker over `node`'s children.
    ///
    /// `children` must be the node's children collection when its child
    /// slot is [`ChildSlot::Children`]; the collection lives outside the
    /// heap, so the caller supplies it. Z-ordered directions refresh the
    /// collection's z cache, hence the `&mut`.
    #[must_use]
    pub fn new(
        heap: &ObjectHeap,
        node: ObjectId,
        children: Option<&mut Collection>,
        direction: WalkDirection,
        z_index: PropertyId,
    ) -> Self {
        let mut nodes: SmallVec<[ObjectId; 16]> = SmallVec::new();
        match heap.child(node) {
            Some(ChildSlot::Children) => {
                if let Some(children) = children {
                    match direction {
                        WalkDirection::Logical => nodes.extend(children.ids()),
                        WalkDirection::ZForward => {
                            nodes.extend_from_slice(children.z_order(heap, z_index));
                        }
                        WalkDirection::ZReverse => {
                            nodes.extend_from_slice(children.z_order(heap, z_index));
                            nodes.reverse();
                        }
                    }
                } else {
                    log::debug!("walker over {node} given no collection for its children slot");
                }
            }
            Some(ChildSlot::Single(child)) => nodes.push(child),
            Some(ChildSlot::None) | None => {}
        }
        Self { nodes, index: 0 }
    }

    /// Yields the next child, or `None` when exhausted.
    pub fn step(&mut self) -> Option<ObjectId> {
        let next = self.nodes.get(self.index).copied()?;
        self.index += 1;
        Some(next)
    }

    /// Returns the total number of children this walker covers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::TypeKind;
    use crate::registry::{PropertyMetadata, PropertyRegistry};
    use crate::value::{Value, ValueKind};
    use alloc::vec::Vec;

    struct Fixture {
        heap: ObjectHeap,
        registry: PropertyRegistry,
        z_index: PropertyId,
        parent: ObjectId,
        children: Collection,
    }

    fn fixture() -> Fixture {
        let mut registry = PropertyRegistry::new();
        let z_index = registry.register("ZIndex", PropertyMetadata::new(ValueKind::Int));
        let mut heap = ObjectHeap::new();
        let parent = heap.alloc(TypeKind::Container);
        heap.set_child(parent, ChildSlot::Children);
        let children = Collection::with_owner(ValueKind::Object, parent);
        Fixture {
            heap,
            registry,
            z_index,
            parent,
            children,
        }
    }

    fn walk(
        heap: &ObjectHeap,
        node: ObjectId,
        children: &mut Collection,
        direction: WalkDirection,
        z_index: PropertyId,
    ) -> Vec<ObjectId> {
        let mut walker = VisualTreeWalker::new(heap, node, Some(children), direction, z_index);
        let mut out = Vec::new();
        while let Some(id) = walker.step() {
            out.push(id);
        }
        out
    }

    #[test]
    fn logical_walk_follows_insertion_order() {
        let mut f = fixture();
        let a = f.heap.alloc(TypeKind::Visual);
        let b = f.heap.alloc(TypeKind::Visual);
        f.children.add(&mut f.heap, Value::Object(a));
        f.children.add(&mut f.heap, Value::Object(b));

        let order = walk(&f.heap, f.parent, &mut f.children, WalkDirection::Logical, f.z_index);
        assert_eq!(order, [a, b]);
    }

    #[test]
    fn z_walks_respect_z_index_and_reverse_each_other() {
        let mut f = fixture();
        let back = f.heap.alloc(TypeKind::Visual);
        let front = f.heap.alloc(TypeKind::Visual);
        let middle = f.heap.alloc(TypeKind::Visual);
        f.heap.set_value(front, f.z_index, Value::Int(10), &f.registry).unwrap();
        f.heap.set_value(middle, f.z_index, Value::Int(5), &f.registry).unwrap();
        f.children.add(&mut f.heap, Value::Object(front));
        f.children.add(&mut f.heap, Value::Object(back));
        f.children.add(&mut f.heap, Value::Object(middle));

        let forward =
            walk(&f.heap, f.parent, &mut f.children, WalkDirection::ZForward, f.z_index);
        assert_eq!(forward, [back, middle, front]);

        let reverse =
            walk(&f.heap, f.parent, &mut f.children, WalkDirection::ZReverse, f.z_index);
        assert_eq!(reverse, [front, middle, back]);
    }

    #[test]
    fn single_child_slot_yields_one_node() {
        let mut heap = ObjectHeap::new();
        let z_index = PropertyId::from_raw(0);
        let parent = heap.alloc(TypeKind::Container);
        let child = heap.alloc(TypeKind::Visual);
        heap.set_child(parent, ChildSlot::Single(child));

        let mut walker =
            VisualTreeWalker::new(&heap, parent, None, WalkDirection::Logical, z_index);
        assert_eq!(walker.count(), 1);
        assert_eq!(walker.step(), Some(child));
        assert_eq!(walker.step(), None);
    }

    #[test]
    fn empty_slot_yields_nothing() {
        let mut heap = ObjectHeap::new();
        let z_index = PropertyId::from_raw(0);
        let leaf = heap.alloc(TypeKind::Visual);

        let mut walker = VisualTreeWalker::new(&heap, leaf, None, WalkDirection::ZForward, z_index);
        assert_eq!(walker.count(), 0);
        assert_eq!(walker.step(), None);
    }
}

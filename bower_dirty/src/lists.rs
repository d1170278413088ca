// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty keys bucketed by tree depth.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

/// The order a [`DepthLists`] drains its buckets in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrainOrder {
    /// Shallowest depth first. Used for downward (repaint) propagation.
    TopDown,
    /// Deepest depth first. Used for upward (bounds) recomputation.
    BottomUp,
}

/// A deduplicated set of dirty keys, bucketed by tree depth.
///
/// Within a bucket, keys drain in insertion order. Across buckets, the
/// configured [`DrainOrder`] decides which depth drains first. A key appears
/// at most once across all buckets; re-pushing a key at a different depth
/// moves it.
///
/// # Example
///
/// ```
/// use bower_dirty::{DepthLists, DrainOrder};
///
/// let mut down = DepthLists::<u32>::new(DrainOrder::TopDown);
/// down.push(20, 2);
/// down.push(0, 0);
/// down.push(21, 2);
///
/// assert_eq!(down.pop(), Some(0));
/// assert_eq!(down.pop(), Some(20));
/// assert_eq!(down.pop(), Some(21));
/// assert!(down.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DepthLists<K>
where
    K: Copy + Eq + Hash,
{
    order: DrainOrder,
    /// Depth → keys at that depth, insertion-ordered.
    buckets: BTreeMap<u32, Vec<K>>,
    /// Key → depth it currently sits at.
    members: HashMap<K, u32>,
    /// Bumped on every mutation.
    generation: u64,
}

impl<K> DepthLists<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty list with the given drain order.
    #[must_use]
    pub fn new(order: DrainOrder) -> Self {
        Self {
            order,
            buckets: BTreeMap::new(),
            members: HashMap::new(),
            generation: 0,
        }
    }

    /// Returns the drain order.
    #[must_use]
    pub fn order(&self) -> DrainOrder {
        self.order
    }

    /// Returns the current generation.
    ///
    /// The generation is bumped on every mutation (push, pop, remove, clear)
    /// and can be used to detect concurrent structural change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds `key` at `depth`.
    ///
    /// Returns `true` if the key was newly added. A key already present at
    /// the same depth is left alone; one present at a different depth is
    /// moved to the new depth (returns `false`).
    pub fn push(&mut self, key: K, depth: u32) -> bool {
        match self.members.get(&key).copied() {
            Some(existing) if existing == depth => false,
            Some(existing) => {
                self.remove_from_bucket(key, existing);
                self.insert_into_bucket(key, depth);
                self.generation = self.generation.wrapping_add(1);
                false
            }
            None => {
                self.insert_into_bucket(key, depth);
                self.generation = self.generation.wrapping_add(1);
                true
            }
        }
    }

    /// Removes and returns the next key in drain order.
    pub fn pop(&mut self) -> Option<K> {
        let depth = match self.order {
            DrainOrder::TopDown => *self.buckets.keys().next()?,
            DrainOrder::BottomUp => *self.buckets.keys().next_back()?,
        };
        let bucket = self.buckets.get_mut(&depth)?;
        let key = bucket.remove(0);
        if bucket.is_empty() {
            self.buckets.remove(&depth);
        }
        self.members.remove(&key);
        self.generation = self.generation.wrapping_add(1);
        Some(key)
    }

    /// Removes a key wherever it sits.
    ///
    /// Returns `true` if the key was present.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(depth) = self.members.remove(&key) else {
            return false;
        };
        self.remove_from_bucket(key, depth);
        self.generation = self.generation.wrapping_add(1);
        true
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.members.contains_key(&key)
    }

    /// Returns the number of dirty keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no keys are dirty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Removes all keys.
    pub fn clear(&mut self) {
        if self.members.is_empty() {
            return;
        }
        self.buckets.clear();
        self.members.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn insert_into_bucket(&mut self, key: K, depth: u32) {
        self.buckets.entry(depth).or_default().push(key);
        self.members.insert(key, depth);
    }

    fn remove_from_bucket(&mut self, key: K, depth: u32) {
        if let Some(bucket) = self.buckets.get_mut(&depth) {
            bucket.retain(|k| *k != key);
            if bucket.is_empty() {
                self.buckets.remove(&depth);
            }
        }
    }
}

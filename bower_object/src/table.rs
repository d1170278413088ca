// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sparse per-object property storage.

use smallvec::SmallVec;

use crate::registry::PropertyId;
use crate::value::Value;

/// Set properties for one object, sorted by [`PropertyId`].
///
/// Objects set a handful of properties out of a large registry, so storage
/// is a sorted inline vector with binary-search lookup rather than a dense
/// table indexed by id.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropertyTable {
    entries: SmallVec<[(PropertyId, Value); 8]>,
}

impl PropertyTable {
    pub(crate) fn get(&self, property: PropertyId) -> Option<&Value> {
        let index = self.position(property).ok()?;
        Some(&self.entries[index].1)
    }

    /// Stores `value`, returning the previous value for the slot.
    pub(crate) fn set(&mut self, property: PropertyId, value: Value) -> Option<Value> {
        match self.position(property) {
            Ok(index) => Some(core::mem::replace(&mut self.entries[index].1, value)),
            Err(index) => {
                self.entries.insert(index, (property, value));
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, property: PropertyId) -> Option<Value> {
        let index = self.position(property).ok()?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn contains(&self, property: PropertyId) -> bool {
        self.position(property).is_ok()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PropertyId, &Value)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (PropertyId, Value)> {
        self.entries.into_iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, property: PropertyId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&property, |(id, _)| *id)
    }
}

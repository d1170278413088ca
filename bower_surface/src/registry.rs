// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-owned bookkeeping of live surfaces.

use alloc::vec::Vec;

/// Names one registered surface for the lifetime of its registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

/// The set of live surfaces, owned by the embedding host.
///
/// Accessibility bridges read "how many instances" and "which root per
/// instance" from here. There is no global: the host passes the registry to
/// [`Surface::attach`](crate::Surface::attach) and unregisters the instance
/// a zombified surface hands back.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    entries: Vec<(InstanceId, u64)>,
    next: u64,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a surface by its root object's uid.
    pub fn register(&mut self, root_uid: u64) -> InstanceId {
        self.next += 1;
        let id = InstanceId(self.next);
        self.entries.push((id, root_uid));
        id
    }

    /// Replaces the root uid recorded for an instance.
    ///
    /// Returns `false` if the instance is not registered.
    pub fn update_root(&mut self, instance: InstanceId, root_uid: u64) -> bool {
        for entry in &mut self.entries {
            if entry.0 == instance {
                entry.1 = root_uid;
                return true;
            }
        }
        false
    }

    /// Removes an instance. Returns `false` if it was not registered.
    pub fn unregister(&mut self, instance: InstanceId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != instance);
        self.entries.len() != before
    }

    /// Returns the number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no surface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(instance, root_uid)` pairs in registration order.
    pub fn roots(&self) -> impl Iterator<Item = (InstanceId, u64)> + '_ {
        self.entries.iter().copied()
    }
}

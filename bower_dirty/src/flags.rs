// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flags describing why an element is dirty.

bitflags::bitflags! {
    /// Per-element dirty state.
    ///
    /// The flags partition into two processing directions:
    ///
    /// - [`DirtyFlags::UPWARD`] flags are handled deepest-first, since they
    ///   feed ancestor state (extents unions).
    /// - [`DirtyFlags::DOWNWARD`] flags are handled shallowest-first, since
    ///   they spread into descendants (repaint).
    ///
    /// A property registration declares which flags a change to that property
    /// raises; the coordinator routes the element into the matching lists.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        /// The element's cached subtree bounds need recomputing.
        const BOUNDS     = 0b0000_0001;
        /// The element's bounds changed; its parent must re-union.
        const NEW_BOUNDS = 0b0000_0010;
        /// The element and its whole subtree need repainting.
        const INVALIDATE = 0b0000_0100;
        /// Only the element's own extent needs repainting.
        const RENDER     = 0b0000_1000;
    }
}

impl DirtyFlags {
    /// Flags processed bottom-up (deepest elements first).
    pub const UPWARD: Self = Self::BOUNDS.union(Self::NEW_BOUNDS);

    /// Flags processed top-down (shallowest elements first).
    pub const DOWNWARD: Self = Self::INVALIDATE.union(Self::RENDER);

    /// Returns `true` if any upward-processed flag is set.
    #[must_use]
    pub const fn needs_upward(self) -> bool {
        self.intersects(Self::UPWARD)
    }

    /// Returns `true` if any downward-processed flag is set.
    #[must_use]
    pub const fn needs_downward(self) -> bool {
        self.intersects(Self::DOWNWARD)
    }
}

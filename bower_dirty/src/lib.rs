// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bower Dirty: depth-ordered dirty tracking for retained scene trees.
//!
//! A retained scene coordinator has two kinds of invalidation work per frame:
//!
//! - **Upward** work (bounds recomputation) must visit deep elements before
//!   their ancestors, because a parent's extents are the union of its
//!   children's.
//! - **Downward** work (repaint propagation) must visit shallow elements
//!   before their descendants, because invalidating a subtree starts at its
//!   root.
//!
//! This crate provides the two building blocks for that scheduling:
//!
//! - [`DirtyFlags`]: a compact record of *why* an element is dirty, split
//!   into [`DirtyFlags::UPWARD`] and [`DirtyFlags::DOWNWARD`] masks.
//! - [`DepthLists`]: a deduplicated set of dirty keys bucketed by tree
//!   depth, drained shallowest-first ([`DrainOrder::TopDown`]) or
//!   deepest-first ([`DrainOrder::BottomUp`]).
//!
//! ## Example
//!
//! ```
//! use bower_dirty::{DepthLists, DrainOrder};
//!
//! let mut up = DepthLists::<u32>::new(DrainOrder::BottomUp);
//!
//! // A leaf at depth 3 and its grandparent at depth 1 need bounds work.
//! up.push(30, 3);
//! up.push(10, 1);
//!
//! // Deepest first, so the leaf is recomputed before its ancestor.
//! assert_eq!(up.pop(), Some(30));
//! assert_eq!(up.pop(), Some(10));
//! assert_eq!(up.pop(), None);
//! ```
//!
//! Keys pushed while a drain is in progress simply land in their buckets and
//! are drained by the same loop; draining an empty list is a no-op. This is
//! what makes a coordinator's "drain until both lists are empty" pass
//! idempotent.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod flags;
mod lists;

pub use flags::DirtyFlags;
pub use lists::{DepthLists, DrainOrder};

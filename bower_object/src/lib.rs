// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bower Object: the property-object model under a retained scene tree.
//!
//! Elements in a retained scene are bags of typed, sparsely-set properties
//! arranged in an ownership tree. This crate provides that model without any
//! rendering or input policy:
//!
//! - [`Value`] / [`ValueKind`]: the tagged union property slots hold.
//! - [`ObjectHeap`]: a generational, reference-counted arena of property
//!   objects. Adoption (a property slot or collection taking an object
//!   value) retains; removal releases; freeing a root tears down what it
//!   owns.
//! - [`PropertyRegistry`]: load-time property interning with per-property
//!   [`PropertyMetadata`] (declared kind, dirty flags, changed hook).
//! - [`Collection`] / [`CollectionIterator`]: ordered, type-constrained,
//!   observable sequences with generation-checked iteration and a cached
//!   z-order.
//! - [`VisualTreeWalker`]: one-level child traversal in logical or z order.
//!
//! Observers are decoupled through a notification queue on the heap rather
//! than synchronous callbacks: mutations queue [`Notification`]s and the
//! embedding coordinator drains them once per operation.
//!
//! ## Example
//!
//! ```
//! use bower_dirty::DirtyFlags;
//! use bower_object::{
//!     ObjectHeap, PropertyMetadata, PropertyRegistry, TypeKind, Value, ValueKind,
//! };
//!
//! let mut registry = PropertyRegistry::new();
//! let width = registry.register(
//!     "Width",
//!     PropertyMetadata::new(ValueKind::Double).affects(DirtyFlags::BOUNDS),
//! );
//!
//! let mut heap = ObjectHeap::new();
//! let node = heap.alloc(TypeKind::Visual);
//! let summary = heap.set_value(node, width, Value::Double(120.0), &registry)?;
//! assert!(summary.affects.needs_upward());
//! # Ok::<_, bower_object::SetError>(())
//! ```
//!
//! This crate is `no_std` (with `alloc`) unless the `std` feature is
//! enabled; `std` is only forwarded to the geometry and color dependencies.

#![no_std]

extern crate alloc;

mod collection;
mod error;
mod heap;
mod registry;
mod table;
mod value;
mod walker;

pub use collection::{Collection, CollectionChange, CollectionIterator};
pub use error::{CollectionError, IterInvalidated, SetError};
pub use heap::{
    ChangeSummary, ChildSlot, ListenerId, Notification, ObjectHeap, ObjectId, SurfaceTag, TypeKind,
};
pub use registry::{ChangedHook, PropertyId, PropertyMetadata, PropertyRegistry};
pub use value::{Value, ValueKind};
pub use walker::{VisualTreeWalker, WalkDirection};

// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bower Surface: the coordinator for one retained scene tree.
//!
//! A [`Surface`] ties the pieces of a retained UI runtime together: it owns
//! the object heap and property registry from [`bower_object`], routes
//! property changes into the depth-ordered dirty lists from
//! [`bower_dirty`], accumulates damage, paints through a backend-agnostic
//! [`Painter`], and turns raw host pointer/key events into bubbled
//! enter/leave/primary events with capture and deferred focus.
//!
//! ## Shape of a frame
//!
//! 1. The host delivers raw input; [`Surface::handle_pointer_event`] hit
//!    tests, diffs the hit chain against the previous one, and bubbles
//!    events.
//! 2. Content mutates properties through [`Surface::set_value`]; declared
//!    dirty flags land in the up (bounds) and down (repaint) lists.
//! 3. On the frame tick, [`Surface::paint`] drains the tick queue (deferred
//!    focus notifications live there), drains the dirty lists, and paints
//!    the damaged area front-to-back or by direct recursion.
//!
//! Surfaces are single-threaded. A torn-down surface becomes a *zombie*:
//! every entry point turns into a logged no-op, which makes teardown from
//! inside an event handler safe.
//!
//! ## Example
//!
//! ```
//! use bower_surface::{Surface, SurfaceOptions, SurfaceRegistry};
//! use bower_object::Value;
//! use kurbo::{Point, Rect, Size};
//!
//! let mut instances = SurfaceRegistry::new();
//! let mut surface = Surface::new(SurfaceOptions {
//!     size: Size::new(640.0, 480.0),
//!     ..SurfaceOptions::default()
//! });
//!
//! let root = surface.new_container();
//! let bounds = surface.props().bounds;
//! surface.set_value(root, bounds, Value::Rect(Rect::new(0.0, 0.0, 640.0, 480.0)))?;
//! surface.attach(root, &mut instances)?;
//!
//! surface.process_dirty_elements();
//! assert_eq!(surface.hit_test(Point::new(10.0, 10.0)), [root]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! This crate is `no_std` (with `alloc`) unless the `std` feature is
//! enabled; `std` adds a debug assertion that entry points run on the
//! creating thread.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod events;
mod focus;
mod host;
mod input;
mod region;
mod registry;
mod render;
mod surface;

pub use events::{EventCompat, EventKind, Handler, HandlerId, RoutedEvent};
pub use host::{Cursor, KeyEvent, Modifiers, PointerEvent, PointerEventKind, WindowHandle};
pub use region::InvalidRegion;
pub use registry::{InstanceId, SurfaceRegistry};
pub use render::{PaintStrategy, Painter};
pub use surface::{
    AttachError, Surface, SurfaceOptions, SurfaceState, TreeError, VisualProps,
};

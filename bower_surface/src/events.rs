// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Routed events and handler registration.

use alloc::rc::Rc;

use bower_object::ObjectId;
use kurbo::Point;

use crate::host::KeyEvent;
use crate::surface::Surface;

/// The events the surface routes through the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The pointer entered an element's hit chain.
    MouseEnter,
    /// The pointer left an element's hit chain.
    MouseLeave,
    /// The pointer moved over the element.
    MouseMove,
    /// A button went down over the element.
    MouseDown,
    /// A button came up over the element.
    MouseUp,
    /// A key went down while the element's chain had focus.
    KeyDown,
    /// A key came up while the element's chain had focus.
    KeyUp,
    /// The element's chain gained keyboard focus.
    GotFocus,
    /// The element's chain lost keyboard focus.
    LostFocus,
    /// The element finished its load pass on a surface.
    Loaded,
}

/// Which bubbling rules apply to routed events.
///
/// Chosen once at surface construction, never inferred from content.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventCompat {
    /// Marking an event handled stops the upward bubble.
    Routed,
    /// Events bubble to the root unconditionally; the handled flag is
    /// recorded but does not stop propagation.
    Legacy,
}

/// An event in flight along a bubble path.
#[derive(Clone, Debug)]
pub struct RoutedEvent {
    /// What is being routed.
    pub kind: EventKind,
    /// The element the current handler is registered on.
    pub element: ObjectId,
    /// Pointer position, for pointer events.
    pub pos: Option<Point>,
    /// Key data, for key events.
    pub key: Option<KeyEvent>,
    /// Set by a handler to claim the event. Under [`EventCompat::Routed`]
    /// this stops the bubble.
    pub handled: bool,
}

/// A registered event handler.
///
/// Handlers get the surface back mutably; the dispatch loop clones the
/// handler list per element before invoking, so handlers may add or remove
/// handlers, change properties, or zombify the surface mid-dispatch.
pub type Handler = Rc<dyn Fn(&mut Surface, &mut RoutedEvent)>;

/// Names a handler registration for later removal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

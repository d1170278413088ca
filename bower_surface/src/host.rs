// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types crossing the boundary to the embedding window system.
//!
//! The host owns the event loop and delivers raw events; the surface never
//! pumps. Everything here is plain data.

use kurbo::Point;

/// An opaque handle to a host window.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowHandle(u64);

impl WindowHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a raw pointer event reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    /// The pointer moved.
    Move,
    /// A button went down.
    Down,
    /// A button came up.
    Up,
    /// The pointer left the window.
    Leave,
}

/// A raw pointer event as delivered by the host.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// What happened.
    pub kind: PointerEventKind,
    /// Pointer position in surface coordinates.
    pub pos: Point,
}

bitflags::bitflags! {
    /// Keyboard modifier state carried on key events.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// A shift key is held.
        const SHIFT = 0b0001;
        /// A control key is held.
        const CTRL  = 0b0010;
        /// An alt key is held.
        const ALT   = 0b0100;
        /// A platform/meta key is held.
        const META  = 0b1000;
    }
}

/// A raw key event as delivered by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Host keycode, uninterpreted.
    pub key: u32,
    /// Modifier state at the time of the event.
    pub modifiers: Modifiers,
}

/// The pointer shape an element asks for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    /// The platform arrow.
    #[default]
    Default,
    /// A pointing hand, for activatable content.
    Hand,
    /// A text caret.
    Text,
    /// A busy indicator.
    Wait,
    /// A crosshair.
    Crosshair,
    /// A four-way move arrow.
    Move,
}

impl Cursor {
    /// Decodes a cursor from its property encoding.
    ///
    /// Unknown values decode to [`Cursor::Default`].
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Hand,
            2 => Self::Text,
            3 => Self::Wait,
            4 => Self::Crosshair,
            5 => Self::Move,
            _ => Self::Default,
        }
    }

    /// Returns the property encoding.
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Hand => 1,
            Self::Text => 2,
            Self::Wait => 3,
            Self::Crosshair => 4,
            Self::Move => 5,
        }
    }
}

// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tagged value union stored in property slots and collections.

use alloc::string::String;
use core::fmt;
use core::time::Duration;

use kurbo::{Point, Rect, Size};
use peniko::Color;

use crate::heap::ObjectId;

/// The tag of a [`Value`].
///
/// Property registrations and collections declare the kind they accept;
/// writes with any other tag are rejected before side effects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int`].
    Int,
    /// [`Value::Double`].
    Double,
    /// [`Value::Str`].
    Str,
    /// [`Value::Point`].
    Point,
    /// [`Value::Size`].
    Size,
    /// [`Value::Rect`].
    Rect,
    /// [`Value::Color`].
    Color,
    /// [`Value::Duration`].
    Duration,
    /// [`Value::TimeSpan`].
    TimeSpan,
    /// [`Value::Object`].
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::Str => "str",
            Self::Point => "point",
            Self::Size => "size",
            Self::Rect => "rect",
            Self::Color => "color",
            Self::Duration => "duration",
            Self::TimeSpan => "timespan",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// A property value.
///
/// The tag is fixed at construction. Cloning is a deep copy for every tag;
/// an [`Value::Object`] clone copies the id only and does *not* adjust the
/// target's reference count. Copies that participate in ownership go through
/// [`ObjectHeap::retain_value`](crate::ObjectHeap::retain_value) and
/// [`ObjectHeap::release_value`](crate::ObjectHeap::release_value).
#[derive(Clone, Debug)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// A 32-bit signed integer.
    Int(i32),
    /// A double-precision float.
    Double(f64),
    /// An owned string.
    Str(String),
    /// A 2D point.
    Point(Point),
    /// A 2D size.
    Size(Size),
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// An sRGB color with alpha.
    Color(Color),
    /// An elapsed-time duration.
    Duration(Duration),
    /// A signed span in 100 ns ticks.
    TimeSpan(i64),
    /// A reference to a heap object.
    ///
    /// Id equality is identity equality: ids are unique per live object.
    Object(ObjectId),
}

impl Value {
    /// Returns the value's tag.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Str(_) => ValueKind::Str,
            Self::Point(_) => ValueKind::Point,
            Self::Size(_) => ValueKind::Size,
            Self::Rect(_) => ValueKind::Rect,
            Self::Color(_) => ValueKind::Color,
            Self::Duration(_) => ValueKind::Duration,
            Self::TimeSpan(_) => ValueKind::TimeSpan,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns the boolean payload, if this is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a [`Value::Double`].
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the point payload, if this is a [`Value::Point`].
    #[must_use]
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns the size payload, if this is a [`Value::Size`].
    #[must_use]
    pub fn as_size(&self) -> Option<Size> {
        match self {
            Self::Size(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the rectangle payload, if this is a [`Value::Rect`].
    #[must_use]
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the color payload, if this is a [`Value::Color`].
    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns the duration payload, if this is a [`Value::Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the tick payload, if this is a [`Value::TimeSpan`].
    #[must_use]
    pub fn as_timespan(&self) -> Option<i64> {
        match self {
            Self::TimeSpan(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the object id, if this is a [`Value::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Point(a), Self::Point(b)) => a == b,
            (Self::Size(a), Self::Size(b)) => a == b,
            (Self::Rect(a), Self::Rect(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a.components == b.components,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::TimeSpan(a), Self::TimeSpan(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for property and collection mutation.

use core::fmt;

use crate::value::ValueKind;

/// Why a property write was rejected.
///
/// A rejected write has no side effects: the property table, notification
/// queue, and reference counts are untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetError {
    /// The property id is not registered.
    UnknownProperty,
    /// The value's tag does not match the property's declared kind.
    TypeMismatch {
        /// The kind the property was registered with.
        expected: ValueKind,
        /// The kind of the rejected value.
        found: ValueKind,
    },
    /// The object value's target already has a different logical parent and
    /// the property does not opt into reparenting.
    AlreadyParented,
    /// The object id (owner or value target) refers to a freed slot.
    DeadObject,
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty => write!(f, "property is not registered"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "value kind {found} does not match declared kind {expected}")
            }
            Self::AlreadyParented => {
                write!(f, "object value already has a different logical parent")
            }
            Self::DeadObject => write!(f, "object id refers to a freed slot"),
        }
    }
}

impl core::error::Error for SetError {}

/// Why a collection mutation was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// The value's tag does not match the collection's element kind.
    TypeMismatch {
        /// The element kind the collection was created with.
        expected: ValueKind,
        /// The kind of the rejected value.
        found: ValueKind,
    },
    /// The index is past the end of the collection.
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The collection length at the time of the call.
        len: usize,
    },
    /// The object element already has a logical parent other than the
    /// collection's owner.
    AlreadyParented,
    /// The object element refers to a freed slot.
    DeadElement,
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "element kind {found} does not match collection kind {expected}")
            }
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for collection of length {len}")
            }
            Self::AlreadyParented => {
                write!(f, "element already has a logical parent other than the owner")
            }
            Self::DeadElement => write!(f, "element refers to a freed slot"),
        }
    }
}

impl core::error::Error for CollectionError {}

/// The collection mutated structurally since the iterator was created.
///
/// Returned by every [`CollectionIterator`](crate::CollectionIterator) method
/// once the snapshot generation no longer matches; the iterator never yields
/// an element from the mutated collection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IterInvalidated;

impl fmt::Display for IterInvalidated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection mutated underneath the iterator")
    }
}

impl core::error::Error for IterInvalidated {}

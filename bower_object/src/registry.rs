// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Load-time property registration and name lookup.

use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use bower_dirty::DirtyFlags;
use hashbrown::HashMap;

use crate::value::{Value, ValueKind};

/// A registered property.
///
/// Handles are dense indices into the registry that created them; they are
/// only meaningful together with that registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        self.0
    }
}

/// A stateless hook invoked after a property's stored value changes.
///
/// Receives the previous value (absent on first set) and the new one.
pub type ChangedHook = fn(Option<&Value>, &Value);

/// Behavior declared at registration time.
///
/// Built with chained setters:
///
/// ```
/// use bower_dirty::DirtyFlags;
/// use bower_object::{PropertyMetadata, ValueKind};
///
/// let meta = PropertyMetadata::new(ValueKind::Rect).affects(DirtyFlags::BOUNDS);
/// assert_eq!(meta.kind(), ValueKind::Rect);
/// assert_eq!(meta.affected(), DirtyFlags::BOUNDS);
/// ```
#[derive(Clone)]
pub struct PropertyMetadata {
    kind: ValueKind,
    affects: DirtyFlags,
    allows_reparent: bool,
    changed: Option<ChangedHook>,
}

impl PropertyMetadata {
    /// Creates metadata for a property holding values of `kind`.
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            affects: DirtyFlags::empty(),
            allows_reparent: false,
            changed: None,
        }
    }

    /// Declares the dirty flags a change to this property raises.
    #[must_use]
    pub fn affects(mut self, flags: DirtyFlags) -> Self {
        self.affects = flags;
        self
    }

    /// Permits object values that already have a different logical parent.
    #[must_use]
    pub fn allows_reparent(mut self) -> Self {
        self.allows_reparent = true;
        self
    }

    /// Installs the changed hook.
    #[must_use]
    pub fn on_changed(mut self, hook: ChangedHook) -> Self {
        self.changed = Some(hook);
        self
    }

    /// The declared value kind.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The dirty flags raised by a change.
    #[must_use]
    pub fn affected(&self) -> DirtyFlags {
        self.affects
    }

    /// Whether already-parented object values are accepted.
    #[must_use]
    pub fn reparent_allowed(&self) -> bool {
        self.allows_reparent
    }

    /// Invokes the changed hook, if one is installed.
    pub fn notify_changed(&self, old: Option<&Value>, new: &Value) {
        if let Some(hook) = self.changed {
            hook(old, new);
        }
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("kind", &self.kind)
            .field("affects", &self.affects)
            .field("allows_reparent", &self.allows_reparent)
            .field("changed", &self.changed.is_some())
            .finish()
    }
}

/// The interned table of property registrations.
///
/// Registration happens once at startup; lookups happen on every dispatch.
/// [`PropertyRegistry::by_name`] keeps a one-entry cache of the last
/// successful lookup, so repeated dispatch of the same symbol skips the hash
/// map.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    entries: Vec<(&'static str, PropertyMetadata)>,
    by_name: HashMap<&'static str, PropertyId>,
    last_lookup: Cell<Option<(&'static str, PropertyId)>>,
}

impl PropertyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered or the table overflows its
    /// `u16` index space. Both are startup-time errors.
    pub fn register(&mut self, name: &'static str, metadata: PropertyMetadata) -> PropertyId {
        let raw = u16::try_from(self.entries.len()).expect("property registry overflow");
        let id = PropertyId(raw);
        let previous = self.by_name.insert(name, id);
        assert!(previous.is_none(), "duplicate property registration: {name}");
        self.entries.push((name, metadata));
        id
    }

    /// Looks a property up by name.
    pub fn by_name(&self, name: &str) -> Option<PropertyId> {
        if let Some((cached_name, cached_id)) = self.last_lookup.get()
            && cached_name == name
        {
            return Some(cached_id);
        }
        let (&interned, &id) = self.by_name.get_key_value(name)?;
        self.last_lookup.set(Some((interned, id)));
        Some(id)
    }

    /// Returns the metadata for a registered property.
    #[must_use]
    pub fn metadata(&self, id: PropertyId) -> Option<&PropertyMetadata> {
        self.entries.get(usize::from(id.0)).map(|(_, meta)| meta)
    }

    /// Returns the name a property was registered under.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.entries.get(usize::from(id.0)).map(|(name, _)| *name)
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

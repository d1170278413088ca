// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene coordinator.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use bower_dirty::{DepthLists, DirtyFlags, DrainOrder};
use bower_object::{
    ChangeSummary, ChildSlot, Collection, CollectionError, Notification, ObjectHeap, ObjectId,
    PropertyId, PropertyMetadata, PropertyRegistry, SetError, SurfaceTag, TypeKind, Value,
    ValueKind,
};
use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use smallvec::SmallVec;

use crate::events::{EventCompat, EventKind, Handler, HandlerId, RoutedEvent};
use crate::host::WindowHandle;
use crate::region::InvalidRegion;
use crate::registry::{InstanceId, SurfaceRegistry};

/// Where a surface is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    /// Accepting content, input, and paint.
    Active,
    /// Mid window swap; transient, never observed across a public call.
    FullscreenTransition,
    /// Torn down. Every entry point is a logged no-op.
    Zombie,
}

/// Why [`Surface::attach`] refused a root.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttachError {
    /// The surface is a zombie.
    Zombie,
    /// The root id refers to a freed slot.
    DeadRoot,
    /// The root is not a container visual.
    NotContainer,
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zombie => write!(f, "surface is a zombie"),
            Self::DeadRoot => write!(f, "root refers to a freed slot"),
            Self::NotContainer => write!(f, "root is not a container visual"),
        }
    }
}

impl core::error::Error for AttachError {}

/// Why a child mutation through the surface failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// The parent has no children collection.
    NotContainer,
    /// The underlying collection rejected the element.
    Collection(CollectionError),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotContainer => write!(f, "parent has no children collection"),
            Self::Collection(err) => write!(f, "{err}"),
        }
    }
}

impl From<CollectionError> for TreeError {
    fn from(err: CollectionError) -> Self {
        Self::Collection(err)
    }
}

impl core::error::Error for TreeError {}

/// The well-known visual properties every surface registers at creation.
///
/// Content and embedders register further properties through
/// [`Surface::register_property`]; these are the ones the coordinator itself
/// reads during hit testing, painting, and focus.
#[derive(Copy, Clone, Debug)]
pub struct VisualProps {
    /// World-space rectangle of the element (`Rect`).
    pub bounds: PropertyId,
    /// Whether the element and its subtree render (`Bool`, default `true`).
    pub visible: PropertyId,
    /// Whether the element participates in hit testing (`Bool`, default
    /// `true`).
    pub hit_test_visible: PropertyId,
    /// Stacking order among siblings (`Int`, default `0`).
    pub z_index: PropertyId,
    /// Whether the element can take keyboard focus (`Bool`, default
    /// `false`).
    pub tab_stop: PropertyId,
    /// Element opacity in `[0, 1]` (`Double`, default `1.0`).
    pub opacity: PropertyId,
    /// Pointer shape over the element (`Int` encoding of
    /// [`Cursor`](crate::Cursor), default the platform arrow).
    pub cursor: PropertyId,
}

impl VisualProps {
    fn register(registry: &mut PropertyRegistry) -> Self {
        Self {
            bounds: registry.register(
                "Bounds",
                PropertyMetadata::new(ValueKind::Rect)
                    .affects(DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE),
            ),
            visible: registry.register(
                "Visible",
                PropertyMetadata::new(ValueKind::Bool).affects(DirtyFlags::INVALIDATE),
            ),
            hit_test_visible: registry
                .register("HitTestVisible", PropertyMetadata::new(ValueKind::Bool)),
            z_index: registry.register(
                "ZIndex",
                PropertyMetadata::new(ValueKind::Int).affects(DirtyFlags::INVALIDATE),
            ),
            tab_stop: registry.register("TabStop", PropertyMetadata::new(ValueKind::Bool)),
            opacity: registry.register(
                "Opacity",
                PropertyMetadata::new(ValueKind::Double).affects(DirtyFlags::RENDER),
            ),
            cursor: registry.register("Cursor", PropertyMetadata::new(ValueKind::Int)),
        }
    }
}

/// Construction-time configuration for a [`Surface`].
#[derive(Copy, Clone, Debug)]
pub struct SurfaceOptions {
    /// Initial surface size.
    pub size: Size,
    /// The normal host window.
    pub window: WindowHandle,
    /// The window used while fullscreen, if the host provides one.
    pub fullscreen_window: Option<WindowHandle>,
    /// Which bubbling rules routed events follow.
    pub compat: EventCompat,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            size: Size::ZERO,
            window: WindowHandle::default(),
            fullscreen_window: None,
            compat: EventCompat::Routed,
        }
    }
}

type TickCallback = Box<dyn FnOnce(&mut Surface)>;

/// The coordinator for one scene tree.
///
/// Owns the object heap, the property registry, the children collections,
/// both dirty lists, the damage region, the tick queue, the handler tables,
/// and the pointer/focus state. Single-threaded by design: collaborator
/// results re-enter through [`Surface::schedule_tick`], and with the `std`
/// feature every entry point asserts the creating thread in debug builds.
pub struct Surface {
    pub(crate) tag: SurfaceTag,
    pub(crate) state: SurfaceState,
    pub(crate) heap: ObjectHeap,
    pub(crate) registry: PropertyRegistry,
    pub(crate) props: VisualProps,
    /// Children collections, keyed by their owning container.
    pub(crate) children: HashMap<ObjectId, Collection>,
    pub(crate) toplevel: Option<ObjectId>,
    pub(crate) size: Size,
    pub(crate) window: WindowHandle,
    pub(crate) normal_window: WindowHandle,
    pub(crate) fullscreen_window: Option<WindowHandle>,
    pub(crate) compat: EventCompat,
    pub(crate) up_dirty: DepthLists<ObjectId>,
    pub(crate) down_dirty: DepthLists<ObjectId>,
    pub(crate) dirty: HashMap<ObjectId, DirtyFlags>,
    pub(crate) bounds_cache: HashMap<ObjectId, Rect>,
    pub(crate) invalid: InvalidRegion,
    pub(crate) ticks: Vec<TickCallback>,
    pub(crate) handlers: HashMap<(ObjectId, EventKind), Vec<(HandlerId, Handler)>>,
    pub(crate) next_handler: u64,
    /// Current pointer chain, deepest first, ending at the toplevel.
    pub(crate) input_list: Vec<ObjectId>,
    pub(crate) last_pointer: Point,
    pub(crate) emitting: bool,
    pub(crate) captured: Option<ObjectId>,
    pub(crate) pending_capture: Option<ObjectId>,
    pub(crate) pending_release: bool,
    pub(crate) focused: Option<ObjectId>,
    pub(crate) previous_focus: Option<ObjectId>,
    pub(crate) focus_change_pending: bool,
    pub(crate) instance: Option<InstanceId>,
    #[cfg(feature = "std")]
    owner_thread: std::thread::ThreadId,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("toplevel", &self.toplevel)
            .field("size", &self.size)
            .field("focused", &self.focused)
            .field("captured", &self.captured)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Creates an active, empty surface.
    #[must_use]
    pub fn new(options: SurfaceOptions) -> Self {
        static NEXT_TAG: AtomicU32 = AtomicU32::new(1);
        let tag = SurfaceTag::new(NEXT_TAG.fetch_add(1, Ordering::Relaxed));
        let mut registry = PropertyRegistry::new();
        let props = VisualProps::register(&mut registry);
        Self {
            tag,
            state: SurfaceState::Active,
            heap: ObjectHeap::new(),
            registry,
            props,
            children: HashMap::new(),
            toplevel: None,
            size: options.size,
            window: options.window,
            normal_window: options.window,
            fullscreen_window: options.fullscreen_window,
            compat: options.compat,
            up_dirty: DepthLists::new(DrainOrder::BottomUp),
            down_dirty: DepthLists::new(DrainOrder::TopDown),
            dirty: HashMap::new(),
            bounds_cache: HashMap::new(),
            invalid: InvalidRegion::new(),
            ticks: Vec::new(),
            handlers: HashMap::new(),
            next_handler: 0,
            input_list: Vec::new(),
            last_pointer: Point::ZERO,
            emitting: false,
            captured: None,
            pending_capture: None,
            pending_release: false,
            focused: None,
            previous_focus: None,
            focus_change_pending: false,
            instance: None,
            #[cfg(feature = "std")]
            owner_thread: std::thread::current().id(),
        }
    }

    pub(crate) fn assert_owner(&self) {
        #[cfg(feature = "std")]
        debug_assert_eq!(
            std::thread::current().id(),
            self.owner_thread,
            "surface used off its creating thread"
        );
    }

    /// Returns the surface's lifecycle state.
    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Returns the tag attached objects carry.
    #[must_use]
    pub fn tag(&self) -> SurfaceTag {
        self.tag
    }

    /// Returns the current surface size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns the active host window.
    #[must_use]
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Returns `true` while the fullscreen window is active.
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen_window == Some(self.window)
    }

    /// Returns the attached root, if any.
    #[must_use]
    pub fn toplevel(&self) -> Option<ObjectId> {
        self.toplevel
    }

    /// Returns the object heap.
    #[must_use]
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// Returns the property registry.
    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Returns the well-known visual property ids.
    #[must_use]
    pub fn props(&self) -> &VisualProps {
        &self.props
    }

    /// Returns a container's children collection.
    #[must_use]
    pub fn children(&self, parent: ObjectId) -> Option<&Collection> {
        self.children.get(&parent)
    }

    /// Returns the currently focused element.
    #[must_use]
    pub fn focused(&self) -> Option<ObjectId> {
        self.focused
    }

    /// Returns the element holding pointer capture.
    #[must_use]
    pub fn captured(&self) -> Option<ObjectId> {
        self.captured
    }

    /// Returns the current pointer chain, deepest element first.
    #[must_use]
    pub fn input_list(&self) -> &[ObjectId] {
        &self.input_list
    }

    /// Returns the accumulated damage.
    #[must_use]
    pub fn invalid_region(&self) -> &InvalidRegion {
        &self.invalid
    }

    /// Registers a content property.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate name, like
    /// [`PropertyRegistry::register`].
    pub fn register_property(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata,
    ) -> PropertyId {
        self.registry.register(name, metadata)
    }

    /// Allocates a leaf visual.
    pub fn new_visual(&mut self) -> ObjectId {
        self.heap.alloc(TypeKind::Visual)
    }

    /// Allocates a plain (non-visual) object.
    pub fn new_object(&mut self) -> ObjectId {
        self.heap.alloc(TypeKind::Plain)
    }

    /// Allocates a container visual with an empty children collection.
    pub fn new_container(&mut self) -> ObjectId {
        let id = self.heap.alloc(TypeKind::Container);
        self.heap.set_child(id, ChildSlot::Children);
        self.children
            .insert(id, Collection::with_owner(ValueKind::Object, id));
        id
    }

    /// Appends `child` to `parent`'s children collection.
    ///
    /// The child is adopted (reference, parent back-reference, surface tag);
    /// if the parent is attached, the new subtree completes its load pass
    /// and `Loaded` fires bottom-up. Returns the child's index.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<usize, TreeError> {
        self.assert_owner();
        let Some(mut children) = self.children.remove(&parent) else {
            return Err(TreeError::NotContainer);
        };
        let index = children.len();
        let result = children.insert(&mut self.heap, index, Value::Object(child));
        self.children.insert(parent, children);
        result?;
        self.mark_dirty(parent, DirtyFlags::BOUNDS);
        self.mark_dirty(child, DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE);
        if self.heap.is_attached_to(child, self.tag) {
            self.load_subtree(child);
        }
        self.route_notifications();
        Ok(index)
    }

    /// Removes `child` from `parent`'s children collection.
    ///
    /// Returns `false` if it was not there. A removed element that held
    /// focus loses it.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        self.assert_owner();
        let Some(mut children) = self.children.remove(&parent) else {
            return false;
        };
        let removed = children
            .position(&Value::Object(child))
            .and_then(|index| children.remove_at(&mut self.heap, index).ok())
            .is_some();
        self.children.insert(parent, children);
        if removed {
            self.mark_dirty(parent, DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE);
            if self.focused == Some(child) {
                self.focus_element(None);
            }
            self.route_notifications();
        }
        removed
    }

    /// Attaches `root` as the scene's toplevel.
    ///
    /// The root must be a live container. Its subtree is tagged with this
    /// surface, completes the load pass bottom-up (`Loaded` per element),
    /// and is marked fully dirty. The surface registers (or re-registers)
    /// its root with the host's instance registry.
    pub fn attach(
        &mut self,
        root: ObjectId,
        instances: &mut SurfaceRegistry,
    ) -> Result<(), AttachError> {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("attach on zombie surface");
            return Err(AttachError::Zombie);
        }
        let Some(kind) = self.heap.type_kind(root) else {
            return Err(AttachError::DeadRoot);
        };
        if kind != TypeKind::Container {
            return Err(AttachError::NotContainer);
        }
        if let Some(old) = self.toplevel.take() {
            self.tag_subtree(old, None);
            self.heap.release(old);
        }
        self.heap.retain(root);
        self.toplevel = Some(root);
        self.tag_subtree(root, Some(self.tag));
        self.load_subtree(root);
        self.mark_dirty(root, DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE);
        self.invalid
            .add(Rect::from_origin_size(Point::ZERO, self.size));
        let root_uid = self.heap.uid(root).unwrap_or(0);
        match self.instance {
            Some(instance) => {
                instances.update_root(instance, root_uid);
            }
            None => self.instance = Some(instances.register(root_uid)),
        }
        self.route_notifications();
        Ok(())
    }

    /// Points the surface at a new normal host window.
    ///
    /// While fullscreen, the swap takes effect when fullscreen ends.
    pub fn set_window(&mut self, window: WindowHandle) {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("set_window on zombie surface");
            return;
        }
        let fullscreen = self.is_fullscreen();
        self.normal_window = window;
        if !fullscreen {
            self.window = window;
        }
    }

    /// Swaps between the normal and fullscreen windows.
    ///
    /// The tree, focus, and capture survive; only the window association
    /// changes and the scene repaints. Returns `false` if fullscreen was
    /// requested without a configured fullscreen window, or on a zombie.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("set_fullscreen on zombie surface");
            return false;
        }
        if fullscreen == self.is_fullscreen() {
            return true;
        }
        if fullscreen && self.fullscreen_window.is_none() {
            log::warn!("fullscreen requested without a fullscreen window");
            return false;
        }
        self.state = SurfaceState::FullscreenTransition;
        self.window = match (fullscreen, self.fullscreen_window) {
            (true, Some(window)) => window,
            _ => self.normal_window,
        };
        if let Some(top) = self.toplevel {
            self.mark_dirty(top, DirtyFlags::INVALIDATE);
        }
        self.invalid
            .add(Rect::from_origin_size(Point::ZERO, self.size));
        self.state = SurfaceState::Active;
        true
    }

    /// Tears the surface down, irreversibly.
    ///
    /// Pending capture and focus work is dropped, the tick queue cleared,
    /// and every later entry point becomes a logged no-op. Safe to call
    /// from inside an event handler; in-flight dispatch checks the state
    /// between handlers. Returns the instance id for the host to
    /// unregister.
    pub fn zombify(&mut self) -> Option<InstanceId> {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            return None;
        }
        self.state = SurfaceState::Zombie;
        self.captured = None;
        self.pending_capture = None;
        self.pending_release = false;
        self.focused = None;
        self.previous_focus = None;
        self.focus_change_pending = false;
        self.ticks.clear();
        self.input_list.clear();
        self.up_dirty.clear();
        self.down_dirty.clear();
        self.dirty.clear();
        self.invalid.clear();
        self.instance.take()
    }

    /// Resizes the surface and schedules a full repaint.
    pub fn handle_resize(&mut self, size: Size) {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("handle_resize on zombie surface");
            return;
        }
        self.size = size;
        if let Some(top) = self.toplevel {
            self.mark_dirty(top, DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE);
        }
        self.invalid.add(Rect::from_origin_size(Point::ZERO, size));
    }

    /// Writes a property through the coordinator.
    ///
    /// On a change, the property's declared dirty flags are routed into the
    /// dirty lists, a z-index write invalidates the parent collection's
    /// z cache, and queued heap notifications are drained.
    pub fn set_value(
        &mut self,
        id: ObjectId,
        property: PropertyId,
        value: Value,
    ) -> Result<ChangeSummary, SetError> {
        self.assert_owner();
        let summary = self.heap.set_value(id, property, value, &self.registry)?;
        if summary.changed {
            if !summary.affects.is_empty() {
                self.mark_dirty(id, summary.affects);
            }
            if property == self.props.z_index
                && let Some(parent) = self.heap.parent(id)
                && let Some(children) = self.children.get_mut(&parent)
            {
                children.invalidate_z_cache();
            }
        }
        self.route_notifications();
        Ok(summary)
    }

    /// Marks a node's subtree for repaint.
    pub fn invalidate(&mut self, node: ObjectId) {
        self.mark_dirty(node, DirtyFlags::INVALIDATE);
    }

    /// Marks a node's cached bounds for recomputation.
    pub fn update_bounds(&mut self, node: ObjectId) {
        self.mark_dirty(node, DirtyFlags::BOUNDS);
    }

    pub(crate) fn mark_dirty(&mut self, node: ObjectId, flags: DirtyFlags) {
        if self.state == SurfaceState::Zombie || flags.is_empty() || !self.heap.is_alive(node) {
            return;
        }
        *self.dirty.entry(node).or_default() |= flags;
        let depth = self.heap.depth(node);
        if flags.needs_upward() {
            self.up_dirty.push(node, depth);
        }
        if flags.needs_downward() {
            self.down_dirty.push(node, depth);
        }
    }

    /// Returns `true` if dirty work is pending.
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        !self.up_dirty.is_empty() || !self.down_dirty.is_empty()
    }

    /// Drains both dirty lists until they stay empty.
    ///
    /// Bounds work runs deepest-first, repaint propagation shallowest-first;
    /// marks added by the processing itself (new-bounds on parents, repaint
    /// spreading to children) are drained by the same call. Idempotent when
    /// nothing new was marked.
    pub fn process_dirty_elements(&mut self) {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            return;
        }
        loop {
            if let Some(node) = self.up_dirty.pop() {
                self.process_up(node);
                continue;
            }
            if let Some(node) = self.down_dirty.pop() {
                self.process_down(node);
                continue;
            }
            break;
        }
    }

    fn process_up(&mut self, node: ObjectId) {
        let flags = self.take_dirty(node, DirtyFlags::UPWARD);
        if !flags.needs_upward() || !self.heap.is_alive(node) {
            return;
        }
        let mut bounds = self.node_rect(node);
        for child in self.child_ids(node) {
            let child_bounds = self
                .bounds_cache
                .get(&child)
                .copied()
                .unwrap_or_else(|| self.node_rect(child));
            bounds = bounds.union(child_bounds);
        }
        let old = self.bounds_cache.insert(node, bounds);
        if old != Some(bounds) {
            if let Some(old) = old {
                self.invalid.add(old);
            }
            self.invalid.add(bounds);
            if let Some(parent) = self.heap.parent(node)
                && self.heap.type_kind(parent).is_some_and(TypeKind::is_visual)
            {
                self.mark_dirty(parent, DirtyFlags::NEW_BOUNDS);
            }
        }
    }

    fn process_down(&mut self, node: ObjectId) {
        let flags = self.take_dirty(node, DirtyFlags::DOWNWARD);
        if !flags.needs_downward() || !self.heap.is_alive(node) {
            return;
        }
        if flags.contains(DirtyFlags::INVALIDATE) {
            self.invalid.add(self.subtree_bounds(node));
            for child in self.child_ids(node) {
                if self.is_visible(child) {
                    self.mark_dirty(child, DirtyFlags::INVALIDATE);
                }
            }
        } else if flags.contains(DirtyFlags::RENDER) {
            self.invalid.add(self.node_rect(node));
        }
    }

    fn take_dirty(&mut self, node: ObjectId, mask: DirtyFlags) -> DirtyFlags {
        let Some(entry) = self.dirty.get_mut(&node) else {
            return DirtyFlags::empty();
        };
        let taken = *entry & mask;
        *entry &= !mask;
        if entry.is_empty() {
            self.dirty.remove(&node);
        }
        taken
    }

    /// Queues a one-shot callback for the next tick.
    ///
    /// Callbacks scheduled while a drain is in progress run on the
    /// following tick. Zombies accept nothing.
    pub fn schedule_tick(&mut self, callback: impl FnOnce(&mut Self) + 'static) {
        if self.state == SurfaceState::Zombie {
            return;
        }
        self.ticks.push(Box::new(callback));
    }

    pub(crate) fn run_ticks(&mut self) {
        let ticks = core::mem::take(&mut self.ticks);
        for callback in ticks {
            if self.state == SurfaceState::Zombie {
                break;
            }
            callback(self);
        }
    }

    /// Runs one frame tick: drains the tick queue, then the dirty lists.
    pub fn tick(&mut self) {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("tick on zombie surface");
            return;
        }
        self.run_ticks();
        self.process_dirty_elements();
    }

    /// Registers an event handler on an element.
    pub fn add_handler(
        &mut self,
        element: ObjectId,
        kind: EventKind,
        handler: impl Fn(&mut Self, &mut RoutedEvent) + 'static,
    ) -> HandlerId {
        self.next_handler += 1;
        let id = HandlerId::new(self.next_handler);
        self.handlers
            .entry((element, kind))
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Removes a handler registration. Returns `true` if it existed.
    pub fn remove_handler(&mut self, element: ObjectId, kind: EventKind, id: HandlerId) -> bool {
        let Some(handlers) = self.handlers.get_mut(&(element, kind)) else {
            return false;
        };
        let Some(index) = handlers.iter().position(|(hid, _)| *hid == id) else {
            return false;
        };
        handlers.remove(index);
        true
    }

    pub(crate) fn route_notifications(&mut self) {
        for notification in self.heap.take_notifications() {
            match notification {
                Notification::PropertyChanged { .. } => {}
                Notification::SubPropertyChanged { parent, .. } => {
                    if self.heap.type_kind(parent).is_some_and(TypeKind::is_visual) {
                        self.mark_dirty(parent, DirtyFlags::RENDER);
                    }
                }
                Notification::CollectionChanged { owner: Some(owner), .. } => {
                    if self.heap.type_kind(owner).is_some_and(TypeKind::is_visual) {
                        self.mark_dirty(owner, DirtyFlags::BOUNDS | DirtyFlags::INVALIDATE);
                    }
                }
                Notification::CollectionChanged { owner: None, .. } => {}
            }
        }
    }

    fn tag_subtree(&mut self, node: ObjectId, tag: Option<SurfaceTag>) {
        self.heap.set_surface_tag(node, tag);
        for child in self.child_ids(node) {
            self.tag_subtree(child, tag);
        }
    }

    pub(crate) fn load_subtree(&mut self, node: ObjectId) {
        for child in self.child_ids(node) {
            self.load_subtree(child);
        }
        if !self.heap.is_loaded(node) {
            self.heap.set_loaded(node, true);
            self.emit_single(EventKind::Loaded, node);
        }
    }

    pub(crate) fn child_ids(&self, node: ObjectId) -> SmallVec<[ObjectId; 8]> {
        let mut out = SmallVec::new();
        match self.heap.child(node) {
            Some(ChildSlot::Children) => {
                if let Some(children) = self.children.get(&node) {
                    out.extend(children.ids());
                }
            }
            Some(ChildSlot::Single(child)) => out.push(child),
            Some(ChildSlot::None) | None => {}
        }
        out
    }

    pub(crate) fn node_rect(&self, node: ObjectId) -> Rect {
        self.heap
            .value(node, self.props.bounds)
            .and_then(Value::as_rect)
            .unwrap_or(Rect::ZERO)
    }

    pub(crate) fn subtree_bounds(&self, node: ObjectId) -> Rect {
        self.bounds_cache
            .get(&node)
            .copied()
            .unwrap_or_else(|| self.node_rect(node))
    }

    pub(crate) fn is_visible(&self, node: ObjectId) -> bool {
        self.heap
            .value(node, self.props.visible)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub(crate) fn opacity(&self, node: ObjectId) -> f64 {
        self.heap
            .value(node, self.props.opacity)
            .and_then(Value::as_double)
            .unwrap_or(1.0)
    }

    pub(crate) fn is_hit_test_visible(&self, node: ObjectId) -> bool {
        self.heap
            .value(node, self.props.hit_test_visible)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Returns `true` if the element and every ancestor render.
    #[must_use]
    pub fn is_render_visible(&self, node: ObjectId) -> bool {
        if !self.heap.is_alive(node) {
            return false;
        }
        self.heap
            .path_to_root(node)
            .iter()
            .all(|&e| self.is_visible(e) && self.opacity(e) > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{PointerEvent, PointerEventKind};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    fn surface() -> Surface {
        Surface::new(SurfaceOptions {
            size: Size::new(100.0, 100.0),
            window: WindowHandle::new(1),
            fullscreen_window: Some(WindowHandle::new(2)),
            compat: EventCompat::Routed,
        })
    }

    fn set_rect(s: &mut Surface, node: ObjectId, x0: f64, y0: f64, x1: f64, y1: f64) {
        let bounds = s.props().bounds;
        s.set_value(node, bounds, Value::Rect(Rect::new(x0, y0, x1, y1)))
            .unwrap();
    }

    #[test]
    fn attach_rejects_non_containers_and_dead_roots() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let leaf = s.new_visual();
        assert_eq!(s.attach(leaf, &mut instances), Err(AttachError::NotContainer));

        let gone = s.new_container();
        let root2 = s.new_container();
        s.heap.release(gone);
        assert_eq!(s.attach(gone, &mut instances), Err(AttachError::DeadRoot));
        assert!(s.attach(root2, &mut instances).is_ok());
        assert_eq!(instances.len(), 1);
    }

    #[test]
    fn attach_tags_loads_bottom_up_and_registers() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let child = s.new_visual();
        s.add_child(root, child).unwrap();
        assert!(!s.heap().is_loaded(child));

        let loads: Rc<RefCell<Vec<ObjectId>>> = Rc::default();
        for element in [root, child] {
            let loads = loads.clone();
            s.add_handler(element, EventKind::Loaded, move |_, event| {
                loads.borrow_mut().push(event.element);
            });
        }
        s.attach(root, &mut instances).unwrap();

        assert_eq!(loads.borrow().as_slice(), [child, root]);
        assert!(s.heap().is_attached_to(child, s.tag()));
        assert!(s.heap().is_loaded(root));
        let roots: Vec<_> = instances.roots().collect();
        assert_eq!(roots[0].1, s.heap().uid(root).unwrap());
    }

    #[test]
    fn attaching_a_second_root_reuses_the_instance() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let first = s.new_container();
        let second = s.new_container();
        s.attach(first, &mut instances).unwrap();
        s.attach(second, &mut instances).unwrap();

        assert_eq!(instances.len(), 1);
        let roots: Vec<_> = instances.roots().collect();
        assert_eq!(roots[0].1, s.heap().uid(second).unwrap());
        assert_eq!(s.heap().surface_tag(first), None);
    }

    #[test]
    fn property_changes_route_dirty_flags_into_damage() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let child = s.new_visual();
        set_rect(&mut s, root, 0.0, 0.0, 100.0, 100.0);
        s.add_child(root, child).unwrap();
        s.attach(root, &mut instances).unwrap();
        s.process_dirty_elements();
        s.invalid.clear();

        set_rect(&mut s, child, 10.0, 10.0, 30.0, 30.0);
        assert!(s.has_dirty());
        s.process_dirty_elements();
        assert!(!s.has_dirty());
        assert!(s.invalid_region().intersects(Rect::new(10.0, 10.0, 30.0, 30.0)));

        // Idempotent: a second drain with no new marks adds nothing.
        s.invalid.clear();
        s.process_dirty_elements();
        assert!(s.invalid_region().is_empty());
    }

    #[test]
    fn bounds_growth_dirties_the_parent_chain() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let mid = s.new_container();
        let leaf = s.new_visual();
        set_rect(&mut s, root, 0.0, 0.0, 100.0, 100.0);
        set_rect(&mut s, mid, 0.0, 0.0, 10.0, 10.0);
        s.add_child(root, mid).unwrap();
        s.add_child(mid, leaf).unwrap();
        s.attach(root, &mut instances).unwrap();
        s.process_dirty_elements();

        // A leaf poking outside its parent's rect grows the cached union.
        set_rect(&mut s, leaf, 0.0, 0.0, 40.0, 40.0);
        s.process_dirty_elements();
        assert_eq!(s.subtree_bounds(mid), Rect::new(0.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn fullscreen_swap_preserves_tree_and_focus() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let button = s.new_visual();
        set_rect(&mut s, root, 0.0, 0.0, 100.0, 100.0);
        s.add_child(root, button).unwrap();
        s.attach(root, &mut instances).unwrap();
        let tab_stop = s.props().tab_stop;
        s.set_value(button, tab_stop, Value::Bool(true)).unwrap();
        assert!(s.focus_element(Some(button)));
        s.tick();

        assert!(s.set_fullscreen(true));
        assert!(s.is_fullscreen());
        assert_eq!(s.state(), SurfaceState::Active);
        assert_eq!(s.toplevel(), Some(root));
        assert_eq!(s.focused(), Some(button));

        assert!(s.set_fullscreen(false));
        assert_eq!(s.window(), WindowHandle::new(1));
    }

    #[test]
    fn set_window_defers_while_fullscreen() {
        let mut s = surface();
        s.set_window(WindowHandle::new(3));
        assert_eq!(s.window(), WindowHandle::new(3));

        // Mid-fullscreen the swap is held until the normal window returns.
        assert!(s.set_fullscreen(true));
        s.set_window(WindowHandle::new(4));
        assert_eq!(s.window(), WindowHandle::new(2));
        assert!(s.set_fullscreen(false));
        assert_eq!(s.window(), WindowHandle::new(4));

        s.zombify();
        s.set_window(WindowHandle::new(5));
        assert_eq!(s.window(), WindowHandle::new(4));
    }

    #[test]
    fn fullscreen_without_a_second_window_is_refused() {
        let mut s = Surface::new(SurfaceOptions::default());
        assert!(!s.set_fullscreen(true));
        assert_eq!(s.state(), SurfaceState::Active);
    }

    #[test]
    fn zombify_turns_entry_points_into_noops() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        set_rect(&mut s, root, 0.0, 0.0, 100.0, 100.0);
        s.attach(root, &mut instances).unwrap();

        let instance = s.zombify().expect("first zombify yields the instance");
        assert!(instances.unregister(instance));
        assert_eq!(s.zombify(), None);
        assert_eq!(s.state(), SurfaceState::Zombie);

        assert_eq!(s.attach(root, &mut instances), Err(AttachError::Zombie));
        assert!(!s.handle_pointer_event(PointerEvent {
            kind: PointerEventKind::Move,
            pos: Point::new(5.0, 5.0),
        }));
        assert!(!s.set_fullscreen(true));
        s.tick();
        assert!(!s.has_dirty());
    }

    #[test]
    fn scheduled_ticks_run_once_in_order() {
        let mut s = surface();
        let seen: Rc<RefCell<Vec<u32>>> = Rc::default();
        for i in 0..3 {
            let seen = seen.clone();
            s.schedule_tick(move |_| seen.borrow_mut().push(i));
        }
        s.tick();
        assert_eq!(seen.borrow().as_slice(), [0, 1, 2]);
        s.tick();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn ticks_scheduled_during_a_drain_wait_for_the_next() {
        let mut s = surface();
        let seen: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let outer = seen.clone();
        s.schedule_tick(move |s| {
            outer.borrow_mut().push("first");
            let inner = outer.clone();
            s.schedule_tick(move |_| inner.borrow_mut().push("second"));
        });
        s.tick();
        assert_eq!(seen.borrow().as_slice(), ["first"]);
        s.tick();
        assert_eq!(seen.borrow().as_slice(), ["first", "second"]);
    }

    #[test]
    fn add_child_to_attached_parent_completes_the_load_pass() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        s.attach(root, &mut instances).unwrap();

        let late = s.new_visual();
        let loads: Rc<RefCell<Vec<ObjectId>>> = Rc::default();
        let record = loads.clone();
        s.add_handler(late, EventKind::Loaded, move |_, event| {
            record.borrow_mut().push(event.element);
        });
        s.add_child(root, late).unwrap();

        assert!(s.heap().is_loaded(late));
        assert_eq!(loads.borrow().as_slice(), [late]);
    }

    #[test]
    fn remove_child_drops_focus_and_detaches() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let child = s.new_visual();
        s.add_child(root, child).unwrap();
        s.attach(root, &mut instances).unwrap();
        let tab_stop = s.props().tab_stop;
        s.set_value(child, tab_stop, Value::Bool(true)).unwrap();
        assert!(s.focus_element(Some(child)));

        assert!(s.remove_child(root, child));
        assert_eq!(s.focused(), None);
        assert_eq!(s.heap().parent(child), None);
        assert!(!s.remove_child(root, child));
    }

    #[test]
    fn z_index_writes_invalidate_the_sibling_order() {
        let mut instances = SurfaceRegistry::new();
        let mut s = surface();
        let root = s.new_container();
        let a = s.new_visual();
        let b = s.new_visual();
        set_rect(&mut s, root, 0.0, 0.0, 100.0, 100.0);
        set_rect(&mut s, a, 0.0, 0.0, 100.0, 100.0);
        set_rect(&mut s, b, 0.0, 0.0, 100.0, 100.0);
        s.add_child(root, a).unwrap();
        s.add_child(root, b).unwrap();
        s.attach(root, &mut instances).unwrap();
        s.process_dirty_elements();

        // Insertion order ties: b sits on top.
        assert_eq!(s.hit_test(Point::new(5.0, 5.0)), [b, root]);
        let z_index = s.props().z_index;
        s.set_value(a, z_index, Value::Int(10)).unwrap();
        assert_eq!(s.hit_test(Point::new(5.0, 5.0)), [a, root]);
    }
}

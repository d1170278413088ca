// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer and key routing.
//!
//! Pointer events resolve to a *hit chain*: the deepest element under the
//! pointer followed by its ancestors up to the toplevel. Enter/leave pairs
//! come from diffing the previous chain against the new one from the tails:
//! the shared suffix (the part of the ancestry that did not change) gets
//! nothing, the old chain's unique prefix gets `MouseLeave`, the new one's
//! gets `MouseEnter`.

use alloc::vec::Vec;

use bower_object::{ObjectId, Value, WalkDirection};
use kurbo::Point;

use crate::events::{EventCompat, EventKind, Handler, RoutedEvent};
use crate::host::{Cursor, KeyEvent, PointerEvent, PointerEventKind};
use crate::surface::{Surface, SurfaceState};

/// Walks both chains from their tails (the shared root end) and returns the
/// lengths of the non-common prefixes.
fn uncommon_prefixes(old: &[ObjectId], new: &[ObjectId]) -> (usize, usize) {
    let mut i = old.len();
    let mut j = new.len();
    while i > 0 && j > 0 && old[i - 1] == new[j - 1] {
        i -= 1;
        j -= 1;
    }
    (i, j)
}

impl Surface {
    /// Routes a raw pointer event through the tree.
    ///
    /// Returns `true` if some handler marked an emitted event handled,
    /// whether enter, leave, or the primary.
    /// Re-entrant calls from inside a handler are refused; zombies and
    /// surfaces without a toplevel ignore input. Pending dirty work is
    /// processed first, so hit testing sees settled bounds.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> bool {
        self.assert_owner();
        if self.emitting {
            log::debug!("re-entrant pointer event dropped");
            return false;
        }
        if self.state == SurfaceState::Zombie {
            log::debug!("pointer event on zombie surface");
            return false;
        }
        if self.toplevel.is_none() {
            return false;
        }
        self.process_dirty_elements();
        if event.kind != PointerEventKind::Leave {
            self.last_pointer = event.pos;
        }

        let new_list: Vec<ObjectId> = if let Some(captured) = self.captured {
            self.heap.path_to_root(captured).to_vec()
        } else if event.kind == PointerEventKind::Leave {
            Vec::new()
        } else {
            self.hit_test(event.pos)
        };

        let (old_prefix, new_prefix) = uncommon_prefixes(&self.input_list, &new_list);
        let force = matches!(event.kind, PointerEventKind::Down | PointerEventKind::Up);
        let primary = match event.kind {
            PointerEventKind::Move => Some(EventKind::MouseMove),
            PointerEventKind::Down => Some(EventKind::MouseDown),
            PointerEventKind::Up => Some(EventKind::MouseUp),
            PointerEventKind::Leave => None,
        };

        self.emitting = true;
        let mut handled = false;
        if self.captured.is_none() {
            if old_prefix > 0 {
                let leaving: Vec<ObjectId> = self.input_list[..old_prefix].to_vec();
                handled |=
                    self.emit_on_list(EventKind::MouseLeave, &leaving, Some(event.pos), None);
            }
            if new_prefix > 0 && self.state != SurfaceState::Zombie {
                let entering = &new_list[..new_prefix];
                handled |=
                    self.emit_on_list(EventKind::MouseEnter, entering, Some(event.pos), None);
            }
        }
        let deepest_unchanged = old_prefix == 0 && new_prefix == 0;
        if let Some(primary) = primary
            && self.state != SurfaceState::Zombie
            && (self.captured.is_some() || deepest_unchanged || force)
        {
            handled |= self.emit_on_list(primary, &new_list, Some(event.pos), None);
        }
        if event.kind == PointerEventKind::Down
            && self.compat == EventCompat::Routed
            && self.captured.is_none()
            && self.state != SurfaceState::Zombie
            && let Some(&deepest) = new_list.first()
        {
            // A press offers focus to the deepest element only; if it is
            // not focusable, focus stays where it was.
            self.focus_element(Some(deepest));
        }
        self.emitting = false;

        // Handlers may have hidden or freed elements in the chain.
        let mut stored = new_list;
        stored.retain(|&e| {
            self.heap.is_alive(e) && self.is_render_visible(e) && self.is_hit_test_visible(e)
        });
        self.input_list = stored;

        self.apply_pending_capture();
        handled
    }

    /// Routes a key event along the focus chain.
    pub fn handle_key_event(&mut self, key: KeyEvent, down: bool) -> bool {
        self.assert_owner();
        if self.emitting || self.state == SurfaceState::Zombie {
            return false;
        }
        let Some(focused) = self.focused else {
            return false;
        };
        let path = self.heap.path_to_root(focused).to_vec();
        let kind = if down { EventKind::KeyDown } else { EventKind::KeyUp };
        self.emitting = true;
        let handled = self.emit_on_list(kind, &path, None, Some(key));
        self.emitting = false;
        self.apply_pending_capture();
        handled
    }

    /// Reflects window activation onto the focused chain.
    ///
    /// The focused element keeps focus; this only re-emits `GotFocus` /
    /// `LostFocus` so content can restyle for an inactive window.
    pub fn handle_window_focus(&mut self, focused: bool) {
        self.assert_owner();
        if self.emitting || self.state == SurfaceState::Zombie {
            return;
        }
        let Some(element) = self.focused else {
            return;
        };
        let path = self.heap.path_to_root(element).to_vec();
        let kind = if focused { EventKind::GotFocus } else { EventKind::LostFocus };
        self.emitting = true;
        self.emit_on_list(kind, &path, None, None);
        self.emitting = false;
        self.apply_pending_capture();
    }

    /// Grants or releases pointer capture.
    ///
    /// While captured, every pointer event routes along the captured
    /// element's chain with no enter/leave churn. A second capture while
    /// one is active is refused. Requests made during dispatch are deferred
    /// and applied once the bubble finishes; release then re-evaluates the
    /// enter states at the last pointer position.
    pub fn set_mouse_capture(&mut self, target: Option<ObjectId>) -> bool {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            return false;
        }
        match target {
            Some(element) => {
                if !self.heap.is_alive(element) {
                    return false;
                }
                if self.captured.is_some_and(|c| c != element)
                    || self.pending_capture.is_some_and(|c| c != element)
                {
                    return false;
                }
                if self.emitting {
                    self.pending_capture = Some(element);
                } else {
                    self.capture_now(element);
                }
                true
            }
            None => {
                if self.emitting {
                    self.pending_release = true;
                } else {
                    self.release_capture_now();
                }
                true
            }
        }
    }

    fn capture_now(&mut self, element: ObjectId) {
        self.captured = Some(element);
        self.input_list = self.heap.path_to_root(element).to_vec();
    }

    fn release_capture_now(&mut self) {
        if self.captured.take().is_none() {
            return;
        }
        // Rebuild the enter states where the pointer actually is. Elements
        // shared with the captured chain stay entered, so no leave events.
        let new_list = self.hit_test(self.last_pointer);
        let (_, new_prefix) = uncommon_prefixes(&self.input_list, &new_list);
        if new_prefix > 0 {
            self.emitting = true;
            let pos = Some(self.last_pointer);
            self.emit_on_list(EventKind::MouseEnter, &new_list[..new_prefix], pos, None);
            self.emitting = false;
        }
        self.input_list = new_list;
    }

    fn apply_pending_capture(&mut self) {
        if self.pending_release {
            self.pending_release = false;
            self.pending_capture = None;
            self.release_capture_now();
        } else if let Some(element) = self.pending_capture.take() {
            if self.heap.is_alive(element) && self.captured.is_none() {
                self.capture_now(element);
            }
        }
    }

    /// Returns the cursor for the current pointer chain: the first
    /// non-default cursor property from the deepest element out.
    #[must_use]
    pub fn cursor_from_input_list(&self) -> Cursor {
        for &element in &self.input_list {
            let cursor = self
                .heap
                .value(element, self.props.cursor)
                .and_then(Value::as_int)
                .map(Cursor::from_raw)
                .unwrap_or_default();
            if cursor != Cursor::Default {
                return cursor;
            }
        }
        Cursor::Default
    }

    /// Resolves the hit chain under `pos`, deepest element first.
    ///
    /// Only visible, hit-test-visible elements participate; children are
    /// clipped to their parent's rect; among overlapping siblings the
    /// topmost z wins.
    pub fn hit_test(&mut self, pos: Point) -> Vec<ObjectId> {
        let mut list = Vec::new();
        if let Some(top) = self.toplevel {
            self.hit_test_node(top, pos, &mut list);
        }
        list
    }

    fn hit_test_node(&mut self, node: ObjectId, pos: Point, list: &mut Vec<ObjectId>) -> bool {
        if !self.heap.is_alive(node)
            || !self.is_visible(node)
            || !self.is_hit_test_visible(node)
            || self.opacity(node) <= 0.0
        {
            return false;
        }
        if !self.node_rect(node).contains(pos) {
            return false;
        }
        for child in self.children_in_order(node, WalkDirection::ZReverse) {
            if self.hit_test_node(child, pos, list) {
                break;
            }
        }
        list.push(node);
        true
    }

    pub(crate) fn children_in_order(
        &mut self,
        node: ObjectId,
        direction: WalkDirection,
    ) -> Vec<ObjectId> {
        let mut collection = self.children.remove(&node);
        let mut walker = bower_object::VisualTreeWalker::new(
            &self.heap,
            node,
            collection.as_mut(),
            direction,
            self.props.z_index,
        );
        if let Some(collection) = collection {
            self.children.insert(node, collection);
        }
        let mut out = Vec::with_capacity(walker.count());
        while let Some(child) = walker.step() {
            out.push(child);
        }
        out
    }

    /// Bubbles `kind` upward along `list` (index 0 is the deepest element).
    ///
    /// Under [`EventCompat::Routed`] the bubble stops once a handler marks
    /// the event handled; under [`EventCompat::Legacy`] it always reaches
    /// the root. The surface state is re-checked between handlers so a
    /// zombifying handler stops dispatch.
    pub(crate) fn emit_on_list(
        &mut self,
        kind: EventKind,
        list: &[ObjectId],
        pos: Option<Point>,
        key: Option<KeyEvent>,
    ) -> bool {
        let mut event = RoutedEvent {
            kind,
            element: match list.first() {
                Some(&deepest) => deepest,
                None => return false,
            },
            pos,
            key,
            handled: false,
        };
        'bubble: for &element in list {
            if self.state == SurfaceState::Zombie {
                break;
            }
            if !self.heap.is_alive(element) {
                continue;
            }
            let handlers: Vec<Handler> = self
                .handlers
                .get(&(element, kind))
                .map(|registered| registered.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default();
            event.element = element;
            for handler in handlers {
                if self.state == SurfaceState::Zombie {
                    break 'bubble;
                }
                handler(self, &mut event);
                if event.handled && self.compat == EventCompat::Routed {
                    break 'bubble;
                }
            }
        }
        event.handled
    }

    pub(crate) fn emit_single(&mut self, kind: EventKind, element: ObjectId) {
        self.emit_on_list(kind, &[element], None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Modifiers;
    use crate::registry::SurfaceRegistry;
    use crate::surface::{Surface, SurfaceOptions};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use kurbo::{Rect, Size};

    type Log = Rc<RefCell<Vec<(EventKind, ObjectId)>>>;

    /// Root spanning the surface with two side-by-side children.
    struct Fixture {
        s: Surface,
        root: ObjectId,
        left: ObjectId,
        right: ObjectId,
        log: Log,
    }

    fn fixture_with(compat: EventCompat) -> Fixture {
        let mut instances = SurfaceRegistry::new();
        let mut s = Surface::new(SurfaceOptions {
            size: Size::new(100.0, 100.0),
            compat,
            ..SurfaceOptions::default()
        });
        let root = s.new_container();
        let left = s.new_visual();
        let right = s.new_visual();
        let bounds = s.props().bounds;
        s.set_value(root, bounds, Value::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        s.set_value(left, bounds, Value::Rect(Rect::new(0.0, 0.0, 50.0, 100.0)))
            .unwrap();
        s.set_value(right, bounds, Value::Rect(Rect::new(50.0, 0.0, 100.0, 100.0)))
            .unwrap();
        s.add_child(root, left).unwrap();
        s.add_child(root, right).unwrap();
        s.attach(root, &mut instances).unwrap();
        s.process_dirty_elements();

        let log: Log = Rc::default();
        for element in [root, left, right] {
            for kind in [
                EventKind::MouseEnter,
                EventKind::MouseLeave,
                EventKind::MouseMove,
                EventKind::MouseDown,
                EventKind::MouseUp,
            ] {
                let log = log.clone();
                s.add_handler(element, kind, move |_, event| {
                    log.borrow_mut().push((event.kind, event.element));
                });
            }
        }
        Fixture { s, root, left, right, log }
    }

    fn fixture() -> Fixture {
        fixture_with(EventCompat::Routed)
    }

    fn pointer(kind: PointerEventKind, x: f64, y: f64) -> PointerEvent {
        PointerEvent { kind, pos: Point::new(x, y) }
    }

    fn taken(log: &Log) -> Vec<(EventKind, ObjectId)> {
        core::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn prefix_diff_walks_from_the_tails() {
        let mut heap = bower_object::ObjectHeap::new();
        let ids: Vec<ObjectId> = (0..4)
            .map(|_| heap.alloc(bower_object::TypeKind::Visual))
            .collect();

        let old = [ids[0], ids[2], ids[3]];
        let new = [ids[1], ids[2], ids[3]];
        assert_eq!(uncommon_prefixes(&old, &new), (1, 1));
        assert_eq!(uncommon_prefixes(&old, &old), (0, 0));
        assert_eq!(uncommon_prefixes(&[], &new), (0, 3));
        assert_eq!(uncommon_prefixes(&old, &[]), (3, 0));
    }

    #[test]
    fn first_move_enters_without_a_primary_event() {
        let mut f = fixture();
        assert!(!f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0)));
        assert_eq!(
            taken(&f.log),
            [
                (EventKind::MouseEnter, f.left),
                (EventKind::MouseEnter, f.root),
            ]
        );
        assert_eq!(f.s.input_list(), [f.left, f.root]);
    }

    #[test]
    fn move_within_the_same_chain_emits_the_primary() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        taken(&f.log);

        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 20.0, 20.0));
        assert_eq!(
            taken(&f.log),
            [(EventKind::MouseMove, f.left), (EventKind::MouseMove, f.root)]
        );
    }

    #[test]
    fn crossing_siblings_leaves_then_enters_with_no_primary() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        taken(&f.log);

        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 60.0, 10.0));
        // Root is the common suffix: untouched.
        assert_eq!(
            taken(&f.log),
            [
                (EventKind::MouseLeave, f.left),
                (EventKind::MouseEnter, f.right),
            ]
        );
        assert_eq!(f.s.input_list(), [f.right, f.root]);
    }

    #[test]
    fn button_down_forces_the_primary_onto_a_new_chain() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(
            taken(&f.log),
            [
                (EventKind::MouseEnter, f.left),
                (EventKind::MouseEnter, f.root),
                (EventKind::MouseDown, f.left),
                (EventKind::MouseDown, f.root),
            ]
        );
    }

    #[test]
    fn button_down_offers_focus_to_the_deepest_element() {
        let mut f = fixture();
        let tab_stop = f.s.props().tab_stop;
        f.s.set_value(f.left, tab_stop, Value::Bool(true)).unwrap();

        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(f.s.focused(), Some(f.left));

        // The element under the pointer is not focusable: focus stays put.
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 60.0, 10.0));
        assert_eq!(f.s.focused(), Some(f.left));
    }

    #[test]
    fn a_press_on_a_non_focusable_leaf_leaves_focus_alone() {
        let mut instances = SurfaceRegistry::new();
        let mut s = Surface::new(SurfaceOptions {
            size: Size::new(100.0, 100.0),
            ..SurfaceOptions::default()
        });
        let root = s.new_container();
        let panel = s.new_container();
        let leaf = s.new_visual();
        let bounds = s.props().bounds;
        for element in [root, panel, leaf] {
            s.set_value(element, bounds, Value::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)))
                .unwrap();
        }
        s.add_child(root, panel).unwrap();
        s.add_child(panel, leaf).unwrap();
        s.attach(root, &mut instances).unwrap();
        s.process_dirty_elements();
        let tab_stop = s.props().tab_stop;
        s.set_value(panel, tab_stop, Value::Bool(true)).unwrap();

        // The focusable container is only an ancestor; the press does not
        // climb to it.
        s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(s.focused(), None);

        s.set_value(leaf, tab_stop, Value::Bool(true)).unwrap();
        s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(s.focused(), Some(leaf));
    }

    #[test]
    fn presses_while_captured_do_not_move_focus() {
        let mut f = fixture();
        let tab_stop = f.s.props().tab_stop;
        f.s.set_value(f.right, tab_stop, Value::Bool(true)).unwrap();
        assert!(f.s.set_mouse_capture(Some(f.right)));

        // The captured chain ends at a focusable element, but a press
        // during capture never routes focus.
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(f.s.focused(), None);

        f.s.set_mouse_capture(None);
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 60.0, 10.0));
        assert_eq!(f.s.focused(), Some(f.right));
    }

    #[test]
    fn routed_compat_stops_the_bubble_once_handled() {
        let mut f = fixture();
        f.s.add_handler(f.left, EventKind::MouseDown, |_, event| {
            event.handled = true;
        });
        assert!(f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0)));
        let downs: Vec<_> = taken(&f.log)
            .into_iter()
            .filter(|(kind, _)| *kind == EventKind::MouseDown)
            .collect();
        // The recording handler on `left` ran; the root never saw it.
        assert_eq!(downs, [(EventKind::MouseDown, f.left)]);
    }

    #[test]
    fn legacy_compat_bubbles_to_the_root_regardless() {
        let mut f = fixture_with(EventCompat::Legacy);
        f.s.add_handler(f.left, EventKind::MouseDown, |_, event| {
            event.handled = true;
        });
        assert!(f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0)));
        let downs: Vec<_> = taken(&f.log)
            .into_iter()
            .filter(|(kind, _)| *kind == EventKind::MouseDown)
            .collect();
        assert_eq!(
            downs,
            [(EventKind::MouseDown, f.left), (EventKind::MouseDown, f.root)]
        );
    }

    #[test]
    fn capture_routes_along_the_captured_chain() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        assert!(f.s.set_mouse_capture(Some(f.left)));
        taken(&f.log);

        // Pointer physically over `right`, but the captured chain gets the
        // event and no enter/leave churn happens.
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 60.0, 10.0));
        assert_eq!(
            taken(&f.log),
            [(EventKind::MouseMove, f.left), (EventKind::MouseMove, f.root)]
        );
        assert_eq!(f.s.captured(), Some(f.left));
    }

    #[test]
    fn a_second_capture_is_refused() {
        let mut f = fixture();
        assert!(f.s.set_mouse_capture(Some(f.left)));
        assert!(!f.s.set_mouse_capture(Some(f.right)));
        // Re-capturing the same element is fine.
        assert!(f.s.set_mouse_capture(Some(f.left)));
        assert_eq!(f.s.captured(), Some(f.left));
    }

    #[test]
    fn capture_requested_during_dispatch_applies_after_the_bubble() {
        let mut f = fixture();
        let left = f.left;
        let observed: Rc<RefCell<Option<Option<ObjectId>>>> = Rc::default();
        let seen = observed.clone();
        f.s.add_handler(f.left, EventKind::MouseDown, move |s, _| {
            assert!(s.set_mouse_capture(Some(left)));
            *seen.borrow_mut() = Some(s.captured());
        });

        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        // Inside the handler the grant was still pending.
        assert_eq!(*observed.borrow(), Some(None));
        assert_eq!(f.s.captured(), Some(f.left));
    }

    #[test]
    fn release_reenters_at_the_last_pointer_position() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        f.s.set_mouse_capture(Some(f.left));
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 60.0, 10.0));
        taken(&f.log);

        assert!(f.s.set_mouse_capture(None));
        // The pointer sits over `right`; it gets its missed enter. Root was
        // part of the captured chain, so it stays entered silently.
        assert_eq!(taken(&f.log), [(EventKind::MouseEnter, f.right)]);
        assert_eq!(f.s.input_list(), [f.right, f.root]);
        assert_eq!(f.s.captured(), None);
    }

    #[test]
    fn elements_hidden_by_handlers_drop_out_of_the_chain() {
        let mut f = fixture();
        let left = f.left;
        f.s.add_handler(f.left, EventKind::MouseDown, move |s, _| {
            let visible = s.props().visible;
            s.set_value(left, visible, Value::Bool(false)).unwrap();
        });
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(f.s.input_list(), [f.root]);
    }

    #[test]
    fn elements_made_hit_test_invisible_by_handlers_drop_out_of_the_chain() {
        let mut f = fixture();
        let left = f.left;
        f.s.add_handler(f.left, EventKind::MouseDown, move |s, _| {
            let hit_test_visible = s.props().hit_test_visible;
            s.set_value(left, hit_test_visible, Value::Bool(false)).unwrap();
        });
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(f.s.input_list(), [f.root]);
    }

    #[test]
    fn handled_enter_and_leave_events_report_through_the_return_value() {
        let mut f = fixture();
        f.s.add_handler(f.left, EventKind::MouseEnter, |_, event| {
            event.handled = true;
        });
        f.s.add_handler(f.left, EventKind::MouseLeave, |_, event| {
            event.handled = true;
        });

        // No primary fires on the first move; the handled enter alone
        // makes the call report `true`.
        assert!(f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0)));
        // Crossing away emits the handled leave.
        assert!(f.s.handle_pointer_event(pointer(PointerEventKind::Move, 60.0, 10.0)));
        // A move with nothing handled still reports `false`.
        assert!(!f.s.handle_pointer_event(pointer(PointerEventKind::Move, 65.0, 10.0)));
    }

    #[test]
    fn window_leave_empties_the_chain() {
        let mut f = fixture();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        taken(&f.log);

        f.s.handle_pointer_event(pointer(PointerEventKind::Leave, 0.0, 0.0));
        assert_eq!(
            taken(&f.log),
            [(EventKind::MouseLeave, f.left), (EventKind::MouseLeave, f.root)]
        );
        assert!(f.s.input_list().is_empty());
    }

    #[test]
    fn reentrant_pointer_events_are_dropped() {
        let mut f = fixture();
        let count: Rc<RefCell<u32>> = Rc::default();
        let seen = count.clone();
        f.s.add_handler(f.left, EventKind::MouseDown, move |s, _| {
            *seen.borrow_mut() += 1;
            // A handler feeding input back in must not recurse.
            assert!(!s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0)));
        });
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn zombifying_mid_dispatch_stops_the_bubble() {
        let mut f = fixture();
        f.s.add_handler(f.left, EventKind::MouseDown, |s, _| {
            s.zombify();
        });
        f.s.handle_pointer_event(pointer(PointerEventKind::Down, 10.0, 10.0));
        let downs: Vec<_> = taken(&f.log)
            .into_iter()
            .filter(|(kind, _)| *kind == EventKind::MouseDown)
            .collect();
        assert_eq!(downs, [(EventKind::MouseDown, f.left)]);
    }

    #[test]
    fn hit_testing_skips_invisible_and_transparent_elements() {
        let mut f = fixture();
        let visible = f.s.props().visible;
        f.s.set_value(f.left, visible, Value::Bool(false)).unwrap();
        assert_eq!(f.s.hit_test(Point::new(10.0, 10.0)), [f.root]);

        let hit_test_visible = f.s.props().hit_test_visible;
        f.s.set_value(f.right, hit_test_visible, Value::Bool(false)).unwrap();
        assert_eq!(f.s.hit_test(Point::new(60.0, 10.0)), [f.root]);

        let opacity = f.s.props().opacity;
        f.s.set_value(f.root, opacity, Value::Double(0.0)).unwrap();
        assert!(f.s.hit_test(Point::new(60.0, 10.0)).is_empty());
    }

    #[test]
    fn children_are_clipped_to_their_parent() {
        let mut f = fixture();
        let bounds = f.s.props().bounds;
        // `left` hangs outside the root; the overhang does not hit.
        f.s.set_value(f.left, bounds, Value::Rect(Rect::new(-50.0, 0.0, 50.0, 100.0)))
            .unwrap();
        f.s.process_dirty_elements();
        assert!(f.s.hit_test(Point::new(-10.0, 10.0)).is_empty());
        assert_eq!(f.s.hit_test(Point::new(10.0, 10.0)), [f.left, f.root]);
    }

    #[test]
    fn key_events_bubble_along_the_focus_chain() {
        let mut f = fixture();
        let tab_stop = f.s.props().tab_stop;
        f.s.set_value(f.left, tab_stop, Value::Bool(true)).unwrap();
        assert!(f.s.focus_element(Some(f.left)));

        let keys: Log = Rc::default();
        for element in [f.left, f.root] {
            let keys = keys.clone();
            f.s.add_handler(element, EventKind::KeyDown, move |_, event| {
                assert_eq!(event.key.map(|k| k.key), Some(13));
                keys.borrow_mut().push((event.kind, event.element));
            });
        }
        let key = KeyEvent { key: 13, modifiers: Modifiers::empty() };
        f.s.handle_key_event(key, true);
        assert_eq!(
            taken(&keys),
            [(EventKind::KeyDown, f.left), (EventKind::KeyDown, f.root)]
        );

        // No focus, no routing.
        f.s.focus_element(None);
        f.s.handle_key_event(key, true);
        assert!(taken(&keys).is_empty());
    }

    #[test]
    fn cursor_comes_from_the_deepest_opinionated_element() {
        let mut f = fixture();
        assert_eq!(f.s.cursor_from_input_list(), Cursor::Default);

        let cursor = f.s.props().cursor;
        f.s.set_value(f.root, cursor, Value::Int(Cursor::Wait.to_raw())).unwrap();
        f.s.handle_pointer_event(pointer(PointerEventKind::Move, 10.0, 10.0));
        assert_eq!(f.s.cursor_from_input_list(), Cursor::Wait);

        f.s.set_value(f.left, cursor, Value::Int(Cursor::Hand.to_raw())).unwrap();
        assert_eq!(f.s.cursor_from_input_list(), Cursor::Hand);
    }
}

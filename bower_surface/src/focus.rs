// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyboard focus with deferred notification.

use alloc::vec::Vec;

use bower_object::{ObjectId, Value};

use crate::events::EventKind;
use crate::surface::{Surface, SurfaceState};

impl Surface {
    /// Moves keyboard focus.
    ///
    /// `Some(element)` fails (returning `false`, with no state change)
    /// unless the element is render-visible, is a tab stop, has completed
    /// its load pass, and is attached to this surface. `None` clears focus
    /// and always succeeds.
    ///
    /// Focus events are deferred: the first change schedules one tick
    /// callback, and further changes before it runs collapse into it. The
    /// callback emits `LostFocus` up the old chain, then `GotFocus` up the
    /// new one; a change that ends up back where it started emits nothing.
    pub fn focus_element(&mut self, target: Option<ObjectId>) -> bool {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            return false;
        }
        if let Some(element) = target {
            if !self.is_focusable(element) {
                return false;
            }
            if self.focused == Some(element) {
                return true;
            }
        } else if self.focused.is_none() {
            return true;
        }
        if !self.focus_change_pending {
            self.focus_change_pending = true;
            self.previous_focus = self.focused;
            self.schedule_tick(Self::generate_focus_change_events);
        }
        self.focused = target;
        true
    }

    fn is_focusable(&self, element: ObjectId) -> bool {
        self.heap.is_attached_to(element, self.tag)
            && self.heap.is_loaded(element)
            && self.is_render_visible(element)
            && self
                .heap
                .value(element, self.props.tab_stop)
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    /// Emits the deferred focus transition.
    ///
    /// Runs from the tick queue; exposed so tests and embedders can flush
    /// focus notifications without a frame tick.
    pub fn generate_focus_change_events(&mut self) {
        if self.state == SurfaceState::Zombie {
            return;
        }
        self.focus_change_pending = false;
        let old = self.previous_focus.take();
        let new = self.focused;
        if old == new {
            return;
        }
        self.emitting = true;
        if let Some(old) = old {
            let path: Vec<ObjectId> = self.heap.path_to_root(old).to_vec();
            self.emit_on_list(EventKind::LostFocus, &path, None, None);
        }
        if let Some(new) = new
            && self.state != SurfaceState::Zombie
        {
            let path: Vec<ObjectId> = self.heap.path_to_root(new).to_vec();
            self.emit_on_list(EventKind::GotFocus, &path, None, None);
        }
        self.emitting = false;
        self.apply_pending_capture_after_focus();
    }

    fn apply_pending_capture_after_focus(&mut self) {
        // Handlers during focus emission may have requested capture.
        if self.pending_release || self.pending_capture.is_some() {
            let release = core::mem::take(&mut self.pending_release);
            let capture = self.pending_capture.take();
            if release {
                self.set_mouse_capture(None);
            } else if let Some(element) = capture {
                self.set_mouse_capture(Some(element));
            }
        }
    }
}

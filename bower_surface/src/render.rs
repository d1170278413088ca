// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting the damaged area.

use alloc::vec::Vec;

use bower_object::{ObjectId, WalkDirection};
use kurbo::Rect;

use crate::region::{rect_contains, rects_intersect};
use crate::surface::{Surface, SurfaceState};

/// The drawing backend seam.
///
/// The coordinator decides *what* to paint and in which order; the painter
/// turns one node into pixels, clipped to the damaged area.
pub trait Painter {
    /// Paints `node` restricted to `clip` (world space).
    fn paint_node(&mut self, node: ObjectId, clip: Rect);
}

/// How [`Surface::paint`] orders its work.
///
/// Both strategies produce the same visible output; front-to-back trades an
/// extra pass for skipping content hidden behind opaque elements.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaintStrategy {
    /// Record front to back, culling ops fully occluded by an opaque op
    /// already recorded, then execute the survivors back to front.
    FrontToBack,
    /// Recurse top-down, parent before children in z order.
    Direct,
}

struct PaintOp {
    node: ObjectId,
    clip: Rect,
    opaque: bool,
}

impl Surface {
    /// Paints the damaged area and clears it.
    ///
    /// Drains the tick queue and the dirty lists first, so deferred focus
    /// work and bounds recomputation land before drawing. A zombie or an
    /// empty damage region paints nothing.
    pub fn paint(&mut self, painter: &mut dyn Painter, strategy: PaintStrategy) {
        self.assert_owner();
        if self.state == SurfaceState::Zombie {
            log::debug!("paint on zombie surface");
            return;
        }
        self.run_ticks();
        if self.state == SurfaceState::Zombie {
            return;
        }
        self.process_dirty_elements();
        if self.invalid.is_empty() {
            return;
        }
        let Some(top) = self.toplevel else {
            self.invalid.clear();
            return;
        };

        let mut ops = Vec::new();
        self.record_back_to_front(top, &mut ops);
        match strategy {
            PaintStrategy::Direct => {
                for op in &ops {
                    painter.paint_node(op.node, op.clip);
                }
            }
            PaintStrategy::FrontToBack => {
                let mut kept: Vec<&PaintOp> = Vec::with_capacity(ops.len());
                for op in ops.iter().rev() {
                    let occluded = kept
                        .iter()
                        .any(|front| front.opaque && rect_contains(front.clip, op.clip));
                    if !occluded {
                        kept.push(op);
                    }
                }
                for op in kept.iter().rev() {
                    painter.paint_node(op.node, op.clip);
                }
            }
        }
        self.invalid.clear();
    }

    /// Records paint ops in back-to-front order: each node before its
    /// children, children lowest z first.
    fn record_back_to_front(&mut self, node: ObjectId, ops: &mut Vec<PaintOp>) {
        if !self.heap.is_alive(node) || !self.is_visible(node) {
            return;
        }
        let opacity = self.opacity(node);
        if opacity <= 0.0 {
            return;
        }
        if !self.invalid.intersects(self.subtree_bounds(node)) {
            return;
        }
        let bounds = self.node_rect(node);
        let damage = self.invalid.bounds();
        if rects_intersect(bounds, damage) {
            ops.push(PaintOp {
                node,
                clip: bounds.intersect(damage),
                opaque: opacity >= 1.0,
            });
        }
        for child in self.children_in_order(node, WalkDirection::ZForward) {
            self.record_back_to_front(child, ops);
        }
    }
}

// Copyright 2025 the Bower Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coarse damage accumulation.

use alloc::vec::Vec;

use kurbo::Rect;

pub(crate) fn rects_intersect(a: Rect, b: Rect) -> bool {
    let i = a.intersect(b);
    i.width() > 0.0 && i.height() > 0.0
}

pub(crate) fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// The world-space area that must be repainted.
///
/// A coarse list of rects, not a minimal cover: adding a rect already
/// contained by a recorded one is dropped, and a rect containing recorded
/// ones replaces them, but overlapping rects are kept side by side.
/// Intersection queries answer "does this node need painting".
#[derive(Clone, Debug, Default)]
pub struct InvalidRegion {
    rects: Vec<Rect>,
}

impl InvalidRegion {
    /// Creates an empty region.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a damaged rect. Zero-area rects are ignored.
    pub fn add(&mut self, rect: Rect) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        if self.rects.iter().any(|r| rect_contains(*r, rect)) {
            return;
        }
        self.rects.retain(|r| !rect_contains(rect, *r));
        self.rects.push(rect);
    }

    /// Returns `true` if nothing is damaged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Returns `true` if `rect` overlaps any damaged area.
    #[must_use]
    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| rects_intersect(*r, rect))
    }

    /// Returns the union of all damaged rects, or a zero rect when empty.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(*first, |acc, r| acc.union(*r))
    }

    /// Returns the recorded rects.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Forgets all damage.
    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

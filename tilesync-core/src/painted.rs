//! Per-viewer record of rendered area.
//!
//! A viewer cannot hold stale pixels where it never rendered anything, so
//! invalidations outside the painted area are dropped and partial ones are
//! cropped to the overlap.
//!
//! Painted area is kept per part as a short list of rectangles. Adjacent
//! tiles sharing a full edge are fused, so painting a regular tile grid
//! row by row stays a handful of entries. The area only grows.

use rustc_hash::FxHashMap;

use crate::geometry::{InvalidationRegion, Part, TileRect};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintedRegionTracker {
    parts: FxHashMap<i32, Vec<TileRect>>,
}

impl PaintedRegionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `rect` as rendered on `part`. Degenerate rectangles are ignored.
    pub fn record_paint(&mut self, part: i32, rect: TileRect) {
        let rect = rect.clamp_origin();
        if rect.is_degenerate() || !rect.fits() {
            return;
        }
        let rects = self.parts.entry(part).or_default();
        if rects.iter().any(|painted| painted.contains(&rect)) {
            return;
        }
        rects.retain(|painted| !rect.contains(painted));

        let mut merged = rect;
        while let Some(pos) = rects.iter().position(|painted| fuses(painted, &merged)) {
            merged = merged.union(&rects.swap_remove(pos));
        }
        rects.push(merged);
    }

    /// Crop a candidate invalidation to the painted area.
    ///
    /// `EMPTY` and all-parts regions pass through unchanged. A specific-part
    /// region becomes the bounding box of its overlaps with painted
    /// rectangles, or `None` when it overlaps nothing.
    pub fn filter(&self, region: InvalidationRegion) -> Option<InvalidationRegion> {
        let area = match region {
            InvalidationRegion::Area(area) => area,
            InvalidationRegion::Empty => return Some(region),
        };
        let part = match area.part {
            Part::All => return Some(region),
            Part::Index(part) => part,
        };

        let cropped = self
            .parts
            .get(&part)?
            .iter()
            .filter_map(|painted| painted.intersection(&area.rect))
            .reduce(|acc, rect| acc.union(&rect))?;

        Some(InvalidationRegion::Area(area.with_rect(cropped)))
    }

    /// Fold another tracker's painted area into this one.
    pub fn merge_from(&mut self, other: &PaintedRegionTracker) {
        for (part, rects) in &other.parts {
            for rect in rects {
                self.record_paint(*part, *rect);
            }
        }
    }

    pub fn painted(&self, part: i32) -> &[TileRect] {
        self.parts.get(&part).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any painted rectangle on `part` overlaps `rect`.
    pub fn is_painted(&self, part: i32, rect: &TileRect) -> bool {
        self.painted(part).iter().any(|painted| painted.overlaps(rect))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }
}

/// Two rectangles whose union is exactly their combined area.
fn fuses(a: &TileRect, b: &TileRect) -> bool {
    let side_by_side = a.y == b.y
        && a.height == b.height
        && (a.right() == b.x || b.right() == a.x);
    let stacked = a.x == b.x
        && a.width == b.width
        && (a.bottom() == b.y || b.bottom() == a.y);
    side_by_side || stacked
}

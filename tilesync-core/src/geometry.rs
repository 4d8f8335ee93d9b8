//! Tile invalidation geometry.
//!
//! Rectangles are axis-aligned and integer-valued, stored as origin + size
//! (the convention of the text payloads viewers receive). Edge arithmetic
//! saturates; a rectangle whose far edge does not fit in an `i64` is
//! treated as degenerate and never reaches the merge code. Unions are the
//! bounding box of both operands, never a polygon union: merging two stale
//! areas may over-report, it must never under-report.
//!
//! Text form, as produced by document code and consumed by viewers:
//!
//! ```text
//! x, y, width, height[, part[, mode]]     part -1 = every part
//! EMPTY[, part[, mode]]                   whole visible area, extent unknown
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ParseError;

// ───────────────────────────────────────────────────────────────────
// TileRect
// ───────────────────────────────────────────────────────────────────

/// Integer rectangle in device-independent pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl TileRect {
    #[inline]
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Build from edges. `right`/`bottom` are exclusive.
    #[inline]
    pub const fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    #[inline(always)]
    pub const fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    #[inline(always)]
    pub const fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// Zero or negative extent on either axis.
    #[inline(always)]
    pub const fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Both far edges are representable.
    #[inline]
    pub const fn fits(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    /// Move a negative origin to zero, shrinking the extent by the same
    /// amount. The result may be degenerate.
    pub fn clamp_origin(self) -> Self {
        let mut rect = self;
        if rect.x < 0 {
            rect.width = rect.width.saturating_add(rect.x);
            rect.x = 0;
        }
        if rect.y < 0 {
            rect.height = rect.height.saturating_add(rect.y);
            rect.y = 0;
        }
        rect
    }

    /// `other` lies entirely inside `self`.
    #[inline]
    pub fn contains(&self, other: &TileRect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Overlap with positive area.
    #[inline]
    pub fn overlaps(&self, other: &TileRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Overlap, or a shared edge or corner.
    #[inline]
    pub fn intersects_or_touches(&self, other: &TileRect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Bounding box of both rectangles.
    pub fn union(&self, other: &TileRect) -> TileRect {
        TileRect::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Overlapping area, `None` when it has no positive extent.
    pub fn intersection(&self, other: &TileRect) -> Option<TileRect> {
        let rect = TileRect::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        );
        (!rect.is_degenerate()).then_some(rect)
    }
}

// ───────────────────────────────────────────────────────────────────
// Part
// ───────────────────────────────────────────────────────────────────

/// Page, sheet or slide a region belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    /// Applies to every part at once.
    All,
    Index(i32),
}

impl Part {
    /// Wire value of [`Part::All`].
    pub const ALL_PARTS: i32 = -1;

    pub fn from_wire(value: i32) -> Self {
        if value == Self::ALL_PARTS {
            Part::All
        } else {
            Part::Index(value)
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Part::All => Self::ALL_PARTS,
            Part::Index(index) => index,
        }
    }
}

impl Default for Part {
    fn default() -> Self {
        Part::Index(0)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

// ───────────────────────────────────────────────────────────────────
// Region / InvalidationRegion
// ───────────────────────────────────────────────────────────────────

/// A stale rectangle on one part (or all parts).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub rect: TileRect,
    pub part: Part,
    /// Rendering-mode hint, carried through untouched.
    pub mode: i32,
}

impl Region {
    /// Build a region, clamping a negative origin.
    pub fn new(rect: TileRect, part: Part, mode: i32) -> Self {
        Self {
            rect: rect.clamp_origin(),
            part,
            mode,
        }
    }

    pub fn with_rect(&self, rect: TileRect) -> Self {
        Self { rect, ..*self }
    }
}

/// One tile invalidation as queued for a viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationRegion {
    /// Whole visible area is stale; absorbs every other invalidation.
    Empty,
    Area(Region),
}

impl InvalidationRegion {
    /// Text token for [`InvalidationRegion::Empty`].
    pub const EMPTY_TOKEN: &'static str = "EMPTY";

    pub fn area(rect: TileRect, part: Part, mode: i32) -> Self {
        InvalidationRegion::Area(Region::new(rect, part, mode))
    }

    /// Structured constructor: no rectangle means `EMPTY`.
    pub fn from_parts(rect: Option<TileRect>, part: Part, mode: i32) -> Self {
        match rect {
            Some(rect) => Self::area(rect, part, mode),
            None => InvalidationRegion::Empty,
        }
    }

    /// A region that carries no usable information: no extent, or edges
    /// beyond `i64`. `EMPTY` is never degenerate.
    pub fn is_degenerate(&self) -> bool {
        match self {
            InvalidationRegion::Empty => false,
            InvalidationRegion::Area(region) => {
                region.rect.is_degenerate() || !region.rect.fits()
            }
        }
    }

    pub fn is_empty_sentinel(&self) -> bool {
        matches!(self, InvalidationRegion::Empty)
    }

    pub fn part(&self) -> Option<Part> {
        match self {
            InvalidationRegion::Empty => None,
            InvalidationRegion::Area(region) => Some(region.part),
        }
    }

    /// Parse the comma-separated payload text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut fields = text.split(',').map(str::trim);
        let first = fields.next().unwrap_or_default();
        if first == Self::EMPTY_TOKEN {
            return Ok(InvalidationRegion::Empty);
        }

        let x = parse_field(Some(first), "x")?;
        let y = parse_field(fields.next(), "y")?;
        let width = parse_field(fields.next(), "width")?;
        let height = parse_field(fields.next(), "height")?;
        let part = parse_optional(fields.next(), "part")?.unwrap_or(0);
        let mode = parse_optional(fields.next(), "mode")?.unwrap_or(0);

        let part = i32::try_from(part).map_err(|_| ParseError::InvalidNumber {
            field: "part",
            value: part.to_string(),
        })?;
        let mode = i32::try_from(mode).map_err(|_| ParseError::InvalidNumber {
            field: "mode",
            value: mode.to_string(),
        })?;

        if x.checked_add(width).is_none() {
            return Err(ParseError::InvalidNumber {
                field: "width",
                value: width.to_string(),
            });
        }
        if y.checked_add(height).is_none() {
            return Err(ParseError::InvalidNumber {
                field: "height",
                value: height.to_string(),
            });
        }

        Ok(Self::area(
            TileRect::new(x, y, width, height),
            Part::from_wire(part),
            mode,
        ))
    }
}

impl fmt::Display for InvalidationRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationRegion::Empty => f.write_str(Self::EMPTY_TOKEN),
            InvalidationRegion::Area(Region { rect, part, mode }) => write!(
                f,
                "{}, {}, {}, {}, {}, {}",
                rect.x, rect.y, rect.width, rect.height, part, mode
            ),
        }
    }
}

fn parse_field(field: Option<&str>, name: &'static str) -> Result<i64, ParseError> {
    match field {
        Some(value) if !value.is_empty() => value.parse().map_err(|_| ParseError::InvalidNumber {
            field: name,
            value: value.to_string(),
        }),
        _ => Err(ParseError::MissingField(name)),
    }
}

fn parse_optional(field: Option<&str>, name: &'static str) -> Result<Option<i64>, ParseError> {
    match field {
        None => Ok(None),
        Some(value) => parse_field(Some(value), name).map(Some),
    }
}

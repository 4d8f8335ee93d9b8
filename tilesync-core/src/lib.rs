//! # tilesync-core: value types for viewer notification coalescing
//!
//! The document side of an editor emits a high-frequency stream of small
//! notifications (selection moved, cursor moved, a tile area went stale,
//! a command's state changed). Remote viewers only need the smallest
//! correct summary of that stream. This crate holds the leaf types the
//! coalescing layer (`tilesync-notify`) is built from:
//!
//! ```text
//!  "0, 0, 256, 256, 1, 0"        ".uno:Bold=true"
//!          │                            │
//!          ▼                            ▼
//!  InvalidationRegion            CommandState
//!  (rect · part · mode | EMPTY)  (CommandKey? + payload)
//!          │                            │
//!          └────────────┬───────────────┘
//!                       ▼
//!                 Notification ──► PaintedRegionTracker::filter
//! ```
//!
//! ## Modules
//!
//! - [`geometry`]: integer tile rectangles, parts and the `EMPTY` sentinel
//! - [`notification`]: notification kinds and the closed `Message` enum
//! - [`painted`]: per-viewer record of rendered area, used for cropping

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod geometry;
pub mod notification;
pub mod painted;

pub use geometry::{InvalidationRegion, Part, Region, TileRect};
pub use notification::{CommandKey, CommandState, Message, Notification, NotificationKind, SignalKind};
pub use painted::PaintedRegionTracker;

/// Stable identity of a connected viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(Uuid);

impl ViewerId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id (replay scripts, tests).
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ViewerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to interpret caller-formatted notification text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing geometry field: {0}")]
    MissingField(&'static str),
    #[error("Invalid number for '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Unknown notification kind: {0}")]
    UnknownKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_id_deterministic() {
        let a = ViewerId::from_u128(7);
        let b = ViewerId::from_u128(7);
        assert_eq!(a, b);
        assert_ne!(a, ViewerId::from_u128(8));
    }

    #[test]
    fn test_viewer_id_random_unique() {
        assert_ne!(ViewerId::new(), ViewerId::new());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::InvalidNumber { field: "width", value: "abc".into() };
        assert_eq!(err.to_string(), "Invalid number for 'width': \"abc\"");
    }
}

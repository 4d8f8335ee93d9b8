//! Notifications produced by the document side.
//!
//! Each notification is one of three categories, and each category
//! carries only the payload shape it needs:
//!
//! | Category | Variant | Payload |
//! |----------|---------|---------|
//! | Single-value signal | [`Message::Signal`] | opaque text, last value wins |
//! | Command state | [`Message::StateChanged`] | `name=value` or unstructured text |
//! | Tile invalidation | [`Message::InvalidateTiles`] | parsed [`InvalidationRegion`] |
//!
//! Notifications are immutable once built. Coalescing replaces a queued
//! notification with a new one, it never edits one in place.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::geometry::InvalidationRegion;
use crate::{ParseError, ViewerId};

// ───────────────────────────────────────────────────────────────────
// Kinds
// ───────────────────────────────────────────────────────────────────

/// Notification kinds whose latest value supersedes earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Text selection rectangles.
    TextSelection,
    /// Selection start handle geometry.
    TextSelectionStart,
    /// Selection end handle geometry.
    TextSelectionEnd,
    /// Cursor visibility flag.
    CursorVisible,
    /// Text cursor geometry.
    InvalidateVisibleCursor,
    /// Spreadsheet cell cursor geometry.
    CellCursor,
    /// Formula text of the current cell.
    CellFormula,
    /// Active part index.
    SetPart,
    /// Pointer shape name.
    MousePointer,
}

/// Every notification kind, with a stable wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NotificationKind {
    InvalidateTiles,
    StateChanged,
    Signal(SignalKind),
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 11] = [
        NotificationKind::InvalidateTiles,
        NotificationKind::StateChanged,
        NotificationKind::Signal(SignalKind::TextSelection),
        NotificationKind::Signal(SignalKind::TextSelectionStart),
        NotificationKind::Signal(SignalKind::TextSelectionEnd),
        NotificationKind::Signal(SignalKind::CursorVisible),
        NotificationKind::Signal(SignalKind::InvalidateVisibleCursor),
        NotificationKind::Signal(SignalKind::CellCursor),
        NotificationKind::Signal(SignalKind::CellFormula),
        NotificationKind::Signal(SignalKind::SetPart),
        NotificationKind::Signal(SignalKind::MousePointer),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::InvalidateTiles => "INVALIDATE_TILES",
            NotificationKind::StateChanged => "STATE_CHANGED",
            NotificationKind::Signal(signal) => match signal {
                SignalKind::TextSelection => "TEXT_SELECTION",
                SignalKind::TextSelectionStart => "TEXT_SELECTION_START",
                SignalKind::TextSelectionEnd => "TEXT_SELECTION_END",
                SignalKind::CursorVisible => "CURSOR_VISIBLE",
                SignalKind::InvalidateVisibleCursor => "INVALIDATE_VISIBLE_CURSOR",
                SignalKind::CellCursor => "CELL_CURSOR",
                SignalKind::CellFormula => "CELL_FORMULA",
                SignalKind::SetPart => "SET_PART",
                SignalKind::MousePointer => "MOUSE_POINTER",
            },
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownKind(s.to_string()))
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

// ───────────────────────────────────────────────────────────────────
// Command state
// ───────────────────────────────────────────────────────────────────

/// Command name of a structured `name=value` state payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandKey(String);

impl CommandKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command-state change.
///
/// `key` is `Some` only for `name=value` payloads with a non-empty name.
/// Unstructured payloads (including the empty "re-query everything" ping)
/// have no key and are never coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandState {
    key: Option<CommandKey>,
    payload: String,
}

impl CommandState {
    pub fn parse(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let key = payload
            .split_once('=')
            .map(|(name, _)| name)
            .filter(|name| !name.is_empty())
            .map(|name| CommandKey(name.to_string()));
        Self { key, payload }
    }

    pub fn key(&self) -> Option<&CommandKey> {
        self.key.as_ref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

// ───────────────────────────────────────────────────────────────────
// Notification
// ───────────────────────────────────────────────────────────────────

/// Notification body, one variant per coalescing category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Signal { kind: SignalKind, payload: String },
    StateChanged(CommandState),
    InvalidateTiles(InvalidationRegion),
}

/// An immutable (kind, payload, origin) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    message: Message,
    origin: Option<ViewerId>,
}

impl Notification {
    pub fn signal(kind: SignalKind, payload: impl Into<String>) -> Self {
        Self::from_message(Message::Signal {
            kind,
            payload: payload.into(),
        })
    }

    pub fn state_changed(payload: impl Into<String>) -> Self {
        Self::from_message(Message::StateChanged(CommandState::parse(payload)))
    }

    pub fn invalidate_tiles(region: InvalidationRegion) -> Self {
        Self::from_message(Message::InvalidateTiles(region))
    }

    pub fn from_message(message: Message) -> Self {
        Self { message, origin: None }
    }

    /// Build from a raw kind + caller-formatted payload.
    ///
    /// Only tile invalidations can fail, on malformed geometry text.
    pub fn parse(kind: NotificationKind, payload: &str) -> Result<Self, ParseError> {
        Ok(match kind {
            NotificationKind::InvalidateTiles => {
                Self::invalidate_tiles(InvalidationRegion::parse(payload)?)
            }
            NotificationKind::StateChanged => Self::state_changed(payload),
            NotificationKind::Signal(signal) => Self::signal(signal, payload),
        })
    }

    /// Tag with the view that caused it.
    pub fn with_origin(mut self, origin: ViewerId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<ViewerId> {
        self.origin
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn kind(&self) -> NotificationKind {
        match &self.message {
            Message::Signal { kind, .. } => NotificationKind::Signal(*kind),
            Message::StateChanged(_) => NotificationKind::StateChanged,
            Message::InvalidateTiles(_) => NotificationKind::InvalidateTiles,
        }
    }

    /// Payload text as delivered to viewers.
    pub fn payload(&self) -> Cow<'_, str> {
        match &self.message {
            Message::Signal { payload, .. } => Cow::Borrowed(payload),
            Message::StateChanged(state) => Cow::Borrowed(state.payload()),
            Message::InvalidateTiles(region) => Cow::Owned(region.to_string()),
        }
    }

    pub fn region(&self) -> Option<&InvalidationRegion> {
        match &self.message {
            Message::InvalidateTiles(region) => Some(region),
            _ => None,
        }
    }
}

//! Flushed batch handed to a delivery sink.
//!
//! A batch is the ordered `(kind, payload)` sequence one viewer receives
//! for one flush. Payload text is final: geometry is already in its
//! `"x, y, w, h, part, mode"` / `EMPTY` form.
//!
//! Binary form (bincode, standard config):
//! ```text
//! ┌───────────┬──────────┬──────────────────────────────┐
//! │ viewer    │ sequence │ entries: [(kind, payload)]   │
//! │ 16 bytes  │ varint   │ length-prefixed              │
//! └───────────┴──────────┴──────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilesync_core::{Notification, NotificationKind, ViewerId};

/// One delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushedEntry {
    pub kind: NotificationKind,
    pub payload: String,
}

impl From<&Notification> for FlushedEntry {
    fn from(notification: &Notification) -> Self {
        Self {
            kind: notification.kind(),
            payload: notification.payload().into_owned(),
        }
    }
}

/// Everything one viewer receives for one flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushedBatch {
    pub viewer: ViewerId,
    /// Per-channel flush counter; batch N precedes batch N+1.
    pub sequence: u64,
    pub entries: Vec<FlushedEntry>,
}

impl FlushedBatch {
    pub fn new(viewer: ViewerId, sequence: u64, notifications: &[Notification]) -> Self {
        Self {
            viewer,
            sequence,
            entries: notifications.iter().map(FlushedEntry::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Deserialize from binary wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (batch, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        Ok(batch)
    }
}

/// Batch encoding errors.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

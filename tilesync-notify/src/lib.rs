//! # tilesync-notify: per-viewer notification coalescing
//!
//! Sits between a document-editing core and the remote viewers rendering
//! its tiles. A high-frequency stream of fine-grained notifications goes
//! in; per viewer, the smallest correct ordered set comes out on each
//! idle tick.
//!
//! ## Architecture
//!
//! ```text
//!  document core            rasterizer
//!       │ notify_one/all         │ record_painted_tile
//!       ▼                        ▼
//! ┌──────────────────────────────────────────┐
//! │ ChannelRegistry (one per document session)│
//! └──────┬──────────────────────┬────────────┘
//!        ▼                      ▼
//! ┌──────────────┐       ┌──────────────┐
//! │ Channel (A)  │       │ Channel (B)  │   coalesce · crop to painted
//! │ + tracker    │       │ + tracker    │
//! └──────┬───────┘       └──────┬───────┘
//!        │ flush_all            │
//!        ▼                      ▼
//!   DeliverySink           DeliverySink      → FlushedBatch
//! ```
//!
//! ## Modules
//!
//! - [`channel`]: coalescing queue and merge rules
//! - [`registry`]: viewer lifecycle, fan-out, paint propagation
//! - [`sink`]: delivery sinks (in-memory, tokio mpsc)
//! - [`protocol`]: `FlushedBatch` and its bincode encoding
//! - [`config`]: channel and registry configuration
//!
//! Everything runs on the document thread. No operation blocks.

pub mod channel;
pub mod config;
pub mod protocol;
pub mod registry;
pub mod sink;

pub use channel::{ChannelStats, NotificationChannel};
pub use config::{ChannelConfig, RegistryConfig};
pub use protocol::{FlushedBatch, FlushedEntry, ProtocolError};
pub use registry::ChannelRegistry;
pub use sink::{CollectingSink, DeliverySink, MpscSink};

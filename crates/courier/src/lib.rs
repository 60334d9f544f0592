//! Courier - incremental channel-to-webhook synchronization
//!
//! This crate provides the synchronization engine that forwards channel
//! messages from an external source API to a webhook target:
//! - Domain models (RawItem, Author, Envelope, Cursor)
//! - Durable per-channel cursor tracking with staleness fallback
//! - Paginated, rate-limit-aware fetching
//! - Best-effort enrichment with cached author/channel lookups
//! - At-least-once webhook delivery with retry/backoff
//! - The per-cycle orchestrator tying fetch→enrich→deliver→commit together
//!
//! This crate has no CLI dependencies; entrypoints live in the
//! `courierd` application.

pub mod backoff;
pub mod config;
pub mod cursor;
pub mod deliver;
pub mod enrich;
pub mod fetch;
pub mod models;
pub mod source;
pub mod sync;

pub use config::{SETTINGS_FILE, Settings, SourceSettings, SyncTuning, WebhookSettings};
pub use cursor::{CursorStore, CursorStoreOptions};
pub use deliver::{Deliverer, DeliveryError, DeliveryOptions, WebhookClient};
pub use enrich::Enricher;
pub use fetch::{FetchOptions, fetch_new_items};
pub use models::{
    Attachment, Author, AuthorId, ChannelId, ChannelMeta, Cursor, ENVELOPE_SCHEMA_VERSION,
    EnrichedItem, Envelope, FileRef, RawItem,
};
pub use source::{HttpSourceClient, ItemPage, SourceApi, SourceError};
pub use sync::{ChannelSyncStats, CycleOptions, SyncError, SyncReport, SyncStage, run_cycle};

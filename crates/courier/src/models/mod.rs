//! Domain models shared across the sync pipeline

mod cursor;
mod envelope;
mod item;

pub use cursor::Cursor;
pub use envelope::{ENVELOPE_SCHEMA_VERSION, EnrichedItem, Envelope};
pub use item::{Attachment, Author, AuthorId, ChannelId, ChannelMeta, FileRef, RawItem};

//! Delivery envelope wrapping an enriched item

use super::{Author, ChannelMeta, RawItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current envelope schema version, bumped on breaking payload changes
pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// A raw item augmented with resolved author and channel context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub item: RawItem,
    pub author: Author,
    pub channel: ChannelMeta,
}

/// The unit handed to the delivery client: an enriched item wrapped with
/// delivery metadata. Serialized as the webhook POST body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub schema_version: u32,
    /// When this delivery attempt was assembled
    pub delivered_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EnrichedItem,
}

impl Envelope {
    pub fn new(payload: EnrichedItem) -> Self {
        Self {
            schema_version: ENVELOPE_SCHEMA_VERSION,
            delivered_at: Utc::now(),
            payload,
        }
    }

    /// Position of the wrapped item, used for cursor accounting
    pub fn position(&self) -> &super::Cursor {
        &self.payload.item.ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelId, Cursor};

    fn make_envelope() -> Envelope {
        let item = RawItem::builder("100.5", "C1").text("hello").build();
        let author = Author::new("U1", "alice");
        let channel = ChannelMeta::new("C1", "general");
        Envelope::new(EnrichedItem {
            item,
            author,
            channel,
        })
    }

    #[test]
    fn test_envelope_serializes_flat_payload() {
        let envelope = make_envelope();
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["item"]["ts"], "100.5");
        assert_eq!(json["item"]["text"], "hello");
        assert_eq!(json["author"]["name"], "alice");
        assert_eq!(json["channel"]["name"], "general");
        assert!(json["delivered_at"].is_string());
    }

    #[test]
    fn test_envelope_position() {
        let envelope = make_envelope();
        assert_eq!(envelope.position(), &Cursor::new("100.5"));
        assert_eq!(envelope.payload.channel.id, ChannelId::new("C1"));
    }
}

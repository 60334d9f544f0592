//! Source API integration
//!
//! This module provides:
//! - The [`SourceApi`] trait the fetch and enrichment stages consume
//! - An HTTP client implementation ([`HttpSourceClient`])
//! - Wire-format response types

mod client;

pub use client::HttpSourceClient;

use crate::models::{Author, AuthorId, ChannelId, ChannelMeta, Cursor, RawItem};

/// One page of channel items, newest-first as the source returns them
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<RawItem>,
    /// Opaque continuation token; absent on the last page
    pub next_page_token: Option<String>,
}

/// Upstream message-source capability.
///
/// The HTTP client implements this against the real API; tests substitute
/// scripted in-memory implementations.
pub trait SourceApi: Send + Sync {
    /// List items in a channel strictly newer than `since`, one page at a
    /// time. Pages are returned newest-first.
    fn list_items(
        &self,
        channel: &ChannelId,
        since: &Cursor,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<ItemPage, SourceError>;

    /// Look up an author. `Ok(None)` means the author is unknown or
    /// deleted, as opposed to the lookup itself failing.
    fn get_author(&self, id: &AuthorId) -> Result<Option<Author>, SourceError>;

    /// Look up channel metadata
    fn get_channel_info(&self, id: &ChannelId) -> Result<ChannelMeta, SourceError>;
}

/// Errors surfaced by the source API.
///
/// Rate limiting is signaled distinctly so the fetcher can back off and
/// retry, unlike the channel-fatal variants.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("rate limited by source API")]
    RateLimited {
        /// Server-suggested wait in seconds, when provided
        retry_after: Option<u64>,
    },

    #[error("channel not found")]
    ChannelNotFound,

    #[error("access to channel denied")]
    AccessDenied,

    #[error("source API error: {0}")]
    Api(String),

    #[error("source transport error: {0}")]
    Transport(String),

    #[error("malformed source response: {0}")]
    Malformed(String),
}

/// Wire-format types for source API responses
pub mod api {
    use serde::Deserialize;

    /// Response from listing channel items
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListItemsResponse {
        pub ok: bool,
        pub items: Option<Vec<Item>>,
        pub next_page_token: Option<String>,
        pub error: Option<String>,
    }

    /// A single item as it appears on the wire
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Item {
        pub ts: String,
        pub channel: Option<String>,
        pub author: Option<String>,
        pub text: Option<String>,
        pub kind: Option<String>,
        pub thread_ts: Option<String>,
        pub attachments: Option<Vec<Attachment>>,
        pub files: Option<Vec<FileRef>>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Attachment {
        pub title: Option<String>,
        pub text: Option<String>,
        pub url: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileRef {
        pub id: String,
        pub name: Option<String>,
        pub mime_type: Option<String>,
        pub url: Option<String>,
    }

    /// Response from an author lookup
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AuthorResponse {
        pub ok: bool,
        pub author: Option<AuthorInfo>,
        pub error: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AuthorInfo {
        pub id: String,
        pub name: Option<String>,
        pub real_name: Option<String>,
    }

    /// Response from a channel info lookup
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ChannelInfoResponse {
        pub ok: bool,
        pub channel: Option<ChannelInfo>,
        pub error: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ChannelInfo {
        pub id: String,
        pub name: Option<String>,
    }
}

//! Channel, item and author models

use super::Cursor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a source channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for an item author
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorId(pub String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An attachment rendered alongside an item's text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
}

/// Reference to a file uploaded with an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub url: Option<String>,
}

/// A single item as returned by the source API.
///
/// Source items vary in shape (plain text, file shares, thread replies,
/// channel events), so every non-position field is optional and consumers
/// check presence explicitly rather than sniffing shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// Intrinsic position of the item; doubles as its cursor value
    pub ts: Cursor,
    /// Channel the item was read from
    pub channel: ChannelId,
    /// Author, absent for system-generated items
    pub author: Option<AuthorId>,
    /// Body text, absent for bare file shares
    pub text: Option<String>,
    /// Source subtype tag (e.g. "file_share", "channel_join")
    pub kind: Option<String>,
    /// Position of the thread parent, set only on thread replies
    pub thread_ts: Option<Cursor>,
    pub attachments: Vec<Attachment>,
    pub files: Vec<FileRef>,
}

impl RawItem {
    /// Create a new raw item builder
    pub fn builder(ts: impl Into<Cursor>, channel: impl Into<ChannelId>) -> RawItemBuilder {
        RawItemBuilder::new(ts.into(), channel.into())
    }

    /// Whether the item carries anything worth forwarding.
    ///
    /// Items with no text, no attachments and no file references (e.g.
    /// bare join/leave events) are dropped before delivery.
    pub fn has_content(&self) -> bool {
        self.text.as_ref().is_some_and(|t| !t.trim().is_empty())
            || !self.attachments.is_empty()
            || !self.files.is_empty()
    }
}

/// Builder for creating RawItem instances
pub struct RawItemBuilder {
    ts: Cursor,
    channel: ChannelId,
    author: Option<AuthorId>,
    text: Option<String>,
    kind: Option<String>,
    thread_ts: Option<Cursor>,
    attachments: Vec<Attachment>,
    files: Vec<FileRef>,
}

impl RawItemBuilder {
    fn new(ts: Cursor, channel: ChannelId) -> Self {
        Self {
            ts,
            channel,
            author: None,
            text: None,
            kind: None,
            thread_ts: None,
            attachments: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(AuthorId::new(author));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn thread_ts(mut self, thread_ts: impl Into<Cursor>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }

    pub fn build(self) -> RawItem {
        RawItem {
            ts: self.ts,
            channel: self.channel,
            author: self.author,
            text: self.text,
            kind: self.kind,
            thread_ts: self.thread_ts,
            attachments: self.attachments,
            files: self.files,
        }
    }
}

/// A resolved item author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    /// Display name
    pub name: String,
    pub real_name: Option<String>,
    /// True when the author could not be resolved and this is the sentinel
    pub is_placeholder: bool,
}

impl Author {
    /// Sentinel display name used when author resolution fails
    pub const PLACEHOLDER_NAME: &'static str = "Unknown Author";

    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AuthorId::new(id),
            name: name.into(),
            real_name: None,
            is_placeholder: false,
        }
    }

    /// Placeholder substituted when the author is missing, deleted or the
    /// lookup failed. Carries no identity fields beyond the id, if known.
    pub fn placeholder(id: Option<&AuthorId>) -> Self {
        Self {
            id: id.cloned().unwrap_or_else(|| AuthorId::new("")),
            name: Self::PLACEHOLDER_NAME.to_string(),
            real_name: None,
            is_placeholder: true,
        }
    }
}

/// Resolved channel context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub id: ChannelId,
    /// Human-readable name, absent when the lookup failed
    pub name: Option<String>,
}

impl ChannelMeta {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Meta carrying only the id, used when the info lookup fails
    pub fn unnamed(id: ChannelId) -> Self {
        Self { id, name: None }
    }
}

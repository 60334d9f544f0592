//! HTTP client for the source API
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Non-2xx
//! statuses are handled explicitly so that rate limiting (429) can be
//! told apart from other failures and the Retry-After hint preserved.

use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Agent;

use super::api;
use super::{ItemPage, SourceApi, SourceError};
use crate::models::{
    Attachment, Author, AuthorId, ChannelId, ChannelMeta, Cursor, FileRef, RawItem,
};

/// Per-request timeout for source API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest page the source API will serve
const MAX_PAGE_SIZE: usize = 1000;

/// Source API client authenticated with a bearer token
pub struct HttpSourceClient {
    agent: Agent,
    base_url: String,
    token: String,
}

impl HttpSourceClient {
    /// Create a new client for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// GET a URL and decode the JSON body, mapping HTTP-level failures
    /// onto the source error taxonomy.
    fn call<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(SourceError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(SourceError::Api(format!("unexpected HTTP status {status}")));
        }

        response
            .body_mut()
            .read_json()
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}

impl SourceApi for HttpSourceClient {
    fn list_items(
        &self,
        channel: &ChannelId,
        since: &Cursor,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<ItemPage, SourceError> {
        let mut url = format!(
            "{}/items.list?channel={}&oldest={}&limit={}",
            self.base_url,
            urlencoding::encode(channel.as_str()),
            urlencoding::encode(since.as_str()),
            page_size.min(MAX_PAGE_SIZE)
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&cursor={}", urlencoding::encode(token)));
        }

        let response: api::ListItemsResponse = self.call(&url)?;
        if !response.ok {
            return Err(map_api_error(response.error));
        }

        let items = response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| item_from_wire(item, channel))
            .collect();

        debug!("listed page for channel {channel}");
        Ok(ItemPage {
            items,
            next_page_token: response.next_page_token,
        })
    }

    fn get_author(&self, id: &AuthorId) -> Result<Option<Author>, SourceError> {
        let url = format!(
            "{}/authors.info?id={}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let response: api::AuthorResponse = self.call(&url)?;
        if !response.ok {
            return match response.error.as_deref() {
                Some("author_not_found") => Ok(None),
                error => Err(map_api_error(error.map(str::to_string))),
            };
        }

        let info = response
            .author
            .ok_or_else(|| SourceError::Malformed("author payload missing".to_string()))?;

        Ok(Some(Author {
            id: AuthorId::new(info.id),
            name: info.name.unwrap_or_default(),
            real_name: info.real_name,
            is_placeholder: false,
        }))
    }

    fn get_channel_info(&self, id: &ChannelId) -> Result<ChannelMeta, SourceError> {
        let url = format!(
            "{}/channels.info?id={}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let response: api::ChannelInfoResponse = self.call(&url)?;
        if !response.ok {
            return Err(map_api_error(response.error));
        }

        let info = response
            .channel
            .ok_or_else(|| SourceError::Malformed("channel payload missing".to_string()))?;

        Ok(ChannelMeta {
            id: ChannelId::new(info.id),
            name: info.name,
        })
    }
}

/// Map an upstream logical error code onto the source error taxonomy
fn map_api_error(error: Option<String>) -> SourceError {
    match error.as_deref() {
        Some("channel_not_found") => SourceError::ChannelNotFound,
        Some("access_denied") | Some("not_authorized") | Some("token_revoked") => {
            SourceError::AccessDenied
        }
        Some(code) => SourceError::Api(code.to_string()),
        None => SourceError::Api("unknown error".to_string()),
    }
}

/// Convert a wire item into the domain model. Items arriving without a
/// channel reference inherit the channel they were listed from.
fn item_from_wire(item: api::Item, listed_channel: &ChannelId) -> RawItem {
    RawItem {
        ts: Cursor::new(item.ts),
        channel: item
            .channel
            .map(ChannelId::new)
            .unwrap_or_else(|| listed_channel.clone()),
        author: item.author.map(AuthorId::new),
        text: item.text,
        kind: item.kind,
        thread_ts: item.thread_ts.map(Cursor::new),
        attachments: item
            .attachments
            .unwrap_or_default()
            .into_iter()
            .map(|a| Attachment {
                title: a.title,
                text: a.text,
                url: a.url,
            })
            .collect(),
        files: item
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| FileRef {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
                url: f.url,
            })
            .collect(),
    }
}

//! Paginated, rate-limit-aware fetching of new channel items
//!
//! Pulls every item strictly newer than a channel's cursor, page by
//! page, and returns them oldest-first so the orchestrator can advance
//! the cursor monotonically past confirmed-delivered items.

use log::{debug, warn};
use std::time::Duration;

use crate::backoff;
use crate::models::{ChannelId, Cursor, RawItem};
use crate::source::{ItemPage, SourceApi, SourceError};

/// Tuning for the fetch stage
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Items requested per page
    pub page_size: usize,
    /// Hard cap on pages per cycle; bounds worst-case cycle duration.
    /// Items beyond the cap are picked up next cycle since the cursor
    /// only advances past delivered items.
    pub max_pages: usize,
    /// Retries per page when the source signals rate limiting
    pub rate_limit_retries: u32,
    /// Base delay of the rate-limit backoff schedule
    pub backoff_base: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: 10,
            rate_limit_retries: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

/// Fetch all items in `channel` strictly newer than `since`, oldest-first.
///
/// Items with no deliverable content are dropped. Failures are scoped to
/// this channel; the caller decides how they affect the rest of the run.
pub fn fetch_new_items(
    api: &dyn SourceApi,
    channel: &ChannelId,
    since: &Cursor,
    options: &FetchOptions,
) -> Result<Vec<RawItem>, SourceError> {
    let mut items: Vec<RawItem> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = list_page_with_retry(api, channel, since, page_token.as_deref(), options)?;
        items.extend(page.items);
        pages += 1;

        match page.next_page_token {
            Some(_) if pages >= options.max_pages => {
                warn!(
                    "channel {channel}: hit page cap ({} pages, {} items), remaining items deferred to next cycle",
                    pages,
                    items.len()
                );
                break;
            }
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    // Pages arrive newest-first; cursor advancement needs oldest-first.
    items.reverse();

    let before = items.len();
    items.retain(|item| item.ts.is_after(since) && item.has_content());
    if items.len() < before {
        debug!(
            "channel {channel}: dropped {} item(s) with no deliverable content or stale position",
            before - items.len()
        );
    }

    Ok(items)
}

/// Request one page, backing off and retrying while the source reports
/// rate limiting. Exhausting the retry budget surfaces the rate-limit
/// error for this channel only.
fn list_page_with_retry(
    api: &dyn SourceApi,
    channel: &ChannelId,
    since: &Cursor,
    page_token: Option<&str>,
    options: &FetchOptions,
) -> Result<ItemPage, SourceError> {
    let mut attempt = 0;

    loop {
        match api.list_items(channel, since, page_token, options.page_size) {
            Err(SourceError::RateLimited { retry_after }) if attempt < options.rate_limit_retries => {
                let delay = backoff::rate_limit_delay(options.backoff_base, attempt, retry_after);
                warn!(
                    "channel {channel}: rate limited, retrying in {:.1}s (attempt {}/{})",
                    delay.as_secs_f64(),
                    attempt + 1,
                    options.rate_limit_retries
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}

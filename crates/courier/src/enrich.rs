//! Enrichment of raw items with author and channel context
//!
//! Enrichment is best-effort context, not the primary payload: a failed
//! or empty lookup degrades to a placeholder so the pipeline always
//! produces a deliverable item, and nothing here is retried.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{Author, AuthorId, ChannelId, ChannelMeta, EnrichedItem, RawItem};
use crate::source::SourceApi;

/// Resolves author and channel context for raw items.
///
/// Lookups are cached for the lifetime of the enricher (entity identity
/// is stable and entries are small). The caches are explicit state owned
/// by this instance; [`Enricher::clear`] exists for tests and cold-start
/// semantics.
pub struct Enricher {
    authors: RwLock<HashMap<String, Author>>,
    channels: RwLock<HashMap<String, ChannelMeta>>,
}

impl Enricher {
    pub fn new() -> Self {
        Self {
            authors: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Augment a raw item with resolved author and channel context.
    ///
    /// Never fails: missing or unresolvable authors become the
    /// placeholder, and a failed channel lookup degrades to a name-less
    /// channel reference.
    pub fn enrich(&self, api: &dyn SourceApi, item: &RawItem) -> EnrichedItem {
        let author = self.resolve_author(api, item.author.as_ref());
        let channel = self.resolve_channel(api, &item.channel);
        EnrichedItem {
            item: item.clone(),
            author,
            channel,
        }
    }

    /// Drop all cached lookups
    pub fn clear(&self) {
        self.authors.write().unwrap().clear();
        self.channels.write().unwrap().clear();
    }

    fn resolve_author(&self, api: &dyn SourceApi, id: Option<&AuthorId>) -> Author {
        let Some(id) = id else {
            return Author::placeholder(None);
        };

        if let Some(cached) = self.authors.read().unwrap().get(id.as_str()) {
            return cached.clone();
        }

        match api.get_author(id) {
            Ok(Some(author)) => {
                self.authors
                    .write()
                    .unwrap()
                    .insert(id.0.clone(), author.clone());
                author
            }
            Ok(None) => {
                // deleted/unknown authors stay unknown, cache the placeholder
                debug!("author {id} not found, using placeholder");
                let placeholder = Author::placeholder(Some(id));
                self.authors
                    .write()
                    .unwrap()
                    .insert(id.0.clone(), placeholder.clone());
                placeholder
            }
            Err(e) => {
                // transient lookup failure: degrade this item without
                // caching, so a later cycle can still resolve the author
                warn!("author lookup failed for {id}: {e}");
                Author::placeholder(Some(id))
            }
        }
    }

    fn resolve_channel(&self, api: &dyn SourceApi, id: &ChannelId) -> ChannelMeta {
        if let Some(cached) = self.channels.read().unwrap().get(id.as_str()) {
            return cached.clone();
        }

        match api.get_channel_info(id) {
            Ok(meta) => {
                self.channels
                    .write()
                    .unwrap()
                    .insert(id.0.clone(), meta.clone());
                meta
            }
            Err(e) => {
                warn!("channel info lookup failed for {id}: {e}");
                ChannelMeta::unnamed(id.clone())
            }
        }
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new()
    }
}

//! One synchronization cycle across channels
//!
//! For each channel independently: read the cursor, fetch new items,
//! enrich and deliver each, then advance the cursor only past items
//! whose delivery was confirmed. An item that exhausts its delivery
//! retries is never marked processed; it is re-fetched next cycle.

use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::time::Instant;

use super::report::{ChannelSyncStats, SyncError, SyncReport, SyncStage};
use crate::cursor::CursorStore;
use crate::deliver::{Deliverer, DeliveryError};
use crate::enrich::Enricher;
use crate::fetch::{FetchOptions, fetch_new_items};
use crate::models::{ChannelId, Cursor, Envelope};
use crate::source::SourceApi;

/// Tuning for one cycle
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub fetch: FetchOptions,
    /// Items enriched and delivered concurrently per chunk; bounds the
    /// load placed on the upstream API and the webhook
    pub chunk_size: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            chunk_size: 50,
        }
    }
}

/// Run one synchronization cycle over the given channels.
///
/// Channels are processed sequentially; failures are isolated at channel
/// granularity (fetch) and item granularity (delivery). Always returns a
/// report, never fails part-way.
pub fn run_cycle(
    api: &dyn SourceApi,
    enricher: &Enricher,
    sink: &dyn Deliverer,
    store: &CursorStore,
    channels: &[ChannelId],
    options: &CycleOptions,
) -> SyncReport {
    let start = Instant::now();
    let mut report = SyncReport::default();

    for channel in channels {
        let stats = sync_channel(api, enricher, sink, store, channel, options);
        info!(
            "channel {}: {} fetched, {} delivered, {} error(s)",
            channel,
            stats.fetched,
            stats.delivered,
            stats.errors.len()
        );
        report.channels.push(stats);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}

fn sync_channel(
    api: &dyn SourceApi,
    enricher: &Enricher,
    sink: &dyn Deliverer,
    store: &CursorStore,
    channel: &ChannelId,
    options: &CycleOptions,
) -> ChannelSyncStats {
    let mut stats = ChannelSyncStats::new(channel.clone());

    let since = store.get(channel);
    debug!("channel {channel}: syncing from {since}");

    let items = match fetch_new_items(api, channel, &since, &options.fetch) {
        Ok(items) => items,
        Err(e) => {
            warn!("channel {channel}: fetch failed: {e}");
            stats.errors.push(SyncError {
                channel: channel.clone(),
                stage: SyncStage::Fetch,
                detail: e.to_string(),
            });
            return stats;
        }
    };

    stats.fetched = items.len();
    if items.is_empty() {
        return stats;
    }

    // Enrich and deliver in bounded chunks; collect() keeps outcomes in
    // item order, which the cursor computation below depends on.
    let mut outcomes: Vec<Result<(), DeliveryError>> = Vec::with_capacity(items.len());
    for chunk in items.chunks(options.chunk_size.max(1)) {
        let chunk_outcomes: Vec<Result<(), DeliveryError>> = chunk
            .par_iter()
            .map(|item| {
                let enriched = enricher.enrich(api, item);
                sink.deliver(&Envelope::new(enriched))
            })
            .collect();
        outcomes.extend(chunk_outcomes);
    }

    // The cursor advances only to the end of the contiguous prefix of
    // successes: a failed item holds the cursor at its predecessor so it
    // is re-fetched next cycle, even when later items delivered fine.
    let mut commit: Option<&Cursor> = None;
    let mut prefix_intact = true;
    for (item, outcome) in items.iter().zip(&outcomes) {
        match outcome {
            Ok(()) => {
                stats.delivered += 1;
                if prefix_intact {
                    commit = Some(&item.ts);
                }
            }
            Err(e) => {
                prefix_intact = false;
                stats.errors.push(SyncError {
                    channel: channel.clone(),
                    stage: SyncStage::Deliver,
                    detail: format!("item {}: {e}", item.ts),
                });
            }
        }
    }

    if let Some(cursor) = commit {
        match store.set(channel, cursor.clone()) {
            Ok(_) => stats.committed = Some(cursor.clone()),
            Err(e) => {
                error!("channel {channel}: cursor commit failed: {e:#}");
                stats.errors.push(SyncError {
                    channel: channel.clone(),
                    stage: SyncStage::Commit,
                    detail: format!("{e:#}"),
                });
            }
        }
    }

    stats
}

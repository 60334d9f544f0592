//! Cycle result reporting

use std::fmt;

use crate::models::{ChannelId, Cursor};

/// Pipeline stage an error was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Fetch,
    Deliver,
    Commit,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Fetch => f.write_str("fetch"),
            SyncStage::Deliver => f.write_str("deliver"),
            SyncStage::Commit => f.write_str("commit"),
        }
    }
}

/// A structured per-channel error from one cycle
#[derive(Debug, Clone)]
pub struct SyncError {
    pub channel: ChannelId,
    pub stage: SyncStage,
    pub detail: String,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}: {}: {}", self.channel, self.stage, self.detail)
    }
}

/// Outcome of one cycle for a single channel
#[derive(Debug, Clone)]
pub struct ChannelSyncStats {
    pub channel: ChannelId,
    /// Items fetched after filtering
    pub fetched: usize,
    /// Items confirmed delivered, including out-of-order successes that
    /// did not advance the cursor
    pub delivered: usize,
    /// Cursor position committed this cycle, if any
    pub committed: Option<Cursor>,
    pub errors: Vec<SyncError>,
}

impl ChannelSyncStats {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            fetched: 0,
            delivered: 0,
            committed: None,
            errors: Vec::new(),
        }
    }
}

/// Process-wide aggregate of one synchronization cycle.
///
/// Created fresh each cycle and discarded after reporting. Partial
/// failures live in the per-channel error lists; the cycle itself never
/// fails once it has started.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub channels: Vec<ChannelSyncStats>,
    /// Duration of the cycle
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn total_fetched(&self) -> usize {
        self.channels.iter().map(|c| c.fetched).sum()
    }

    pub fn total_delivered(&self) -> usize {
        self.channels.iter().map(|c| c.delivered).sum()
    }

    /// All structured errors across channels
    pub fn errors(&self) -> impl Iterator<Item = &SyncError> {
        self.channels.iter().flat_map(|c| c.errors.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// One-line summary for operator logs
    pub fn summary(&self) -> String {
        format!(
            "synced {} channel(s) in {}ms: {} fetched, {} delivered, {} error(s)",
            self.channels.len(),
            self.duration_ms,
            self.total_fetched(),
            self.total_delivered(),
            self.errors().count()
        )
    }
}

//! Durable per-channel cursor tracking
//!
//! The store owns the persisted channel→cursor mapping. State is loaded
//! lazily, cached for the life of the process, and flushed as a whole
//! snapshot after every accepted mutation. Loads are fail-soft (a corrupt
//! snapshot resets to empty state); saves are fail-loud, since a failed
//! persist must not be mistaken for recorded progress.

use anyhow::Result;
use chrono::{Duration, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::{ChannelId, Cursor};

/// Tuning for cursor freshness policy
#[derive(Debug, Clone)]
pub struct CursorStoreOptions {
    /// Fallback window used when no usable cursor is stored: `get`
    /// returns a cursor at `now - lookback`
    pub lookback: Duration,
    /// A stored cursor older than this is ignored in favor of the
    /// lookback fallback, bounding reprocessing after long outages
    pub max_age: Duration,
}

impl Default for CursorStoreOptions {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(24),
            max_age: Duration::hours(48),
        }
    }
}

/// Persistent mapping from channel to the position of the newest item
/// confirmed delivered from it.
///
/// All reads and writes are serialized through this store; the snapshot
/// on disk is always written as a whole (read-modify-write), never
/// partially updated. Single-process use is assumed.
pub struct CursorStore {
    path: PathBuf,
    options: CursorStoreOptions,
    state: Mutex<Option<HashMap<String, String>>>,
}

impl CursorStore {
    /// Create a store backed by the given snapshot file. No I/O happens
    /// until the first access.
    pub fn open(path: impl Into<PathBuf>, options: CursorStoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
            state: Mutex::new(None),
        }
    }

    /// Get the sync position for a channel.
    ///
    /// Returns the stored cursor if present and not stale, otherwise a
    /// fallback cursor at `now - lookback`. Never fails: an unreadable
    /// snapshot behaves like an empty one.
    pub fn get(&self, channel: &ChannelId) -> Cursor {
        let now = Utc::now();
        let stored = self.with_state(|state| state.get(channel.as_str()).cloned());

        match stored {
            Some(value) => {
                let cursor = Cursor::new(value);
                if cursor.age(now) > self.options.max_age {
                    warn!(
                        "stored cursor for channel {} is stale ({}), falling back to lookback window",
                        channel,
                        cursor.as_str()
                    );
                    self.fallback(now)
                } else {
                    cursor
                }
            }
            None => {
                debug!("no cursor for channel {}, using lookback window", channel);
                self.fallback(now)
            }
        }
    }

    /// Advance the cursor for a channel.
    ///
    /// The update is accepted only if `cursor` is strictly greater
    /// (numerically) than the stored value; otherwise the call is a
    /// no-op. Returns whether the update was accepted. An accepted update
    /// is flushed to disk before this returns.
    pub fn set(&self, channel: &ChannelId, cursor: Cursor) -> Result<bool> {
        let accepted = self.batch_set(vec![(channel.clone(), cursor)])?;
        Ok(accepted > 0)
    }

    /// Apply `set` semantics to each entry, flushing the snapshot at most
    /// once. Returns how many updates were accepted.
    pub fn batch_set(&self, updates: Vec<(ChannelId, Cursor)>) -> Result<usize> {
        let mut guard = self.state.lock().unwrap();
        let state = guard.get_or_insert_with(|| load_snapshot(&self.path));

        let mut accepted = 0;
        for (channel, cursor) in updates {
            let current = state.get(channel.as_str()).map(|v| Cursor::new(v.clone()));
            match current {
                Some(ref existing) if !cursor.is_after(existing) => {
                    debug!(
                        "ignoring non-advancing cursor {} for channel {} (stored {})",
                        cursor, channel, existing
                    );
                }
                _ => {
                    state.insert(channel.0, cursor.0);
                    accepted += 1;
                }
            }
        }

        if accepted > 0 {
            config::save_json_file(&self.path, state)?;
        }
        Ok(accepted)
    }

    /// Snapshot file backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fallback(&self, now: chrono::DateTime<Utc>) -> Cursor {
        Cursor::from_datetime(now - self.options.lookback)
    }

    fn with_state<R>(&self, f: impl FnOnce(&HashMap<String, String>) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        let state = guard.get_or_insert_with(|| load_snapshot(&self.path));
        f(state)
    }
}

/// Read the snapshot from disk. An absent file is an empty mapping; a
/// corrupt file is logged and treated as empty, since cursors are
/// progress tracking, not source-of-truth data.
fn load_snapshot(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }
    match config::load_json_file(path) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "cursor snapshot {} is unreadable, starting from empty state: {e:#}",
                path.display()
            );
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CursorStore {
        CursorStore::open(dir.path().join("cursors.json"), CursorStoreOptions::default())
    }

    fn recent_cursor(age_secs: i64) -> Cursor {
        Cursor::from_datetime(Utc::now() - Duration::seconds(age_secs))
    }

    #[test]
    fn test_get_without_stored_cursor_uses_lookback() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let cursor = store.get(&ChannelId::new("C1"));
        let age = cursor.age(Utc::now());

        assert!(age >= Duration::hours(24));
        assert!(age < Duration::hours(24) + Duration::seconds(5));
        // six decimal places
        let (_, frac) = cursor.as_str().split_once('.').unwrap();
        assert_eq!(frac.len(), 6);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let channel = ChannelId::new("C1");
        let cursor = recent_cursor(60);

        assert!(store.set(&channel, cursor.clone()).unwrap());
        assert_eq!(store.get(&channel), cursor);
    }

    #[test]
    fn test_monotonic_set_ignores_lower_and_equal_values() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let channel = ChannelId::new("C1");
        let high = recent_cursor(10);
        let low = recent_cursor(300);

        assert!(store.set(&channel, high.clone()).unwrap());
        assert!(!store.set(&channel, low).unwrap());
        assert!(!store.set(&channel, high.clone()).unwrap());
        assert_eq!(store.get(&channel), high);
    }

    #[test]
    fn test_stored_cursor_is_max_of_all_set_calls() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let channel = ChannelId::new("C1");

        let cursors: Vec<Cursor> = [500, 100, 300, 50, 200]
            .iter()
            .map(|age| recent_cursor(*age))
            .collect();
        for cursor in &cursors {
            store.set(&channel, cursor.clone()).unwrap();
        }

        // smallest age = newest position
        assert_eq!(store.get(&channel), cursors[3]);
    }

    #[test]
    fn test_batch_set_applies_per_entry_semantics() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let a = ChannelId::new("A");
        let b = ChannelId::new("B");

        store.set(&a, recent_cursor(60)).unwrap();
        let accepted = store
            .batch_set(vec![
                (a.clone(), recent_cursor(600)), // behind, rejected
                (b.clone(), recent_cursor(30)),  // new, accepted
            ])
            .unwrap();

        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let channel = ChannelId::new("C1");
        let cursor = recent_cursor(60);

        {
            let store = store_in(&dir);
            store.set(&channel, cursor.clone()).unwrap();
        }

        let reopened = store_in(&dir);
        assert_eq!(reopened.get(&channel), cursor);
    }

    #[test]
    fn test_stale_cursor_falls_back_to_lookback() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let channel = ChannelId::new("C1");
        let stale = Cursor::from_datetime(Utc::now() - Duration::hours(72));

        store.set(&channel, stale.clone()).unwrap();
        let cursor = store.get(&channel);

        assert_ne!(cursor, stale);
        let age = cursor.age(Utc::now());
        assert!(age >= Duration::hours(24));
        assert!(age < Duration::hours(25));
    }

    #[test]
    fn test_corrupt_snapshot_resets_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursors.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = CursorStore::open(&path, CursorStoreOptions::default());
        let channel = ChannelId::new("C1");

        // behaves like an empty store, and stays writable
        let fallback = store.get(&channel);
        assert!(fallback.age(Utc::now()) >= Duration::hours(24));
        assert!(store.set(&channel, recent_cursor(60)).unwrap());
    }

    #[test]
    fn test_absent_snapshot_is_empty_mapping() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.batch_set(vec![]).unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_failure_propagates() {
        let dir = TempDir::new().unwrap();
        // parent "cursors.json" is a file, so the nested path can't be created
        let blocker = dir.path().join("cursors.json");
        std::fs::write(&blocker, "{}").unwrap();
        let store = CursorStore::open(blocker.join("nested.json"), CursorStoreOptions::default());

        let result = store.set(&ChannelId::new("C1"), recent_cursor(60));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejected_updates_do_not_flush() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let channel = ChannelId::new("C1");

        store.set(&channel, recent_cursor(60)).unwrap();
        let modified_before = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        // rejected update must not rewrite the snapshot
        store.set(&channel, recent_cursor(600)).unwrap();
        let modified_after = std::fs::metadata(store.path()).unwrap().modified().unwrap();
        assert_eq!(modified_before, modified_after);
    }
}

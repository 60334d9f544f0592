//! Settings for the courier pipeline
//!
//! Supports loading from (in order of priority):
//! 1. JSON file (~/.config/courier/courier.json)
//! 2. Runtime environment variables (fallback)
//!
//! Validation failures here are fatal at startup; no cycle runs with a
//! missing token or a malformed webhook endpoint.

use anyhow::{Context, Result, ensure};
use chrono::Duration;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::cursor::CursorStoreOptions;
use crate::deliver::DeliveryOptions;
use crate::fetch::FetchOptions;
use crate::models::ChannelId;
use crate::sync::CycleOptions;

/// Settings filename in the Courier config directory
pub const SETTINGS_FILE: &str = "courier.json";

/// Cursor snapshot filename in the Courier config directory
const CURSOR_FILE: &str = "cursors.json";

/// Top-level runtime settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub source: SourceSettings,
    pub webhook: WebhookSettings,
    /// Channels to synchronize each cycle
    #[serde(default)]
    pub channels: Vec<String>,
    /// Cursor snapshot location; defaults to the config directory
    #[serde(default)]
    pub cursor_file: Option<PathBuf>,
    #[serde(default)]
    pub tuning: SyncTuning,
}

/// Upstream source API credentials
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub base_url: String,
    pub token: String,
}

/// Delivery target endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Named tuning knobs for the engine. Every backoff/retry parameter
/// lives here rather than in the components that apply it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    pub lookback_minutes: i64,
    pub max_cursor_age_hours: i64,
    pub page_size: usize,
    pub max_pages: usize,
    pub fetch_retries: u32,
    pub fetch_backoff_secs: u64,
    pub delivery_attempts: u32,
    pub delivery_backoff_secs: u64,
    pub delivery_timeout_secs: u64,
    pub chunk_size: usize,
    pub cooldown_secs: u64,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            lookback_minutes: 24 * 60,
            max_cursor_age_hours: 48,
            page_size: 1000,
            max_pages: 10,
            fetch_retries: 3,
            fetch_backoff_secs: 2,
            delivery_attempts: 3,
            delivery_backoff_secs: 1,
            delivery_timeout_secs: 30,
            chunk_size: 50,
            cooldown_secs: 60,
        }
    }
}

impl Settings {
    /// Load settings using the following priority:
    /// 1. JSON file (~/.config/courier/courier.json)
    /// 2. Runtime environment variables
    pub fn load() -> Result<Self> {
        let settings: Settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::from_env()?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(json).context("Failed to parse settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("COURIER_SOURCE_URL")
            .context("COURIER_SOURCE_URL environment variable not set")?;
        let token = std::env::var("COURIER_SOURCE_TOKEN")
            .context("COURIER_SOURCE_TOKEN environment variable not set")?;
        let webhook_url = std::env::var("COURIER_WEBHOOK_URL")
            .context("COURIER_WEBHOOK_URL environment variable not set")?;
        let webhook_token = std::env::var("COURIER_WEBHOOK_TOKEN").ok();
        let channels = std::env::var("COURIER_CHANNELS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            source: SourceSettings { base_url, token },
            webhook: WebhookSettings {
                url: webhook_url,
                token: webhook_token,
            },
            channels,
            cursor_file: None,
            tuning: SyncTuning::default(),
        })
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.source.token.is_empty(), "source token is empty");
        validate_http_url(&self.source.base_url).context("invalid source base URL")?;
        validate_http_url(&self.webhook.url).context("invalid webhook URL")?;
        Ok(())
    }

    /// Channels from configuration as typed identifiers
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(ChannelId::new).collect()
    }

    /// Resolved cursor snapshot path
    pub fn cursor_path(&self) -> Result<PathBuf> {
        match &self.cursor_file {
            Some(path) => Ok(path.clone()),
            None => config::config_path(CURSOR_FILE)
                .context("Could not determine config directory for cursor snapshot"),
        }
    }
}

fn validate_http_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("not a URL: {raw}"))?;
    ensure!(
        matches!(url.scheme(), "http" | "https"),
        "unsupported scheme '{}', expected http or https",
        url.scheme()
    );
    Ok(())
}

impl SyncTuning {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.page_size,
            max_pages: self.max_pages,
            rate_limit_retries: self.fetch_retries,
            backoff_base: std::time::Duration::from_secs(self.fetch_backoff_secs),
        }
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            max_attempts: self.delivery_attempts,
            backoff_base: std::time::Duration::from_secs(self.delivery_backoff_secs),
            timeout: std::time::Duration::from_secs(self.delivery_timeout_secs),
        }
    }

    pub fn store_options(&self) -> CursorStoreOptions {
        CursorStoreOptions {
            lookback: Duration::minutes(self.lookback_minutes),
            max_age: Duration::hours(self.max_cursor_age_hours),
        }
    }

    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            fetch: self.fetch_options(),
            chunk_size: self.chunk_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_settings() {
        let json = r#"{
            "source": { "base_url": "https://api.example.com", "token": "xoxb-test" },
            "webhook": { "url": "https://hooks.example.com/in" },
            "channels": ["C1", "C2"]
        }"#;

        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.channels, vec!["C1", "C2"]);
        assert_eq!(settings.webhook.token, None);
        assert_eq!(settings.tuning.page_size, 1000);
        assert_eq!(settings.tuning.lookback_minutes, 1440);
    }

    #[test]
    fn test_tuning_overrides_merge_with_defaults() {
        let json = r#"{
            "source": { "base_url": "https://api.example.com", "token": "t" },
            "webhook": { "url": "https://hooks.example.com/in" },
            "tuning": { "max_pages": 3, "chunk_size": 10 }
        }"#;

        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.tuning.max_pages, 3);
        assert_eq!(settings.tuning.chunk_size, 10);
        // untouched knobs keep their defaults
        assert_eq!(settings.tuning.delivery_attempts, 3);
        assert_eq!(settings.tuning.cooldown_secs, 60);
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let json = r#"{
            "source": { "base_url": "https://api.example.com", "token": "" },
            "webhook": { "url": "https://hooks.example.com/in" }
        }"#;
        assert!(Settings::from_json(json).is_err());
    }

    #[test]
    fn test_malformed_webhook_url_is_rejected() {
        let json = r#"{
            "source": { "base_url": "https://api.example.com", "token": "t" },
            "webhook": { "url": "not a url" }
        }"#;
        assert!(Settings::from_json(json).is_err());
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let json = r#"{
            "source": { "base_url": "https://api.example.com", "token": "t" },
            "webhook": { "url": "ftp://hooks.example.com/in" }
        }"#;
        assert!(Settings::from_json(json).is_err());
    }

    #[test]
    fn test_tuning_converts_to_component_options() {
        let tuning = SyncTuning {
            fetch_backoff_secs: 5,
            delivery_timeout_secs: 7,
            lookback_minutes: 60,
            ..SyncTuning::default()
        };

        assert_eq!(
            tuning.fetch_options().backoff_base,
            std::time::Duration::from_secs(5)
        );
        assert_eq!(
            tuning.delivery_options().timeout,
            std::time::Duration::from_secs(7)
        );
        assert_eq!(tuning.store_options().lookback, Duration::hours(1));
    }
}

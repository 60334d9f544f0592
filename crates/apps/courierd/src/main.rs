//! Courier daemon - runs synchronization cycles on a schedule
//!
//! This is a thin wrapper: it loads configuration, wires the engine
//! components together and triggers cycles. All synchronization behavior
//! lives in the `courier` crate.

use anyhow::{Context, Result, bail};
use clap::Parser;
use courier::{ChannelId, CursorStore, Enricher, HttpSourceClient, Settings, WebhookClient, run_cycle};
use log::{info, warn};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "courierd",
    about = "Forward channel messages to a webhook",
    long_about = "Incrementally synchronizes messages from configured source \
                  channels to a webhook endpoint, tracking per-channel cursors \
                  so each message is forwarded at least once across restarts."
)]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Seconds between cycle starts
    #[arg(long, default_value_t = 60, env = "COURIER_INTERVAL")]
    interval: u64,

    /// Channel to sync; repeatable, overrides configured channels
    #[arg(long = "channel", value_name = "ID")]
    channels: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    config::init().context("Failed to initialize config directory")?;
    let settings = Settings::load().context("Failed to load courier settings")?;

    let channels: Vec<ChannelId> = if cli.channels.is_empty() {
        settings.channel_ids()
    } else {
        cli.channels.iter().map(ChannelId::new).collect()
    };
    if channels.is_empty() {
        bail!("no channels configured; set COURIER_CHANNELS, list them in courier.json, or pass --channel");
    }

    let api = HttpSourceClient::new(&settings.source.base_url, &settings.source.token);
    let sink = WebhookClient::new(
        settings.webhook.url.clone(),
        settings.webhook.token.clone(),
        settings.tuning.delivery_options(),
    );
    let store = CursorStore::open(settings.cursor_path()?, settings.tuning.store_options());
    let enricher = Enricher::new();
    let cycle_options = settings.tuning.cycle_options();
    let cooldown = Duration::from_secs(settings.tuning.cooldown_secs);
    let interval = Duration::from_secs(cli.interval);

    info!("syncing {} channel(s) to {}", channels.len(), settings.webhook.url);

    loop {
        let started = Instant::now();
        let report = run_cycle(&api, &enricher, &sink, &store, &channels, &cycle_options);

        info!("{}", report.summary());
        for error in report.errors() {
            warn!("{error}");
        }

        if cli.once {
            return Ok(());
        }

        let delay = next_cycle_delay(started.elapsed(), interval, cooldown);
        info!("next cycle in {:.0}s", delay.as_secs_f64());
        std::thread::sleep(delay);
    }
}

/// Time to wait before the next cycle: keeps cycle starts `interval`
/// apart, but never closer than `cooldown` after one finishes, so
/// cycles cannot overlap or hammer the source when one overruns.
fn next_cycle_delay(elapsed: Duration, interval: Duration, cooldown: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(cooldown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycle_delay_waits_out_the_interval() {
        let delay = next_cycle_delay(
            Duration::from_secs(10),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        assert_eq!(delay, Duration::from_secs(50));
    }

    #[test]
    fn test_next_cycle_delay_enforces_cooldown_on_overrun() {
        // the cycle took longer than the interval
        let delay = next_cycle_delay(
            Duration::from_secs(90),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn test_next_cycle_delay_cooldown_floor_applies() {
        let delay = next_cycle_delay(
            Duration::from_secs(58),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        assert_eq!(delay, Duration::from_secs(5));
    }
}

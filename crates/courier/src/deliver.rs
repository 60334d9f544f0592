//! Webhook delivery with per-item retry
//!
//! Each envelope is delivered independently: one item's permanent
//! failure never blocks another item's delivery or the cursor progress
//! driven by other items.

use log::{debug, warn};
use std::time::Duration;
use ureq::Agent;

use crate::backoff;
use crate::models::Envelope;

/// Tuning for the delivery stage
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Total attempts per envelope, including the first
    pub max_attempts: u32,
    /// Base of the between-attempt backoff schedule: attempt k is
    /// followed by a wait of `backoff_base * 2^k`
    pub backoff_base: Duration,
    /// Bound on each individual attempt
    pub timeout: Duration,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Terminal delivery failure for a single envelope
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook returned HTTP {0}")]
    Status(u16),

    #[error("webhook transport error: {0}")]
    Transport(String),
}

/// Downstream delivery target.
///
/// The webhook client implements this against the real endpoint; tests
/// substitute recording sinks.
pub trait Deliverer: Send + Sync {
    /// Deliver one envelope, retrying internally. An `Err` is terminal
    /// for this envelope: the retry budget is spent.
    fn deliver(&self, envelope: &Envelope) -> Result<(), DeliveryError>;
}

/// Delivery client POSTing envelopes as JSON to a configured endpoint
pub struct WebhookClient {
    agent: Agent,
    endpoint: String,
    token: Option<String>,
    options: DeliveryOptions,
}

impl WebhookClient {
    /// Create a client for the given endpoint. `token`, when set, is sent
    /// as a bearer credential in the Authorization header.
    pub fn new(endpoint: impl Into<String>, token: Option<String>, options: DeliveryOptions) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Self {
            agent,
            endpoint: endpoint.into(),
            token,
            options,
        }
    }

    /// One POST attempt. Any 2xx is success; the response body, if any,
    /// is an opaque acknowledgement.
    fn post_once(&self, envelope: &Envelope) -> Result<(), DeliveryError> {
        let mut request = self.agent.post(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }

        let response = request
            .send_json(envelope)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("delivered item {} ({})", envelope.position(), status);
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

impl Deliverer for WebhookClient {
    fn deliver(&self, envelope: &Envelope) -> Result<(), DeliveryError> {
        retry_delivery(&self.options, |attempt| {
            let result = self.post_once(envelope);
            if let Err(e) = &result {
                warn!(
                    "delivery attempt {attempt} failed for item {}: {e}",
                    envelope.position()
                );
            }
            result
        })
    }
}

/// Run the per-envelope retry loop around a single-attempt operation.
///
/// Separated from the HTTP client so the schedule is testable without a
/// live endpoint. `max_attempts` of zero is treated as one attempt.
pub fn retry_delivery<F>(options: &DeliveryOptions, mut attempt_fn: F) -> Result<(), DeliveryError>
where
    F: FnMut(u32) -> Result<(), DeliveryError>,
{
    let attempts = options.max_attempts.max(1);
    let mut last_error = DeliveryError::Transport("no attempts made".to_string());

    for attempt in 1..=attempts {
        match attempt_fn(attempt) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt < attempts {
                    std::thread::sleep(backoff::exponential_delay(options.backoff_base, attempt));
                }
                last_error = e;
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, ChannelMeta, EnrichedItem, RawItem};
    use std::sync::Mutex;

    fn fast_options(max_attempts: u32) -> DeliveryOptions {
        DeliveryOptions {
            max_attempts,
            backoff_base: Duration::ZERO,
            ..DeliveryOptions::default()
        }
    }

    fn make_envelope() -> Envelope {
        let item = RawItem::builder("100.1", "C1").text("hi").build();
        Envelope::new(EnrichedItem {
            author: Author::new("U1", "alice"),
            channel: ChannelMeta::new("C1", "general"),
            item,
        })
    }

    #[test]
    fn test_retry_succeeds_first_attempt() {
        let calls = Mutex::new(0u32);
        let result = retry_delivery(&fast_options(3), |_| {
            *calls.lock().unwrap() += 1;
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_retry_recovers_within_budget() {
        let calls = Mutex::new(0u32);
        let result = retry_delivery(&fast_options(3), |attempt| {
            *calls.lock().unwrap() += 1;
            if attempt < 3 {
                Err(DeliveryError::Status(503))
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[test]
    fn test_retry_exhaustion_returns_last_error() {
        let calls = Mutex::new(0u32);
        let result = retry_delivery(&fast_options(3), |attempt| {
            *calls.lock().unwrap() += 1;
            Err(DeliveryError::Status(500 + attempt as u16))
        });

        match result {
            Err(DeliveryError::Status(status)) => assert_eq!(status, 503),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[test]
    fn test_zero_attempts_is_treated_as_one() {
        let calls = Mutex::new(0u32);
        let result = retry_delivery(&fast_options(0), |_| {
            *calls.lock().unwrap() += 1;
            Err(DeliveryError::Transport("down".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_envelope_is_serializable_for_post() {
        // the POST body is the serialized envelope; make sure it encodes
        let envelope = make_envelope();
        let body = serde_json::to_string(&envelope).unwrap();
        assert!(body.contains("\"schema_version\":1"));
        assert!(body.contains("\"100.1\""));
    }
}

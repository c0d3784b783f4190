//! Rate-limited lookup client.
//!
//! ## Layers
//!
//! - [`http::HttpClient`]: thin reqwest wrapper, one GET with JSON decode.
//! - [`registry::NetworkRegistry`]: injected per-domain admission state,
//!   pending count vs a shrinking `current_max`, error tally, circuit flag.
//! - [`RateLimitedClient`]: ties the two together. Waits for admission,
//!   retries with a fixed delay, shrinks the window on failure, trips the
//!   circuit permanently once a domain has failed too often.
//!
//! Failures never surface to callers as errors; an exhausted or
//! circuit-open lookup resolves to the empty result.

pub mod http;
pub mod ratelimit;
pub mod registry;
pub mod signature;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::client::http::HttpClient;
use crate::client::ratelimit::RateLimitedLog;
use crate::client::registry::{Admission, NetworkRegistry};

/// Most simultaneous in-flight requests a domain starts with.
pub const MAX_PENDING_REQUESTS: usize = 40;
/// Floor the per-domain window never shrinks below.
pub const MIN_PENDING_REQUESTS: usize = 5;
/// Failures after which a domain's circuit opens for good.
pub const MAX_NETWORK_ERRORS: usize = 25;
/// Attempts per lookup before giving up.
pub const MAX_RETRIES: usize = 3;

/// Tunable limits and delays. Production uses [`ClientConfig::default`];
/// tests shrink the delays.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_pending: usize,
    pub min_pending: usize,
    pub max_errors: usize,
    pub max_retries: usize,
    /// How long a saturated caller sleeps between admission checks.
    pub poll_interval: Duration,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_pending: MAX_PENDING_REQUESTS,
            min_pending: MIN_PENDING_REQUESTS,
            max_errors: MAX_NETWORK_ERRORS,
            max_retries: MAX_RETRIES,
            poll_interval: Duration::from_millis(500),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Admission-controlled, retrying JSON GET client.
#[derive(Clone)]
pub struct RateLimitedClient {
    http: HttpClient,
    registry: Arc<NetworkRegistry>,
    config: ClientConfig,
    log: RateLimitedLog,
}

impl RateLimitedClient {
    pub fn new(registry: Arc<NetworkRegistry>, config: ClientConfig) -> Self {
        Self {
            http: HttpClient::new(),
            registry,
            config,
            log: RateLimitedLog::new(Duration::from_secs(1)),
        }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Fetch `url`, returning the JSON array it resolves to.
    ///
    /// The empty vec stands in for every failure mode: open circuit,
    /// exhausted retries, non-array payloads of `null`. A non-array,
    /// non-null payload comes back as a single-element vec.
    pub async fn get(&self, url: &Url) -> Vec<Value> {
        let domain = match url.host_str() {
            Some(host) => host.to_string(),
            None => {
                tracing::warn!(%url, "lookup url has no host, skipping");
                return Vec::new();
            }
        };

        // Admission: wait for the domain's window to have room. The
        // circuit is checked on every pass so an open circuit does no
        // further I/O, saturated or not.
        loop {
            match self.registry.try_admit(&domain) {
                Admission::CircuitOpen => {
                    self.log
                        .warn(&format!("circuit open for {domain}"), || {
                            tracing::warn!(domain = %domain, "too many network errors, dropping lookup");
                        });
                    return Vec::new();
                }
                Admission::Saturated => {
                    self.log.warn(&format!("rate limited for {domain}"), || {
                        tracing::warn!(domain = %domain, %url, "rate limited, waiting for admission");
                    });
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Admission::Admitted => break,
            }
        }
        // The admission slot from the loop above covers the first
        // attempt; later attempts re-enter the window themselves.
        let mut admitted = true;

        for attempt in 1..=self.config.max_retries {
            if !admitted {
                self.registry.enter(&domain);
            }
            let result = self.http.get_json(url).await;
            self.registry.release(&domain);
            admitted = false;

            match result {
                Ok(value) => return coerce_array(value),
                Err(err) => {
                    let circuit_open = self.registry.record_failure(&domain);
                    tracing::warn!(
                        domain = %domain,
                        %url,
                        attempt,
                        error = %err,
                        "lookup attempt failed"
                    );
                    if circuit_open {
                        tracing::error!(domain = %domain, "error budget exhausted, circuit open");
                        return Vec::new();
                    }
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }

        tracing::warn!(%url, "lookup failed after {} attempts", self.config.max_retries);
        Vec::new()
    }
}

fn coerce_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_array_shapes() {
        assert_eq!(coerce_array(serde_json::json!([1, 2])).len(), 2);
        assert!(coerce_array(Value::Null).is_empty());
        assert_eq!(coerce_array(serde_json::json!({"a": 1})).len(), 1);
    }
}

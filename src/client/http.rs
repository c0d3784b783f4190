//! Thin HTTP layer: one GET, JSON decoded.
//!
//! Retry, admission and circuit policy live a level up in
//! [`RateLimitedClient`](crate::client::RateLimitedClient); this wrapper
//! only turns a URL into a decoded payload or an error.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

const USER_AGENT: &str = concat!("taglens/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// GET `url` and decode the body as JSON. Non-2xx statuses are errors.
    pub async fn get_json(&self, url: &Url) -> Result<Value> {
        let response = self
            .client
            .get(url.clone())
            .header("accept", "application/json")
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("unexpected status {status} from {url}");
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid JSON from {url}"))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

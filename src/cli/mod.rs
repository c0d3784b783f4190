//! CLI subcommand implementations for the taglens binary.

pub mod annotate_cmd;
pub mod lookup_cmd;

use std::sync::Arc;

use crate::api::ApiClient;
use crate::client::registry::NetworkRegistry;
use crate::client::{ClientConfig, RateLimitedClient};
use crate::config::Settings;

/// Wire an [`ApiClient`] up from settings, one registry per invocation.
pub fn api_client(settings: &Settings) -> ApiClient {
    let config = ClientConfig::default();
    let registry = Arc::new(NetworkRegistry::new(&config));
    let client = RateLimitedClient::new(registry, config);
    ApiClient::new(settings.base_url.clone(), settings.cache_lifetime, client)
}

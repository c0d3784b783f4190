//! Remote lookup surface.
//!
//! [`ApiClient`] owns the base URL, the admission-controlled client and
//! the result cache, and exposes the typed lookups the annotation engine
//! consumes: tag translation ([`tags`]), artist resolution ([`artists`])
//! and post/post-count queries for hover cards ([`posts`]).
//!
//! Every lookup funnels through [`ApiClient::get`], which forwards the
//! configured cache lifetime as an `expires_in` parameter (server-side
//! caching; nothing is enforced locally) and memoizes by canonical
//! signature, so one question is one network operation.

pub mod artists;
pub mod models;
pub mod normalize;
pub mod posts;
pub mod tags;

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::cache::ResultCache;
use crate::client::signature::RequestSignature;
use crate::client::RateLimitedClient;

/// Typed, memoized access to one booru endpoint.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    cache_lifetime: u64,
    client: RateLimitedClient,
    results: Arc<ResultCache>,
}

impl ApiClient {
    pub fn new(base: Url, cache_lifetime: u64, client: RateLimitedClient) -> Self {
        Self {
            base,
            cache_lifetime,
            client,
            results: Arc::new(ResultCache::new()),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    /// Memoized GET against the configured endpoint.
    ///
    /// `path` is the endpoint path (`/tags.json`); `params` become query
    /// pairs, plus `expires_in` when a cache lifetime is configured.
    pub async fn get(&self, path: &str, params: Vec<(String, String)>) -> Arc<Vec<Value>> {
        let mut params = params;
        if self.cache_lifetime > 0 {
            params.push(("expires_in".to_string(), self.cache_lifetime.to_string()));
        }

        let signature = RequestSignature::new(path, params.clone());
        let url = match self.build_url(path, &params) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(path, error = %err, "failed to build lookup url");
                return Arc::new(Vec::new());
            }
        };

        let client = self.client.clone();
        self.results
            .get_or_fetch(signature, move || async move { client.get(&url).await })
            .await
    }

    fn build_url(&self, path: &str, params: &[(String, String)]) -> Result<Url, url::ParseError> {
        let mut url = self.base.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

/// Deserialize each array element, skipping ones that do not fit the
/// expected shape.
pub(crate) fn parse_list<T: serde::de::DeserializeOwned>(values: &[Value]) -> Vec<T> {
    values
        .iter()
        .filter_map(|v| match serde_json::from_value(v.clone()) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed payload item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_includes_params() {
        let client = RateLimitedClient::new(
            Arc::new(crate::client::registry::NetworkRegistry::new(
                &crate::client::ClientConfig::default(),
            )),
            crate::client::ClientConfig::default(),
        );
        let api = ApiClient::new(
            Url::parse("https://danbooru.donmai.us").unwrap(),
            300,
            client,
        );
        let url = api
            .build_url(
                "/tags.json",
                &[("search[name]".to_string(), "hatsune miku".to_string())],
            )
            .unwrap();
        assert_eq!(url.path(), "/tags.json");
        assert!(url.query().unwrap().contains("search%5Bname%5D=hatsune+miku"));
    }

    #[test]
    fn test_parse_list_skips_malformed() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }
        let values = vec![
            serde_json::json!({"name": "ok"}),
            serde_json::json!({"title": "wrong shape"}),
        ];
        let parsed: Vec<Named> = parse_list(&values);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "ok");
    }
}

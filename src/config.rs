//! Runtime settings.
//!
//! Mirrors the handful of knobs the pipeline exposes: which endpoint to
//! talk to, how long the server may cache answers, and how hover cards
//! present posts. Settings are validated once up front; a bad value is a
//! construction error, not a runtime surprise.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::api::models::Rating;

/// Endpoints known to speak the expected API dialect. Any absolute URL
/// is accepted; these are the defaults offered to users.
pub const KNOWN_ENDPOINTS: [&str; 5] = [
    "https://danbooru.donmai.us",
    "https://kagamihara.donmai.us",
    "https://saitou.donmai.us",
    "https://shima.donmai.us",
    "https://safebooru.donmai.us",
];

/// Default posts shown per hover card.
pub const DEFAULT_PREVIEW_LIMIT: usize = 3;
/// Default server-side cache lifetime, in seconds.
pub const DEFAULT_CACHE_LIFETIME: u64 = 300;
/// Most posts a hover card may request.
pub const MAX_PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("preview limit {0} outside 1..={MAX_PREVIEW_LIMIT}")]
    PreviewLimit(usize),
    #[error("base url `{0}` cannot be a base")]
    BaseUrl(Url),
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Endpoint every lookup goes to.
    pub base_url: Url,
    /// Seconds the server may cache an answer, forwarded as
    /// `expires_in`. Zero disables the parameter.
    pub cache_lifetime: u64,
    /// Posts per hover card.
    pub preview_limit: usize,
    /// Highest rating shown unblurred; posts rated above it blur.
    pub show_preview_rating: Rating,
    /// Whether previews include deleted posts.
    pub show_deleted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_endpoint(),
            cache_lifetime: DEFAULT_CACHE_LIFETIME,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            show_preview_rating: Rating::Sensitive,
            show_deleted: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.preview_limit == 0 || self.preview_limit > MAX_PREVIEW_LIMIT {
            return Err(SettingsError::PreviewLimit(self.preview_limit));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(SettingsError::BaseUrl(self.base_url.clone()));
        }
        Ok(())
    }

    /// Whether the configured endpoint is one of the known hosts.
    pub fn is_known_endpoint(&self) -> bool {
        KNOWN_ENDPOINTS
            .iter()
            .any(|known| self.base_url.as_str().trim_end_matches('/') == *known)
    }
}

fn default_endpoint() -> Url {
    // The literal is a constant of this crate; parsing it cannot fail.
    Url::parse(KNOWN_ENDPOINTS[0]).unwrap()
}

//! Artist resolution.

use crate::api::models::{Artist, ARTIST_FIELDS};
use crate::api::{parse_list, ApiClient};

impl ApiClient {
    /// Artists whose registered URLs match a profile URL. Inactive
    /// artist entries are excluded server-side.
    pub async fn artists_by_url(&self, profile_url: &str) -> Vec<Artist> {
        if profile_url.is_empty() {
            return Vec::new();
        }
        let values = self
            .get(
                "/artists.json",
                vec![
                    ("search[url_matches]".to_string(), profile_url.to_string()),
                    ("search[is_active]".to_string(), "true".to_string()),
                    ("only".to_string(), ARTIST_FIELDS.to_string()),
                ],
            )
            .await;
        parse_list(&values)
    }

    /// Artists matching a display name; spaces fold to underscores
    /// before searching.
    pub async fn artists_by_name(&self, name: &str) -> Vec<Artist> {
        if name.is_empty() {
            return Vec::new();
        }
        let values = self
            .get(
                "/artists.json",
                vec![
                    ("search[name]".to_string(), name.replace(' ', "_")),
                    ("search[is_active]".to_string(), "true".to_string()),
                    ("only".to_string(), ARTIST_FIELDS.to_string()),
                ],
            )
            .await;
        parse_list(&values)
    }
}

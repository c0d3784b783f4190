//! Post queries backing hover cards.

use serde::Deserialize;

use crate::api::models::{Post, POST_COUNT_FIELDS, POST_FIELDS};
use crate::api::{parse_list, ApiClient};

/// The `only=post_count` selection returns bare count objects.
#[derive(Debug, Deserialize)]
struct TagCount {
    #[serde(default)]
    post_count: i64,
}

/// Search prefix selecting whether deleted posts appear.
pub fn status_prefix(show_deleted: bool) -> &'static str {
    if show_deleted {
        "status:any"
    } else {
        "-status:deleted"
    }
}

impl ApiClient {
    /// Most recent posts for a tag, newest first, at most `limit`.
    pub async fn recent_posts(&self, tag: &str, limit: usize, show_deleted: bool) -> Vec<Post> {
        let values = self
            .get(
                "/posts.json",
                vec![
                    (
                        "tags".to_string(),
                        format!("{} {tag}", status_prefix(show_deleted)),
                    ),
                    ("limit".to_string(), limit.to_string()),
                    ("only".to_string(), POST_FIELDS.to_string()),
                ],
            )
            .await;
        parse_list(&values)
    }

    /// Total post count recorded on the tag, zero when the tag is
    /// unknown.
    pub async fn tag_post_count(&self, name: &str) -> i64 {
        let values = self
            .get(
                "/tags.json",
                vec![
                    ("search[name]".to_string(), name.to_string()),
                    ("only".to_string(), POST_COUNT_FIELDS.to_string()),
                ],
            )
            .await;
        parse_list::<TagCount>(&values)
            .first()
            .map(|t| t.post_count)
            .unwrap_or(0)
    }
}

//! Tag translation.
//!
//! Wiki aliases are authoritative: a page whose `other_names` match the
//! text names the canonical tag regardless of script. Only when no alias
//! matches, and the text could itself be a tag name (see
//! [`normalize::is_plain_tag_name`]), is a direct tag search attempted.

use crate::api::models::{Tag, TranslatedTag, WikiPage, TAG_FIELDS, WIKI_FIELDS};
use crate::api::normalize::{self, is_plain_tag_name, normalize_tag};
use crate::api::{parse_list, ApiClient};

impl ApiClient {
    /// Resolve raw page text to translated tags.
    ///
    /// Empty after normalization means no lookup at all. An alias hit
    /// suppresses the fallback search entirely.
    pub async fn translate_tag(&self, raw: &str) -> Vec<TranslatedTag> {
        let normalized = normalize_tag(raw);
        if normalized.is_empty() {
            return Vec::new();
        }

        let pages = self
            .get(
                "/wiki_pages.json",
                vec![
                    (
                        "search[other_names_match]".to_string(),
                        normalized.clone(),
                    ),
                    ("search[is_deleted]".to_string(), "false".to_string()),
                    ("only".to_string(), WIKI_FIELDS.to_string()),
                ],
            )
            .await;
        let pages: Vec<WikiPage> = parse_list(&pages);
        if !pages.is_empty() {
            return pages.into_iter().map(TranslatedTag::from).collect();
        }

        if !is_plain_tag_name(&normalized) {
            return Vec::new();
        }
        let tags = self
            .get(
                "/tags.json",
                vec![
                    ("search[name]".to_string(), normalized),
                    ("only".to_string(), TAG_FIELDS.to_string()),
                ],
            )
            .await;
        parse_list::<Tag>(&tags)
            .into_iter()
            .map(TranslatedTag::from)
            .collect()
    }

    /// [`translate_tag`](Self::translate_tag) with celebration-hashtag
    /// suffixes stripped first.
    pub async fn translate_hashtag(&self, raw: &str) -> Vec<TranslatedTag> {
        let name = normalize::normalize_hashtag(raw.trim());
        self.translate_tag(&name).await
    }
}

//! Payload types for booru lookups.
//!
//! Field lists mirror what each lookup asks the server to return through
//! its `only` parameter; anything else is never requested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `only` selection for post previews.
pub const POST_FIELDS: &str = "created_at,file_size,has_visible_children,id,image_height,image_width,is_flagged,is_pending,is_deleted,parent_id,preview_file_url,rating,source,tag_string";
/// `only` selection for post-count queries.
pub const POST_COUNT_FIELDS: &str = "post_count";
/// `only` selection for direct tag searches.
pub const TAG_FIELDS: &str = "name,category";
/// `only` selection for wiki alias searches.
pub const WIKI_FIELDS: &str = "title,category_name";
/// `only` selection for artist searches.
pub const ARTIST_FIELDS: &str = "id,name,is_banned,other_names,urls";

/// Wiki page hit from an alias search. `category_name` carries the
/// numeric category of the tag sharing the page title.
#[derive(Debug, Clone, Deserialize)]
pub struct WikiPage {
    pub title: String,
    pub category_name: u8,
}

/// Direct tag search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    pub category: u8,
    #[serde(default)]
    pub post_count: Option<i64>,
}

/// A resolved tag ready for rendering: canonical name, display name with
/// underscores turned into spaces, and the category driving its class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedTag {
    pub name: String,
    pub pretty_name: String,
    pub category: u8,
}

impl TranslatedTag {
    pub fn new(name: &str, category: u8) -> Self {
        Self {
            name: name.to_string(),
            pretty_name: name.replace('_', " "),
            category,
        }
    }
}

impl From<WikiPage> for TranslatedTag {
    fn from(page: WikiPage) -> Self {
        Self::new(&page.title, page.category_name)
    }
}

impl From<Tag> for TranslatedTag {
    fn from(tag: Tag) -> Self {
        Self::new(&tag.name, tag.category)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(default)]
    pub urls: Vec<ArtistUrl>,
}

impl Artist {
    pub fn pretty_name(&self) -> String {
        self.name.replace('_', " ")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistUrl {
    pub url: String,
    #[serde(default)]
    pub normalized_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Post rating ladder. Ordering is the blur comparison: anything rated
/// above the configured threshold renders blurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Rating {
    #[serde(rename = "g")]
    General,
    #[serde(rename = "s")]
    Sensitive,
    #[serde(rename = "q")]
    Questionable,
    #[serde(rename = "e")]
    Explicit,
}

impl Rating {
    pub fn as_letter(&self) -> &'static str {
        match self {
            Rating::General => "g",
            Rating::Sensitive => "s",
            Rating::Questionable => "q",
            Rating::Explicit => "e",
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g" => Ok(Rating::General),
            "s" => Ok(Rating::Sensitive),
            "q" => Ok(Rating::Questionable),
            "e" => Ok(Rating::Explicit),
            other => Err(format!("unknown rating `{other}`, expected g, s, q or e")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub has_visible_children: bool,
    pub image_height: u32,
    pub image_width: u32,
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub preview_file_url: Option<String>,
    pub rating: Rating,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tag_string: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translated_tag_pretty_name() {
        let tag = TranslatedTag::new("hatsune_miku", 4);
        assert_eq!(tag.pretty_name, "hatsune miku");
        assert_eq!(tag.name, "hatsune_miku");
    }

    #[test]
    fn test_rating_ladder_orders_blur_threshold() {
        assert!(Rating::Explicit > Rating::Questionable);
        assert!(Rating::Questionable > Rating::Sensitive);
        assert!(Rating::Sensitive > Rating::General);
    }

    #[test]
    fn test_post_deserializes_from_selected_fields() {
        let value = serde_json::json!({
            "id": 123,
            "created_at": "2023-04-01T12:00:00.000-04:00",
            "file_size": 2048,
            "has_visible_children": false,
            "image_height": 900,
            "image_width": 1600,
            "is_flagged": false,
            "is_pending": true,
            "is_deleted": false,
            "parent_id": null,
            "preview_file_url": "https://cdn.example/preview/123.jpg",
            "rating": "q",
            "source": "https://artsite.example/works/1",
            "tag_string": "1girl video_with_sound"
        });
        let post: Post = serde_json::from_value(value).unwrap();
        assert_eq!(post.rating, Rating::Questionable);
        assert!(post.is_pending);
        assert_eq!(post.image_width, 1600);
    }

    #[test]
    fn test_artist_defaults_tolerate_missing_fields() {
        let value = serde_json::json!({"id": 7, "name": "some_artist"});
        let artist: Artist = serde_json::from_value(value).unwrap();
        assert!(!artist.is_banned);
        assert!(artist.urls.is_empty());
        assert_eq!(artist.pretty_name(), "some artist");
    }
}

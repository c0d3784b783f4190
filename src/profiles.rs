//! Prebuilt rule sets for common page shapes.
//!
//! A profile is data, not behavior: a named bundle of
//! [`AnnotationRule`]s the engine runs as-is. The bundles here cover
//! the three shapes the pipeline is usually pointed at; anything more
//! site-specific belongs to the caller.

use thiserror::Error;

use crate::api::normalize::normalize_hashtag;
use crate::engine::{AnnotationRule, LookupMode, Placement, RuleError};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// A named bundle of annotation rules.
pub struct Profile {
    pub name: &'static str,
    pub description: &'static str,
    pub rules: Vec<AnnotationRule>,
}

/// Names accepted by [`named`].
pub const PROFILE_NAMES: [&str; 3] = ["tag-list", "artist-credit", "status-feed"];

/// Look a profile up by name.
pub fn named(name: &str) -> Result<Profile, ProfileError> {
    match name {
        "tag-list" => Ok(tag_list()?),
        "artist-credit" => Ok(artist_credit()?),
        "status-feed" => Ok(status_feed()?),
        other => Err(ProfileError::Unknown(other.to_string())),
    }
}

/// Illustration-site tag sidebars: translate each linked tag, keep the
/// translation alive across in-place list edits.
fn tag_list() -> Result<Profile, ProfileError> {
    let tags = AnnotationRule::builder(LookupMode::Tag, ".tag-list a, a.tag")
        .extractor(hashtag_text)
        .placement(Placement::AfterAnchor)
        .build()?;
    let header = AnnotationRule::builder(LookupMode::Tag, "h1.tag-header")
        .extractor(hashtag_text)
        .placement(Placement::LastChild)
        .classes("inline")
        .watch_for_changes("h1.tag-header")
        .build()?;
    Ok(Profile {
        name: "tag-list",
        description: "tag sidebars and headers on illustration sites",
        rules: vec![tags, header],
    })
}

/// Gallery artist bylines: credit the artist behind a profile link, or
/// by display name when there is no link to resolve.
fn artist_credit() -> Result<Profile, ProfileError> {
    let by_url = AnnotationRule::builder(LookupMode::ArtistByUrl, "a.user-name, a[href*=\"/users/\"]")
        .placement(Placement::AfterParent)
        .build()?;
    let by_name = AnnotationRule::builder(LookupMode::ArtistByName, ".artist-name")
        .placement(Placement::AfterAnchor)
        .classes("inline")
        .build()?;
    Ok(Profile {
        name: "artist-credit",
        description: "artist bylines on gallery pages",
        rules: vec![by_url, by_name],
    })
}

/// Status feeds: hashtags inside post text plus the author link, both
/// re-applied as the feed grows.
fn status_feed() -> Result<Profile, ProfileError> {
    let hashtags = AnnotationRule::builder(LookupMode::Tag, "a[href*=\"/hashtag/\"]")
        .extractor(hashtag_text)
        .placement(Placement::AfterAnchor)
        .classes("inline")
        .build()?;
    let author = AnnotationRule::builder(LookupMode::ArtistByUrl, "article a[rel=\"author\"]")
        .placement(Placement::AfterAnchor)
        .required_attributes(&["href"])
        .build()?;
    Ok(Profile {
        name: "status-feed",
        description: "hashtags and author links in status feeds",
        rules: vec![hashtags, author],
    })
}

/// Element text with celebration-hashtag suffixes stripped.
fn hashtag_text(doc: &crate::dom::Document, node: crate::dom::NodeId) -> Option<String> {
    let text = doc.text_content(node);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize_hashtag(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse::parse_html;

    #[test]
    fn test_every_builtin_profile_constructs() {
        for name in PROFILE_NAMES {
            let profile = named(name).unwrap();
            assert_eq!(profile.name, name);
            assert!(!profile.rules.is_empty(), "{name}");
        }
    }

    #[test]
    fn test_unknown_profile_is_an_error() {
        assert!(matches!(
            named("no-such-profile"),
            Err(ProfileError::Unknown(_))
        ));
    }

    #[test]
    fn test_hashtag_extractor_strips_celebration_suffix() {
        let doc = parse_html("<a>初音ミク生誕祭2024</a>");
        let a = crate::dom::Selector::parse("a")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        assert_eq!(hashtag_text(&doc, a), Some("初音ミク".to_string()));
    }
}

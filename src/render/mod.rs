//! Fragment rendering.
//!
//! Translated tag groups and artist credits are built once per identity
//! as detached templates (cached in a [`FragmentCache`]) and cloned per
//! insertion. The class attribute is stamped on the clone, not the
//! template, because the same results can be inserted with different
//! extra classes at different sites.

use url::Url;

use crate::api::models::{Artist, TranslatedTag};
use crate::cache::FragmentCache;
use crate::dom::Fragment;

/// Class carried by every translated tag group.
pub const TRANSLATED_TAGS_CLASS: &str = "ex-translated-tags";
/// Class carried by every artist credit.
pub const ARTIST_TAG_CLASS: &str = "ex-artist-tag";
/// Extra class on credits for banned artists.
pub const BANNED_ARTIST_CLASS: &str = "ex-banned-artist-tag";
/// Selector matching every annotation this pipeline produces.
pub const ANNOTATION_SELECTOR: &str = ".ex-translated-tags, .ex-artist-tag";

/// Builds and caches annotation fragments for one endpoint.
pub struct Renderer {
    base: Url,
    tag_fragments: FragmentCache,
    artist_fragments: FragmentCache,
}

impl Renderer {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            tag_fragments: FragmentCache::new(),
            artist_fragments: FragmentCache::new(),
        }
    }

    /// Rendered display text of an artist credit.
    pub fn artist_display_name(artist: &Artist) -> String {
        if artist.is_banned {
            format!("{} (banned)", artist.pretty_name())
        } else {
            artist.pretty_name()
        }
    }

    /// A comma-joined group of translated tag links. `None` when there is
    /// nothing to render.
    pub fn tag_group(&self, tags: &[TranslatedTag], extra_classes: &str) -> Option<Fragment> {
        if tags.is_empty() {
            return None;
        }
        let key: String = tags.iter().map(|t| t.name.as_str()).collect();
        let mut fragment = self
            .tag_fragments
            .get_or_build_with(&key, || self.build_tag_group(tags));
        let root = fragment.root();
        fragment.set_attr(
            root,
            "class",
            &compose_classes(TRANSLATED_TAGS_CLASS, extra_classes),
        );
        Some(fragment)
    }

    /// An artist credit linking to the artist page.
    pub fn artist_credit(&self, artist: &Artist, extra_classes: &str) -> Fragment {
        let key = artist.id.to_string();
        let mut fragment = self
            .artist_fragments
            .get_or_build_with(&key, || self.build_artist_credit(artist));
        let root = fragment.root();
        fragment.set_attr(root, "class", &artist_classes(artist, extra_classes));
        fragment
    }

    fn build_tag_group(&self, tags: &[TranslatedTag]) -> Fragment {
        let mut fragment = Fragment::element("span");
        let root = fragment.root();
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                fragment.append_text(root, ", ");
            }
            let anchor = fragment.append_element(root, "a");
            fragment.set_attr(
                anchor,
                "class",
                &format!("ex-translated-tag-category-{}", tag.category),
            );
            fragment.set_attr(anchor, "href", &self.posts_href(&tag.name));
            fragment.set_attr(anchor, "target", "_blank");
            fragment.append_text(anchor, &tag.pretty_name);
        }
        fragment
    }

    fn build_artist_credit(&self, artist: &Artist) -> Fragment {
        let mut fragment = Fragment::element("div");
        let root = fragment.root();
        let anchor = fragment.append_element(root, "a");
        fragment.set_attr(anchor, "href", &self.artist_href(artist.id));
        fragment.set_attr(anchor, "target", "_blank");
        fragment.append_text(anchor, &Self::artist_display_name(artist));
        fragment
    }

    fn posts_href(&self, tag_name: &str) -> String {
        let mut url = self.base.clone();
        url.set_path("/posts");
        url.set_query(None);
        url.query_pairs_mut().append_pair("tags", tag_name);
        url.to_string()
    }

    fn artist_href(&self, id: i64) -> String {
        let mut url = self.base.clone();
        url.set_path(&format!("/artists/{id}"));
        url.set_query(None);
        url.to_string()
    }
}

fn compose_classes(fixed: &str, extra: &str) -> String {
    if extra.trim().is_empty() {
        fixed.to_string()
    } else {
        format!("{fixed} {}", extra.trim())
    }
}

fn artist_classes(artist: &Artist, extra: &str) -> String {
    let mut classes = compose_classes(ARTIST_TAG_CLASS, extra);
    if artist.is_banned {
        classes.push(' ');
        classes.push_str(BANNED_ARTIST_CLASS);
    }
    classes
}

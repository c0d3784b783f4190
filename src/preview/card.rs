//! Hover-card markup.
//!
//! Cards are plain detached fragments: a header with the artist name
//! and tag count, the deduplicated name and URL lists, and one tile per
//! recent post. Presentation state that depends on the page (theme,
//! background) is not baked in here; see [`super::theme`].

use url::Url;

use crate::api::models::{Artist, ArtistUrl, Post, Rating};
use crate::api::posts::status_prefix;
use crate::config::Settings;
use crate::dom::{Fragment, NodeId};
use crate::preview::builder::ArtistPreview;
use crate::preview::format;
use crate::render::Renderer;

/// Renders [`ArtistPreview`] data into card fragments.
pub struct CardRenderer {
    base: Url,
    show_deleted: bool,
    max_unblurred: Rating,
}

impl CardRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            base: settings.base_url.clone(),
            show_deleted: settings.show_deleted,
            max_unblurred: settings.show_preview_rating,
        }
    }

    /// The full card for one artist.
    pub fn artist_card(&self, preview: &ArtistPreview) -> Fragment {
        let artist = &preview.artist;
        let mut fragment = Fragment::element("article");
        let root = fragment.root();
        fragment.add_class(root, "container");

        let header = fragment.append_element(root, "section");
        fragment.add_class(header, "header");
        let name_link = fragment.append_element(header, "a");
        fragment.add_class(name_link, "artist-name");
        fragment.set_attr(name_link, "href", &self.href(&format!("/artists/{}", artist.id)));
        fragment.set_attr(name_link, "target", "_blank");
        fragment.append_text(name_link, &Renderer::artist_display_name(artist));
        let count = fragment.append_element(header, "span");
        fragment.add_class(count, "post-count");
        fragment.append_text(count, &preview.post_count.to_string());
        self.append_other_names(&mut fragment, header, artist);

        self.append_urls(&mut fragment, root, artist);
        self.append_posts(&mut fragment, root, preview);
        fragment
    }

    /// One post tile.
    pub fn post_tile(&self, post: &Post) -> Fragment {
        let mut fragment = Fragment::element("article");
        let root = fragment.root();
        for class in self.tile_classes(post) {
            fragment.add_class(root, class);
        }
        fragment.set_attr(root, "data-id", &post.id.to_string());
        fragment.set_attr(
            root,
            "data-has-sound",
            if format::has_sound(&post.tag_string) {
                "true"
            } else {
                "false"
            },
        );
        fragment.set_attr(root, "data-tags", &post.tag_string);

        let link = fragment.append_element(root, "a");
        fragment.set_attr(link, "href", &self.href(&format!("/posts/{}", post.id)));
        fragment.set_attr(link, "target", "_blank");
        let img = fragment.append_element(link, "img");
        fragment.set_attr(img, "title", &post.tag_string);
        match &post.preview_file_url {
            Some(src) if !src.ends_with("/images/download-preview.png") => {
                let scale = format::scale_to_fit(post.image_width, post.image_height);
                let width = (f64::from(post.image_width) * scale).round() as u32;
                let height = (f64::from(post.image_height) * scale).round() as u32;
                fragment.set_attr(img, "src", src);
                fragment.set_attr(img, "width", &width.to_string());
                fragment.set_attr(img, "height", &height.to_string());
            }
            _ => {
                fragment.set_attr(img, "src", &self.href("/images/download-preview.png"));
                fragment.set_attr(img, "width", "150");
                fragment.set_attr(img, "height", "150");
            }
        }

        let size = fragment.append_element(root, "p");
        fragment.append_text(
            size,
            &format!(
                "{} ({}x{})",
                format::format_bytes(post.file_size),
                post.image_width,
                post.image_height
            ),
        );
        let origin = fragment.append_element(root, "p");
        fragment.append_text(
            origin,
            &format!(
                "{}, rating:{}",
                format::source_domain(&post.source),
                post.rating.as_letter().to_uppercase()
            ),
        );
        let age = fragment.append_element(root, "p");
        fragment.append_text(age, &format::time_ago(post.created_at, chrono::Utc::now()));
        fragment
    }

    fn tile_classes(&self, post: &Post) -> Vec<&'static str> {
        let mut classes = vec!["post-preview"];
        if post.is_pending {
            classes.push("post-status-pending");
        }
        if post.is_flagged {
            classes.push("post-status-flagged");
        }
        if post.is_deleted {
            classes.push("post-status-deleted");
        }
        if post.parent_id.is_some() {
            classes.push("post-status-has-parent");
        }
        if post.has_visible_children {
            classes.push("post-status-has-children");
        }
        if post.rating > self.max_unblurred {
            classes.push("blur-post");
        }
        classes
    }

    fn append_other_names(&self, fragment: &mut Fragment, parent: NodeId, artist: &Artist) {
        let mut names: Vec<&str> = artist
            .other_names
            .iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_unstable();
        names.dedup();

        let list = fragment.append_element(parent, "ul");
        fragment.add_class(list, "other-names");
        for name in names {
            let item = fragment.append_element(list, "li");
            let link = fragment.append_element(item, "a");
            let mut url = self.base.clone();
            url.set_path("/artists");
            url.query_pairs_mut().append_pair("search[name]", name);
            fragment.set_attr(link, "href", url.as_str());
            fragment.set_attr(link, "target", "_blank");
            fragment.append_text(link, &name.replace('_', " "));
        }
    }

    fn append_urls(&self, fragment: &mut Fragment, parent: NodeId, artist: &Artist) {
        let section = fragment.append_element(parent, "section");
        fragment.add_class(section, "urls");
        let heading = fragment.append_element(section, "h2");
        fragment.append_text(heading, "URLs ");
        let edit = fragment.append_element(heading, "a");
        fragment.set_attr(edit, "href", &self.href(&format!("/artists/{}/edit", artist.id)));
        fragment.set_attr(edit, "target", "_blank");
        fragment.append_text(edit, "edit");

        let list = fragment.append_element(section, "ul");
        for entry in ordered_urls(&artist.urls) {
            let display = display_url(entry);
            let item = fragment.append_element(list, "li");
            fragment.add_class(
                item,
                if entry.is_active {
                    "artist-url-active"
                } else {
                    "artist-url-inactive"
                },
            );
            let link = fragment.append_element(item, "a");
            fragment.set_attr(link, "href", &display);
            fragment.set_attr(link, "target", "_blank");
            fragment.append_text(link, &display);
        }
    }

    fn append_posts(&self, fragment: &mut Fragment, parent: NodeId, preview: &ArtistPreview) {
        let section = fragment.append_element(parent, "section");
        fragment.add_class(section, "posts");
        let heading = fragment.append_element(section, "h2");
        fragment.append_text(heading, "Posts ");
        let more = fragment.append_element(heading, "a");
        let mut url = self.base.clone();
        url.set_path("/posts");
        url.query_pairs_mut().append_pair(
            "tags",
            &format!("{} {}", preview.artist.name, status_prefix(self.show_deleted)),
        );
        fragment.set_attr(more, "href", url.as_str());
        fragment.set_attr(more, "target", "_blank");
        fragment.append_text(more, "\u{bb}");

        let grid = fragment.append_element(section, "div");
        fragment.add_class(grid, "post-list");
        for post in &preview.posts {
            let tile = self.post_tile(post);
            let adopted = fragment.doc_mut().adopt(&tile);
            fragment.doc_mut().append_child(grid, adopted);
        }
    }

    fn href(&self, path: &str) -> String {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url.to_string()
    }
}

/// Deduplicate by normalized URL, then order active entries first,
/// grouped by domain, lexicographic inside a group.
fn ordered_urls(urls: &[ArtistUrl]) -> Vec<&ArtistUrl> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<&ArtistUrl> = urls
        .iter()
        .filter(|u| seen.insert(normalized_key(u).to_string()))
        .collect();
    out.sort_by(|a, b| normalized_key(a).cmp(normalized_key(b)));
    out.sort_by_key(|u| url_domain(normalized_key(u)));
    out.sort_by_key(|u| !u.is_active);
    out
}

fn normalized_key(url: &ArtistUrl) -> &str {
    url.normalized_url.as_deref().unwrap_or(&url.url)
}

fn display_url(url: &ArtistUrl) -> String {
    normalized_key(url).trim_end_matches('/').to_string()
}

fn url_domain(url: &str) -> String {
    let host = match Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
        Some(host) => host,
        None => return String::new(),
    };
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

//! Rule execution.
//!
//! [`Engine::apply_rule`] runs one rule over a document: match, filter,
//! extract a key, resolve it remotely, render, dedup against annotations
//! already in place, insert, and report each insertion as an
//! [`Attachment`] so the watcher can register teardown.
//!
//! Application is idempotent. Before inserting, the engine looks at the
//! annotations already sitting where the placement would put one and
//! skips the insert when an equivalent annotation is present. Running
//! the same rule any number of times therefore leaves one annotation
//! per resolved element.

use std::sync::OnceLock;

use tracing::debug;

use crate::api::models::Artist;
use crate::api::ApiClient;
use crate::dom::{Document, Fragment, NodeId, Selector};
use crate::engine::placement::Placement;
use crate::engine::rule::{AnnotationRule, LookupMode};
use crate::render::{Renderer, ANNOTATION_SELECTOR};

pub(crate) fn annotation_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(ANNOTATION_SELECTOR).unwrap())
}

/// One inserted annotation, with everything teardown needs to find it
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// The inserted annotation element.
    pub annotation: NodeId,
    /// The element the rule matched.
    pub anchor: NodeId,
    /// Placement the annotation was inserted with.
    pub placement: Placement,
    /// Node `locate_existing` resolves annotations against on removal.
    pub container: Option<NodeId>,
    /// Element whose text changes tear the annotation down, when the
    /// rule watches for changes. `None` disables teardown.
    pub watch_root: Option<NodeId>,
}

/// Executes annotation rules against documents.
pub struct Engine {
    api: ApiClient,
    renderer: Renderer,
}

impl Engine {
    pub fn new(api: ApiClient) -> Self {
        let renderer = Renderer::new(api.base().clone());
        Self { api, renderer }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Apply `rule` to every element its selector matches.
    pub async fn apply_rule(&self, doc: &mut Document, rule: &AnnotationRule) -> Vec<Attachment> {
        let matches = rule.selector().select_within(doc, doc.root());
        self.apply_rule_to(doc, rule, &matches).await
    }

    /// Apply `rule` to the given elements only. The watcher uses this to
    /// re-run a rule over newly added or changed elements without
    /// rescanning the whole document.
    pub async fn apply_rule_to(
        &self,
        doc: &mut Document,
        rule: &AnnotationRule,
        elements: &[NodeId],
    ) -> Vec<Attachment> {
        let mut attachments = Vec::new();
        for &anchor in elements {
            if !doc.is_attached(anchor) || !rule.predicate.accepts(doc, anchor) {
                continue;
            }
            let Some(key) = rule.extract_key(doc, anchor) else {
                continue;
            };
            match rule.mode() {
                LookupMode::Tag => {
                    if let Some(attachment) = self.annotate_tags(doc, rule, anchor, &key).await {
                        attachments.push(attachment);
                    }
                }
                LookupMode::ArtistByUrl => {
                    let artists = self.api.artists_by_url(&key).await;
                    self.annotate_artists(doc, rule, anchor, &artists, &mut attachments);
                }
                LookupMode::ArtistByName => {
                    let artists = self.api.artists_by_name(&key).await;
                    self.annotate_artists(doc, rule, anchor, &artists, &mut attachments);
                }
            }
        }
        attachments
    }

    async fn annotate_tags(
        &self,
        doc: &mut Document,
        rule: &AnnotationRule,
        anchor: NodeId,
        key: &str,
    ) -> Option<Attachment> {
        let tags = self.api.translate_tag(key).await;
        let fragment = self.renderer.tag_group(&tags, &rule.classes)?;
        let rendered = fragment.text_content();
        let existing = rule
            .placement()
            .locate_existing(doc, anchor, annotation_selector());
        if existing.iter().any(|&n| doc.text_content(n) == rendered) {
            debug!(key, "tag group already present, skipping insert");
            return None;
        }
        let annotation = self.place(doc, rule, anchor, &fragment);
        Some(self.finish(doc, rule, anchor, annotation))
    }

    fn annotate_artists(
        &self,
        doc: &mut Document,
        rule: &AnnotationRule,
        anchor: NodeId,
        artists: &[Artist],
        attachments: &mut Vec<Attachment>,
    ) {
        for artist in artists {
            let display = Renderer::artist_display_name(artist);
            let existing = rule
                .placement()
                .locate_existing(doc, anchor, annotation_selector());
            if let Some(&duplicate) = existing
                .iter()
                .find(|&&n| doc.text_content(n).trim() == display)
            {
                // An equivalent credit is already in place. Refresh its
                // binding and re-run the hook so hover cards and similar
                // attachments come back after a partial page rebuild.
                self.bind_artist(doc, duplicate, artist);
                if let Some(hook) = &rule.on_attached {
                    hook(doc, duplicate);
                }
                debug!(artist = %artist.name, "artist credit already present, rebinding");
                continue;
            }

            let fragment = self.renderer.artist_credit(artist, &rule.classes);
            let annotation = self.place(doc, rule, anchor, &fragment);
            self.bind_artist(doc, annotation, artist);
            attachments.push(self.finish(doc, rule, anchor, annotation));
        }
    }

    fn bind_artist(&self, doc: &mut Document, annotation: NodeId, artist: &Artist) {
        doc.set_attr(annotation, "data-artist-id", &artist.id.to_string());
        doc.set_attr(annotation, "data-artist-name", &artist.name);
    }

    fn place(
        &self,
        doc: &mut Document,
        rule: &AnnotationRule,
        anchor: NodeId,
        fragment: &Fragment,
    ) -> NodeId {
        let annotation = doc.adopt(fragment);
        rule.placement().insert(doc, anchor, annotation);
        annotation
    }

    fn finish(
        &self,
        doc: &mut Document,
        rule: &AnnotationRule,
        anchor: NodeId,
        annotation: NodeId,
    ) -> Attachment {
        if let Some(hook) = &rule.on_attached {
            hook(doc, annotation);
        }
        let container = rule.placement().container_of(doc, annotation);
        let watch_root = match (rule.watch_for_changes(), container) {
            (Some(sel), Some(c)) => sel.select_within(doc, c).first().copied(),
            _ => None,
        };
        Attachment {
            annotation,
            anchor,
            placement: rule.placement(),
            container,
            watch_root,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::registry::NetworkRegistry;
    use crate::client::{ClientConfig, RateLimitedClient};
    use crate::dom::parse::parse_html;

    fn engine_for(server: &MockServer) -> Engine {
        let config = ClientConfig::default();
        let client =
            RateLimitedClient::new(Arc::new(NetworkRegistry::new(&config)), config);
        let api = ApiClient::new(Url::parse(&server.uri()).unwrap(), 0, client);
        Engine::new(api)
    }

    async fn mock_wiki_alias(server: &MockServer, other_name: &str, title: &str, category: u8) {
        Mock::given(method("GET"))
            .and(path("/wiki_pages.json"))
            .and(query_param("search[other_names_match]", other_name))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"title": title, "category_name": category}
            ])))
            .mount(server)
            .await;
    }

    async fn mock_artist_by_url(server: &MockServer, url: &str, artist: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/artists.json"))
            .and(query_param("search[url_matches]", url))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([artist])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_tag_rule_inserts_group_once() {
        let server = MockServer::start().await;
        mock_wiki_alias(&server, "初音ミク", "hatsune_miku", 4).await;
        let engine = engine_for(&server);
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag")
            .build()
            .unwrap();

        let mut doc = parse_html(r#"<span class="tag">初音ミク</span>"#);
        let attachments = engine.apply_rule(&mut doc, &rule).await;
        assert_eq!(attachments.len(), 1);
        let html = doc.to_html(doc.root());
        assert!(html.contains("ex-translated-tags"));
        assert!(html.contains("hatsune miku"));

        // Re-running is a no-op.
        let again = engine.apply_rule(&mut doc, &rule).await;
        assert!(again.is_empty());
        assert_eq!(doc.to_html(doc.root()), html);
    }

    #[tokio::test]
    async fn test_untranslatable_tag_inserts_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let engine = engine_for(&server);
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag")
            .build()
            .unwrap();

        let mut doc = parse_html(r#"<span class="tag">no_such_tag</span>"#);
        let attachments = engine.apply_rule(&mut doc, &rule).await;
        assert!(attachments.is_empty());
        assert!(!doc.to_html(doc.root()).contains("ex-translated-tags"));
    }

    #[tokio::test]
    async fn test_artist_rule_inserts_credit_and_rebinds_duplicate() {
        let server = MockServer::start().await;
        mock_artist_by_url(
            &server,
            "https://art.example/u/9",
            json!({"id": 9, "name": "some_artist", "is_banned": false,
                   "other_names": [], "urls": []}),
        )
        .await;
        let engine = engine_for(&server);
        let rule = AnnotationRule::builder(LookupMode::ArtistByUrl, ".artist a")
            .build()
            .unwrap();

        let mut doc =
            parse_html(r#"<div class="artist"><a href="https://art.example/u/9">x</a></div>"#);
        let attachments = engine.apply_rule(&mut doc, &rule).await;
        assert_eq!(attachments.len(), 1);
        let annotation = attachments[0].annotation;
        assert_eq!(
            doc.element(annotation).unwrap().attr("data-artist-id"),
            Some("9")
        );
        assert!(doc.to_html(doc.root()).contains("some artist"));

        // A second pass finds the duplicate and inserts nothing new.
        let again = engine.apply_rule(&mut doc, &rule).await;
        assert!(again.is_empty());
        assert_eq!(
            annotation_selector()
                .select_within(&doc, doc.root())
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_rebind_reruns_hook() {
        let server = MockServer::start().await;
        mock_artist_by_url(
            &server,
            "https://art.example/u/9",
            json!({"id": 9, "name": "some_artist", "is_banned": false,
                   "other_names": [], "urls": []}),
        )
        .await;
        let engine = engine_for(&server);
        let hooked = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hooked.clone();
        let rule = AnnotationRule::builder(LookupMode::ArtistByUrl, ".artist a")
            .on_attached(move |_, _| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let mut doc =
            parse_html(r#"<div class="artist"><a href="https://art.example/u/9">x</a></div>"#);
        engine.apply_rule(&mut doc, &rule).await;
        engine.apply_rule(&mut doc, &rule).await;
        assert_eq!(hooked.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_predicate_rejects_elements() {
        let server = MockServer::start().await;
        let engine = engine_for(&server);
        let rule = AnnotationRule::builder(LookupMode::Tag, "span")
            .predicate(|_, _| false)
            .build()
            .unwrap();

        let mut doc = parse_html("<span>anything</span>");
        let attachments = engine.apply_rule(&mut doc, &rule).await;
        assert!(attachments.is_empty());
        // No predicate pass, no lookup: the mock server saw no requests.
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_target_resolved_from_container() {
        let server = MockServer::start().await;
        mock_wiki_alias(&server, "初音ミク", "hatsune_miku", 4).await;
        let engine = engine_for(&server);
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag .name")
            .placement(Placement::AfterParent)
            .watch_for_changes(".name")
            .build()
            .unwrap();

        let mut doc =
            parse_html(r#"<div><a class="tag"><span class="name">初音ミク</span></a></div>"#);
        let attachments = engine.apply_rule(&mut doc, &rule).await;
        assert_eq!(attachments.len(), 1);
        let name = Selector::parse(".name")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        let link = Selector::parse(".tag")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        // Teardown recovers the anchor link from the inserted annotation
        // and watches the name element inside it.
        assert_eq!(attachments[0].container, Some(link));
        assert_eq!(attachments[0].watch_root, Some(name));
    }
}

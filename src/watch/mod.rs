//! Dynamic content watching.
//!
//! Two concerns share the mutation bus:
//!
//! - **Rule watches.** A watched rule re-runs whenever elements matching
//!   its selector enter the document or one of its required attributes
//!   changes on a match. Idempotent application makes the re-run safe
//!   even when the same element is reported more than once.
//! - **One-shot teardown.** An attachment whose rule watches for changes
//!   registers the element whose text it observes. The first text change
//!   inside that element removes the annotations at the attachment's
//!   position and drops the registration, whether or not the removal
//!   found anything.
//!
//! The watcher is pump-driven: the caller commits document mutations to
//! the bus and calls [`Watcher::process_pending`], which drains queued
//! batches and reacts. Mutations produced by the reaction are committed
//! back before returning, so a caller looping on `process_pending`
//! settles once nothing new happens.

use tracing::debug;

use crate::dom::{Document, MutationBus, NodeId, Subscription};
use crate::engine::apply::annotation_selector;
use crate::engine::{AnnotationRule, Attachment, Engine, Placement};

/// Reacts to document mutations: re-applies watched rules and tears
/// down annotations whose watched text changed.
pub struct Watcher {
    bus: MutationBus,
    rules: Vec<RuleWatch>,
    teardown_rx: Subscription,
    teardowns: Vec<Teardown>,
}

struct RuleWatch {
    rule: AnnotationRule,
    sub: Subscription,
}

/// One-shot removal registration for a single attachment.
#[derive(Debug, Clone, Copy)]
struct Teardown {
    placement: Placement,
    container: NodeId,
    watch_root: NodeId,
}

impl Watcher {
    pub fn new(bus: MutationBus) -> Self {
        let teardown_rx = bus.subscribe(annotation_selector().clone(), &[]);
        Self {
            bus,
            rules: Vec::new(),
            teardown_rx,
            teardowns: Vec::new(),
        }
    }

    pub fn bus(&self) -> &MutationBus {
        &self.bus
    }

    /// Number of teardown registrations still armed.
    pub fn pending_teardowns(&self) -> usize {
        self.teardowns.len()
    }

    /// Re-run `rule` on every future match added to the document and on
    /// every required-attribute change.
    pub fn watch_rule(&mut self, rule: AnnotationRule) {
        let attrs: Vec<&str> = rule
            .required_attributes()
            .iter()
            .map(String::as_str)
            .collect();
        let sub = self.bus.subscribe(rule.selector().clone(), &attrs);
        self.rules.push(RuleWatch { rule, sub });
    }

    /// Arm one-shot teardown for every attachment that carries a watch
    /// target.
    pub fn register(&mut self, attachments: &[Attachment]) {
        for a in attachments {
            if let (Some(container), Some(watch_root)) = (a.container, a.watch_root) {
                self.teardowns.push(Teardown {
                    placement: a.placement,
                    container,
                    watch_root,
                });
            }
        }
    }

    /// Apply `rule` to the current document, arm teardowns for its
    /// attachments, and keep watching for future matches.
    pub async fn apply_and_watch(
        &mut self,
        doc: &mut Document,
        engine: &Engine,
        rule: AnnotationRule,
    ) -> Vec<Attachment> {
        let attachments = engine.apply_rule(doc, &rule).await;
        self.register(&attachments);
        self.watch_rule(rule);
        doc.commit(&self.bus);
        attachments
    }

    /// Drain every queued mutation batch and react. Returns how many
    /// annotations were inserted plus how many were torn down.
    pub async fn process_pending(&mut self, doc: &mut Document, engine: &Engine) -> usize {
        let mut actions = 0;

        let mut targets: Vec<(usize, Vec<NodeId>)> = Vec::new();
        for (i, watch) in self.rules.iter_mut().enumerate() {
            let batch = watch.sub.drain(doc);
            let mut nodes = batch.added;
            nodes.extend(batch.attr_changed);
            nodes.sort();
            nodes.dedup();
            if !nodes.is_empty() {
                targets.push((i, nodes));
            }
        }
        for (i, nodes) in targets {
            let rule = self.rules[i].rule.clone();
            let attachments = engine.apply_rule_to(doc, &rule, &nodes).await;
            actions += attachments.len();
            self.register(&attachments);
        }

        let changed = self.teardown_rx.drain(doc).text_changed;
        if !changed.is_empty() {
            actions += self.fire_teardowns(doc, &changed);
        }

        doc.commit(&self.bus);
        actions
    }

    fn fire_teardowns(&mut self, doc: &mut Document, changed: &[NodeId]) -> usize {
        let mut removed = 0;
        let armed = std::mem::take(&mut self.teardowns);
        for td in armed {
            let triggered = changed
                .iter()
                .any(|&n| n == td.watch_root || doc.ancestors(n).contains(&td.watch_root));
            if !triggered {
                self.teardowns.push(td);
                continue;
            }
            let found = td
                .placement
                .locate_existing(doc, td.container, annotation_selector());
            debug!(count = found.len(), "text changed, removing annotations");
            for n in found {
                doc.detach(n);
                removed += 1;
            }
        }
        removed
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
    use crate::api::ApiClient;
    use crate::client::registry::NetworkRegistry;
    use crate::client::{ClientConfig, RateLimitedClient};
    use crate::dom::parse::parse_html;
    use crate::dom::Selector;
    use crate::engine::LookupMode;

    fn engine_for(server: &MockServer) -> Engine {
        let config = ClientConfig::default();
        let client = RateLimitedClient::new(Arc::new(NetworkRegistry::new(&config)), config);
        let api = ApiClient::new(Url::parse(&server.uri()).unwrap(), 0, client);
        Engine::new(api)
    }

    async fn mock_wiki_alias(server: &MockServer, other_name: &str, title: &str) {
        Mock::given(method("GET"))
            .and(path("/wiki_pages.json"))
            .and(query_param("search[other_names_match]", other_name))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"title": title, "category_name": 4}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_added_element_gets_annotated() {
        let server = MockServer::start().await;
        mock_wiki_alias(&server, "初音ミク", "hatsune_miku").await;
        let engine = engine_for(&server);
        let mut watcher = Watcher::new(MutationBus::default());
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag")
            .build()
            .unwrap();

        let mut doc = parse_html("<ul></ul>");
        watcher.apply_and_watch(&mut doc, &engine, rule).await;

        let ul = Selector::parse("ul").unwrap().select_within(&doc, doc.root())[0];
        let tag = doc.create_element("span");
        doc.add_class(tag, "tag");
        let text = doc.create_text("初音ミク");
        doc.append_child(tag, text);
        doc.append_child(ul, tag);
        doc.commit(watcher.bus());

        let actions = watcher.process_pending(&mut doc, &engine).await;
        assert_eq!(actions, 1);
        assert!(doc.to_html(doc.root()).contains("ex-translated-tags"));

        // Nothing further queued: the loop settles.
        assert_eq!(watcher.process_pending(&mut doc, &engine).await, 0);
    }

    #[tokio::test]
    async fn test_attribute_change_retriggers_rule() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artists.json"))
            .and(query_param("search[url_matches]", "https://art.example/u/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 9, "name": "some_artist", "is_banned": false,
                 "other_names": [], "urls": []}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let engine = engine_for(&server);
        let mut watcher = Watcher::new(MutationBus::default());
        let rule = AnnotationRule::builder(LookupMode::ArtistByUrl, "a.profile")
            .required_attributes(&["href"])
            .build()
            .unwrap();

        let mut doc = parse_html(r#"<a class="profile" href="https://art.example/u/0">x</a>"#);
        watcher.apply_and_watch(&mut doc, &engine, rule).await;
        assert!(!doc.to_html(doc.root()).contains("ex-artist-tag"));

        let a = Selector::parse("a.profile")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        doc.set_attr(a, "href", "https://art.example/u/9");
        doc.commit(watcher.bus());

        let actions = watcher.process_pending(&mut doc, &engine).await;
        assert_eq!(actions, 1);
        assert!(doc.to_html(doc.root()).contains("some artist"));
    }

    #[tokio::test]
    async fn test_text_change_tears_annotation_down_once() {
        let server = MockServer::start().await;
        mock_wiki_alias(&server, "初音ミク", "hatsune_miku").await;
        let engine = engine_for(&server);
        let mut watcher = Watcher::new(MutationBus::default());
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag")
            .watch_for_changes(".tag")
            .placement(Placement::AfterAnchor)
            .build()
            .unwrap();

        let mut doc = parse_html(r#"<span class="tag">初音ミク</span>"#);
        let attachments = watcher.apply_and_watch(&mut doc, &engine, rule).await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(watcher.pending_teardowns(), 1);
        // The inserted annotation shows up on the bus as an addition; the
        // watcher must not treat its own output as a trigger.
        watcher.process_pending(&mut doc, &engine).await;
        assert_eq!(watcher.pending_teardowns(), 1);

        let tag = Selector::parse(".tag")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        let text = doc.first_child(tag).unwrap();
        doc.set_text(text, "鏡音リン");
        doc.commit(watcher.bus());

        let actions = watcher.process_pending(&mut doc, &engine).await;
        assert!(actions >= 1);
        assert!(!doc.to_html(doc.root()).contains("ex-translated-tags"));
        // One-shot: the registration is gone.
        assert_eq!(watcher.pending_teardowns(), 0);
    }

    #[tokio::test]
    async fn test_teardown_ignores_unrelated_text_changes() {
        let server = MockServer::start().await;
        mock_wiki_alias(&server, "初音ミク", "hatsune_miku").await;
        let engine = engine_for(&server);
        let mut watcher = Watcher::new(MutationBus::default());
        let rule = AnnotationRule::builder(LookupMode::Tag, ".tag")
            .watch_for_changes(".tag")
            .build()
            .unwrap();

        let mut doc = parse_html(r#"<span class="tag">初音ミク</span><p>caption</p>"#);
        watcher.apply_and_watch(&mut doc, &engine, rule).await;
        assert_eq!(watcher.pending_teardowns(), 1);

        let p = Selector::parse("p").unwrap().select_within(&doc, doc.root())[0];
        let text = doc.first_child(p).unwrap();
        doc.set_text(text, "edited");
        doc.commit(watcher.bus());

        watcher.process_pending(&mut doc, &engine).await;
        assert!(doc.to_html(doc.root()).contains("ex-translated-tags"));
        assert_eq!(watcher.pending_teardowns(), 1);
    }
}

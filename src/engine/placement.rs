//! Placement strategies.
//!
//! Each strategy is a consistent triple:
//!
//! - `insert` puts an annotation at the strategy's position relative to
//!   the matched anchor,
//! - `locate_existing` finds exactly the annotations `insert` would have
//!   put there,
//! - `container_of` walks back from an inserted annotation to the node
//!   whose text the one-shot teardown watcher should observe.
//!
//! Breaking any leg of the triple breaks idempotence or teardown, so the
//! unit tests pin all three per strategy.

use crate::dom::{Document, NodeId, Selector};

/// Where an annotation lands relative to its anchor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Immediately before the anchor, as a preceding sibling.
    BeforeAnchor,
    /// As the anchor's first child.
    FirstChild,
    /// As the anchor's last child.
    LastChild,
    /// Immediately after the anchor, as a following sibling.
    AfterAnchor,
    /// Immediately after the anchor's parent.
    AfterParent,
}

impl Placement {
    /// Insert `node` at this placement's position relative to `anchor`.
    pub fn insert(&self, doc: &mut Document, anchor: NodeId, node: NodeId) {
        match self {
            Placement::BeforeAnchor => doc.insert_before(anchor, node),
            Placement::FirstChild => doc.prepend_child(anchor, node),
            Placement::LastChild => doc.append_child(anchor, node),
            Placement::AfterAnchor => doc.insert_after(anchor, node),
            Placement::AfterParent => {
                if let Some(parent) = doc.parent(anchor) {
                    doc.insert_after(parent, node);
                }
            }
        }
    }

    /// Annotations already sitting where `insert` would put one for
    /// `anchor`, judged by `annotation` (the selector matching every
    /// annotation the pipeline produces).
    pub fn locate_existing(
        &self,
        doc: &Document,
        anchor: NodeId,
        annotation: &Selector,
    ) -> Vec<NodeId> {
        match self {
            Placement::BeforeAnchor => siblings_before(doc, anchor)
                .into_iter()
                .filter(|&n| annotation.matches(doc, n))
                .collect(),
            Placement::FirstChild | Placement::LastChild => doc
                .children(anchor)
                .iter()
                .flat_map(|&c| annotation.select_within(doc, c))
                .collect(),
            Placement::AfterAnchor => siblings_after(doc, anchor)
                .into_iter()
                .filter(|&n| annotation.matches(doc, n))
                .collect(),
            Placement::AfterParent => match doc.parent(anchor) {
                Some(parent) => siblings_after(doc, parent)
                    .into_iter()
                    .filter(|&n| annotation.matches(doc, n))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// The node whose text mutations teardown should observe, recovered
    /// from an inserted annotation. Inverse of `insert`: it walks back to
    /// the anchor (or, for [`Placement::AfterParent`], down to the anchor
    /// link inside the previous sibling).
    pub fn container_of(&self, doc: &Document, annotation: NodeId) -> Option<NodeId> {
        match self {
            Placement::BeforeAnchor => doc.next_sibling(annotation),
            Placement::FirstChild | Placement::LastChild => doc.parent(annotation),
            Placement::AfterAnchor => doc.prev_sibling(annotation),
            Placement::AfterParent => {
                let prev = doc.prev_sibling(annotation)?;
                anchor_link(doc, prev)
            }
        }
    }
}

fn siblings_before(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = doc.prev_sibling(node);
    while let Some(n) = cur {
        out.push(n);
        cur = doc.prev_sibling(n);
    }
    out
}

fn siblings_after(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = doc.next_sibling(node);
    while let Some(n) = cur {
        out.push(n);
        cur = doc.next_sibling(n);
    }
    out
}

fn anchor_link(doc: &Document, root: NodeId) -> Option<NodeId> {
    doc.descendants(root)
        .into_iter()
        .find(|&n| doc.element(n).map(|el| el.tag == "a").unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse::parse_html;
    use crate::render::ANNOTATION_SELECTOR;

    fn setup() -> (Document, NodeId) {
        let doc = parse_html(r#"<div><p><a id="anchor" href="/u/1">name</a></p></div>"#);
        let anchor = Selector::parse("#anchor")
            .unwrap()
            .select_within(&doc, doc.root())[0];
        (doc, anchor)
    }

    fn annotation_selector() -> Selector {
        Selector::parse(ANNOTATION_SELECTOR).unwrap()
    }

    fn make_annotation(doc: &mut Document) -> NodeId {
        let span = doc.create_element("span");
        doc.add_class(span, "ex-translated-tags");
        span
    }

    #[test]
    fn test_triples_are_mutually_consistent() {
        let sel = annotation_selector();
        for placement in [
            Placement::BeforeAnchor,
            Placement::FirstChild,
            Placement::LastChild,
            Placement::AfterAnchor,
            Placement::AfterParent,
        ] {
            let (mut doc, anchor) = setup();
            assert!(placement.locate_existing(&doc, anchor, &sel).is_empty());

            let span = make_annotation(&mut doc);
            placement.insert(&mut doc, anchor, span);

            // locate_existing finds exactly what insert produced.
            assert_eq!(
                placement.locate_existing(&doc, anchor, &sel),
                vec![span],
                "{placement:?}"
            );
            // container_of leads back to a node inside the page, not the
            // annotation itself.
            let container = placement.container_of(&doc, span).unwrap();
            assert_ne!(container, span, "{placement:?}");
        }
    }

    #[test]
    fn test_positions_match_their_names() {
        let (mut doc, anchor) = setup();
        let before = make_annotation(&mut doc);
        Placement::BeforeAnchor.insert(&mut doc, anchor, before);
        assert_eq!(doc.next_sibling(before), Some(anchor));

        let after = make_annotation(&mut doc);
        Placement::AfterAnchor.insert(&mut doc, anchor, after);
        assert_eq!(doc.prev_sibling(after), Some(anchor));

        let first = make_annotation(&mut doc);
        Placement::FirstChild.insert(&mut doc, anchor, first);
        assert_eq!(doc.first_child(anchor), Some(first));

        let last = make_annotation(&mut doc);
        Placement::LastChild.insert(&mut doc, anchor, last);
        assert_eq!(doc.children(anchor).last().copied(), Some(last));

        let after_parent = make_annotation(&mut doc);
        Placement::AfterParent.insert(&mut doc, anchor, after_parent);
        let parent = doc.parent(anchor).unwrap();
        assert_eq!(doc.prev_sibling(after_parent), Some(parent));
    }

    #[test]
    fn test_after_parent_container_descends_to_anchor_link() {
        let (mut doc, anchor) = setup();
        let span = make_annotation(&mut doc);
        Placement::AfterParent.insert(&mut doc, anchor, span);
        let container = Placement::AfterParent.container_of(&doc, span).unwrap();
        assert_eq!(container, anchor);
    }

    #[test]
    fn test_locate_existing_ignores_unrelated_siblings() {
        let (mut doc, anchor) = setup();
        let plain = doc.create_element("span");
        doc.insert_after(anchor, plain);
        let sel = annotation_selector();
        assert!(Placement::AfterAnchor
            .locate_existing(&doc, anchor, &sel)
            .is_empty());
    }
}

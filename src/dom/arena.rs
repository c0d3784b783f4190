//! Arena-backed document tree.
//!
//! ## Shape
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Slots
//! are never freed; a detached subtree simply becomes unreachable from the
//! root. Every structural or attribute mutation made through the `Document`
//! API is appended to an internal log, drained by [`Document::take_mutations`]
//! (or broadcast via [`Document::commit`]).
//!
//! ## Fragments
//!
//! A [`Fragment`] is a small detached document used as a template. Inserting
//! one into a page goes through [`Document::adopt`], which deep-copies the
//! template so later edits to the inserted copy never leak back into it.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::dom::mutation::{Mutation, MutationBus};

/// Handle to a node inside a [`Document`] arena.
///
/// Ids are only meaningful for the document that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Payload of a node: an element with attributes, or a text run.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

/// Tag name plus attribute map of an element node.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    attrs: BTreeMap<String, String>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Mutable document tree with a mutation log.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    pending: Vec<Mutation>,
}

impl Document {
    /// Empty document with an `html` root element.
    pub fn new() -> Self {
        Self::with_root("html")
    }

    /// Empty document rooted at an element with the given tag.
    pub fn with_root(tag: &str) -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(ElementData::new(tag)),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Node construction ────────────────────────────────────────────────

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    fn sibling_index(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let idx = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, idx))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.sibling_index(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.sibling_index(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors of `id`, nearest first, root last.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// Preorder traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            for &c in self.children(n).iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// Concatenated text of all text nodes under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let NodeData::Text(t) = self.data(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).last() == Some(&self.root)
    }

    // ── Structural mutation ──────────────────────────────────────────────

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach_quiet(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record_added(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach_quiet(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
        self.record_added(child);
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        let (parent, idx) = match self.sibling_index(anchor) {
            Some(pi) => pi,
            None => return,
        };
        self.detach_quiet(node);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(idx, node);
        self.record_added(node);
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let (parent, idx) = match self.sibling_index(anchor) {
            Some(pi) => pi,
            None => return,
        };
        self.detach_quiet(node);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(idx + 1, node);
        self.record_added(node);
    }

    /// Detach `id` from its parent. The slot is not reclaimed.
    pub fn detach(&mut self, id: NodeId) {
        self.detach_quiet(id);
    }

    fn detach_quiet(&mut self, id: NodeId) {
        if let Some((parent, idx)) = self.sibling_index(id) {
            self.nodes[parent.0].children.remove(idx);
            self.nodes[id.0].parent = None;
        }
    }

    fn record_added(&mut self, id: NodeId) {
        if self.is_attached(id) {
            self.pending.push(Mutation::Added(id));
        }
    }

    // ── Attribute and text mutation ──────────────────────────────────────

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            el.attrs.insert(name.to_string(), value.to_string());
            self.pending.push(Mutation::AttrChanged {
                node: id,
                attr: name.to_string(),
            });
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let joined = match self.element(id) {
            Some(el) if el.has_class(class) => return,
            Some(el) => match el.attr("class") {
                Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
                _ => class.to_string(),
            },
            None => return,
        };
        self.set_attr(id, "class", &joined);
    }

    /// Replace the content of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(t) = &mut self.nodes[id.0].data {
            *t = text.to_string();
            self.pending.push(Mutation::TextChanged { node: id });
        }
    }

    // ── Mutation log ─────────────────────────────────────────────────────

    /// Drain the pending mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.pending)
    }

    /// Drain the pending mutation log and broadcast it on `bus`.
    pub fn commit(&mut self, bus: &MutationBus) {
        let mutations = self.take_mutations();
        if !mutations.is_empty() {
            bus.publish(mutations);
        }
    }

    // ── Copying ──────────────────────────────────────────────────────────

    /// Deep-copy a subtree from `src` into this document, returning the
    /// detached root of the copy.
    pub fn adopt_from(&mut self, src: &Document, src_id: NodeId) -> NodeId {
        let copied = match src.data(src_id) {
            NodeData::Element(el) => {
                let id = self.create_element(&el.tag);
                if let NodeData::Element(dst) = &mut self.nodes[id.0].data {
                    dst.attrs = el.attrs.clone();
                }
                id
            }
            NodeData::Text(t) => {
                let t = t.clone();
                self.create_text(&t)
            }
        };
        for &child in src.children(src_id) {
            let c = self.adopt_from(src, child);
            self.nodes[c.0].parent = Some(copied);
            self.nodes[copied.0].children.push(c);
        }
        copied
    }

    /// Deep-copy a fragment template into this document (detached).
    pub fn adopt(&mut self, fragment: &Fragment) -> NodeId {
        self.adopt_from(&fragment.doc, fragment.root)
    }

    // ── Serialization ────────────────────────────────────────────────────

    /// Serialize the subtree rooted at `id` to HTML.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Text(t) => out.push_str(&escape_text(t)),
            NodeData::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                for (k, v) in el.attrs() {
                    let _ = write!(out, " {}=\"{}\"", k, escape_attr(v));
                }
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &c in self.children(id) {
                    self.write_html(c, out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Detached template tree, cloned on every insertion.
#[derive(Debug, Clone)]
pub struct Fragment {
    doc: Document,
    root: NodeId,
}

impl Fragment {
    /// Start a fragment rooted at an element with the given tag.
    pub fn element(tag: &str) -> Self {
        let doc = Document::with_root(tag);
        let root = doc.root();
        Self { doc, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Append a child element under `parent`, returning its id.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.doc.create_element(tag);
        self.doc.append_child(parent, id);
        id
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.doc.create_text(text);
        self.doc.append_child(parent, id);
        id
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.doc.set_attr(id, name, value);
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        self.doc.add_class(id, class);
    }

    pub fn text_content(&self) -> String {
        self.doc.text_content(self.root)
    }

    pub fn to_html(&self) -> String {
        self.doc.to_html(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_serialize() {
        let mut doc = Document::new();
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body);
        let p = doc.create_element("p");
        doc.append_child(body, p);
        let t = doc.create_text("hello & <world>");
        doc.append_child(p, t);

        assert_eq!(doc.text_content(doc.root()), "hello & <world>");
        assert_eq!(
            doc.to_html(body),
            "<body><p>hello &amp; &lt;world&gt;</p></body>"
        );
    }

    #[test]
    fn test_sibling_insertion_order() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(doc.root(), b);
        doc.insert_before(b, a);
        doc.insert_after(b, c);

        let tags: Vec<_> = doc
            .children(doc.root())
            .iter()
            .map(|&n| doc.element(n).unwrap().tag.clone())
            .collect();
        assert_eq!(tags, ["a", "b", "c"]);
        assert_eq!(doc.prev_sibling(b), Some(a));
        assert_eq!(doc.next_sibling(b), Some(c));
    }

    #[test]
    fn test_detach_removes_from_parent() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        doc.append_child(doc.root(), a);
        assert!(doc.is_attached(a));

        doc.detach(a);
        assert!(!doc.is_attached(a));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_class_helpers() {
        let mut doc = Document::new();
        let a = doc.create_element("span");
        doc.append_child(doc.root(), a);
        doc.add_class(a, "one");
        doc.add_class(a, "two");
        doc.add_class(a, "one"); // no duplicate

        let el = doc.element(a).unwrap();
        assert_eq!(el.attr("class"), Some("one two"));
        assert!(el.has_class("two"));
        assert!(!el.has_class("three"));
    }

    #[test]
    fn test_mutation_log_records_attach_attr_text() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        let text = doc.create_text("x");
        doc.append_child(span, text); // detached, not logged
        doc.take_mutations();

        doc.append_child(doc.root(), span);
        doc.set_attr(span, "data-k", "v");
        doc.set_text(text, "y");

        let muts = doc.take_mutations();
        assert_eq!(muts.len(), 3);
        assert!(matches!(muts[0], Mutation::Added(id) if id == span));
        assert!(matches!(&muts[1], Mutation::AttrChanged { node, attr } if *node == span && attr == "data-k"));
        assert!(matches!(muts[2], Mutation::TextChanged { node } if node == text));
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_fragment_clone_independence() {
        let mut frag = Fragment::element("span");
        frag.add_class(frag.root(), "note");
        let root = frag.root();
        frag.append_text(root, "template");

        let mut doc = Document::new();
        let first = doc.adopt(&frag);
        let second = doc.adopt(&frag);
        doc.append_child(doc.root(), first);
        doc.append_child(doc.root(), second);

        // Mutating one inserted copy leaves the template and siblings alone.
        doc.add_class(first, "mutated");
        assert!(doc.element(first).unwrap().has_class("mutated"));
        assert!(!doc.element(second).unwrap().has_class("mutated"));
        assert!(!frag.doc().element(frag.root()).unwrap().has_class("mutated"));
    }
}

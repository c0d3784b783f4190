//! HTML ingestion.
//!
//! `scraper` does the actual parsing (html5ever under the hood); the parse
//! tree is then copied into a mutable arena [`Document`]. Comments,
//! doctypes and processing instructions are dropped on the way in.

use scraper::{Html, Node};

use crate::dom::arena::{Document, NodeId};

/// Parse an HTML document into a mutable arena.
///
/// The returned document starts with an empty mutation log; ingestion
/// itself is not a mutation.
pub fn parse_html(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();
    let root = doc.root();

    for child in parsed.tree.root().children() {
        if let Node::Element(el) = child.value() {
            if el.name() == "html" {
                for (name, value) in el.attrs() {
                    doc.set_attr(root, name, value);
                }
                for grandchild in child.children() {
                    convert(&mut doc, root, grandchild);
                }
                continue;
            }
        }
        convert(&mut doc, root, child);
    }

    doc.take_mutations();
    doc
}

fn convert(doc: &mut Document, parent: NodeId, node: ego_tree::NodeRef<'_, Node>) {
    match node.value() {
        Node::Element(el) => {
            let id = doc.create_element(el.name());
            for (name, value) in el.attrs() {
                doc.set_attr(id, name, value);
            }
            doc.append_child(parent, id);
            for child in node.children() {
                convert(doc, id, child);
            }
        }
        Node::Text(t) => {
            let id = doc.create_text(&t.text);
            doc.append_child(parent, id);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::select::Selector;

    #[test]
    fn test_parse_preserves_structure_and_attrs() {
        let doc = parse_html(
            r#"<div class="outer"><p id="intro">Hi <b>there</b></p><!-- gone --></div>"#,
        );
        let sel = Selector::parse("#intro").unwrap();
        let p = sel.select_within(&doc, doc.root());
        assert_eq!(p.len(), 1);
        assert_eq!(doc.text_content(p[0]), "Hi there");

        let outer = Selector::parse("div.outer")
            .unwrap()
            .select_within(&doc, doc.root());
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_parse_starts_with_clean_mutation_log() {
        let mut doc = parse_html("<p>x</p>");
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        let doc = parse_html("<!DOCTYPE html><!-- c --><p>only</p>");
        assert_eq!(doc.text_content(doc.root()).trim(), "only");
    }
}

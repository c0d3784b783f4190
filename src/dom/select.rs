//! Selector matching over the document arena.
//!
//! `scraper` selectors only evaluate against its own immutable parse tree,
//! so matching against the mutable arena uses this small engine instead. The
//! grammar covers what annotation rules actually write:
//!
//! - type, `*`, `#id`, `.class`
//! - `[attr]`, `[attr=v]`, `[attr^=v]`, `[attr$=v]`, `[attr*=v]`
//! - `:not(<compound>)`
//! - descendant (space) and child (`>`) combinators
//! - comma-separated alternatives
//!
//! Matching is right-to-left with ancestor backtracking, the usual CSS
//! evaluation order.

use thiserror::Error;

use crate::dom::arena::{Document, ElementData, NodeId};

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character `{ch}` at byte {at} in selector `{selector}`")]
    Unexpected { ch: char, at: usize, selector: String },
    #[error("unclosed `{what}` in selector `{selector}`")]
    Unclosed { what: &'static str, selector: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Contains,
}

#[derive(Debug, Clone)]
enum SimplePart {
    Id(String),
    Class(String),
    Attr {
        name: String,
        op: AttrOp,
        value: String,
    },
    Not(Box<Compound>),
}

/// One element test: optional tag name plus simple parts.
#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    parts: Vec<SimplePart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone)]
struct Step {
    /// Combinator joining this step to the one before it; meaningless on
    /// the first step.
    combinator: Combinator,
    compound: Compound,
}

/// Parsed selector list.
#[derive(Debug, Clone)]
pub struct Selector {
    alternatives: Vec<Vec<Step>>,
    source: String,
}

impl Selector {
    /// Parse a selector list. Fails loudly on syntax errors.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        for part in split_top_level(input) {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(Parser::new(trimmed).parse_complex()?);
        }
        if alternatives.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self {
            alternatives,
            source: input.to_string(),
        })
    }

    /// Original selector text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the element `node` matches this selector.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let el = match doc.element(node) {
            Some(el) => el,
            None => return false,
        };
        self.alternatives
            .iter()
            .any(|steps| matches_steps(doc, node, el, steps))
    }

    /// Matching element descendants of `root` (root included), document
    /// order.
    pub fn select_within(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.descendants(root)
            .into_iter()
            .filter(|&n| self.matches(doc, n))
            .collect()
    }

    /// Nearest ancestor-or-self of `node` matching this selector.
    pub fn closest(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        if self.matches(doc, node) {
            return Some(node);
        }
        doc.ancestors(node).into_iter().find(|&a| self.matches(doc, a))
    }
}

fn matches_steps(doc: &Document, node: NodeId, el: &ElementData, steps: &[Step]) -> bool {
    let (last, rest) = match steps.split_last() {
        Some(split) => split,
        None => return false,
    };
    if !matches_compound(doc, node, el, &last.compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match last.combinator {
        Combinator::Child => match doc.parent(node) {
            Some(p) => match doc.element(p) {
                Some(pel) => matches_steps(doc, p, pel, rest),
                None => false,
            },
            None => false,
        },
        Combinator::Descendant => doc.ancestors(node).into_iter().any(|a| {
            doc.element(a)
                .map(|ael| matches_steps(doc, a, ael, rest))
                .unwrap_or(false)
        }),
    }
}

fn matches_compound(doc: &Document, node: NodeId, el: &ElementData, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if el.tag != *tag {
            return false;
        }
    }
    compound.parts.iter().all(|part| match part {
        SimplePart::Id(id) => el.id() == Some(id.as_str()),
        SimplePart::Class(class) => el.has_class(class),
        SimplePart::Attr { name, op, value } => match el.attr(name) {
            None => false,
            Some(actual) => match op {
                AttrOp::Exists => true,
                AttrOp::Equals => actual == value,
                AttrOp::Prefix => actual.starts_with(value.as_str()),
                AttrOp::Suffix => actual.ends_with(value.as_str()),
                AttrOp::Contains => actual.contains(value.as_str()),
            },
        },
        SimplePart::Not(inner) => !matches_compound(doc, node, el, inner),
    })
}

/// Split on commas that are not inside brackets or parentheses.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in input.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&input[start..]);
    out
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn err_unexpected(&self, ch: char) -> SelectorError {
        SelectorError::Unexpected {
            ch,
            at: self.pos,
            selector: self.input.to_string(),
        }
    }

    fn parse_complex(&mut self) -> Result<Vec<Step>, SelectorError> {
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            if let Some('>') = self.peek() {
                self.bump();
                combinator = Combinator::Child;
                self.skip_whitespace();
            }
            let compound = self.parse_compound()?;
            steps.push(Step {
                combinator,
                compound,
            });
            // A following compound separated only by whitespace is a
            // descendant step.
            combinator = Combinator::Descendant;
        }
        if steps.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(steps)
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(ch) if is_ident_start(ch) => {
                compound.tag = Some(self.parse_ident().to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.parts.push(SimplePart::Id(self.parse_ident()));
                }
                Some('.') => {
                    self.bump();
                    compound.parts.push(SimplePart::Class(self.parse_ident()));
                }
                Some('[') => {
                    self.bump();
                    compound.parts.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.bump();
                    let name = self.parse_ident();
                    if name != "not" {
                        return Err(self.err_unexpected(':'));
                    }
                    if self.bump() != Some('(') {
                        return Err(SelectorError::Unclosed {
                            what: ":not(",
                            selector: self.input.to_string(),
                        });
                    }
                    let inner = self.parse_compound()?;
                    if self.bump() != Some(')') {
                        return Err(SelectorError::Unclosed {
                            what: ":not(",
                            selector: self.input.to_string(),
                        });
                    }
                    compound.parts.push(SimplePart::Not(Box::new(inner)));
                }
                _ => break,
            }
        }
        if compound.tag.is_none() && compound.parts.is_empty() {
            match self.peek() {
                Some(ch) => return Err(self.err_unexpected(ch)),
                None => return Err(SelectorError::Empty),
            }
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<SimplePart, SelectorError> {
        let name = self.parse_ident();
        let op = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(SimplePart::Attr {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => {
                self.bump();
                AttrOp::Equals
            }
            Some(op_ch @ ('^' | '$' | '*')) => {
                self.bump();
                if self.bump() != Some('=') {
                    return Err(self.err_unexpected(op_ch));
                }
                match op_ch {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Contains,
                }
            }
            Some(ch) => return Err(self.err_unexpected(ch)),
            None => {
                return Err(SelectorError::Unclosed {
                    what: "[",
                    selector: self.input.to_string(),
                })
            }
        };
        let value = self.parse_attr_value()?;
        if self.bump() != Some(']') {
            return Err(SelectorError::Unclosed {
                what: "[",
                selector: self.input.to_string(),
            });
        }
        Ok(SimplePart::Attr { name, op, value })
    }

    fn parse_attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch == quote {
                        let value = self.input[start..self.pos].to_string();
                        self.bump();
                        return Ok(value);
                    }
                    self.bump();
                }
                Err(SelectorError::Unclosed {
                    what: "quoted value",
                    selector: self.input.to_string(),
                })
            }
            _ => {
                let start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch == ']' {
                        break;
                    }
                    self.bump();
                }
                Ok(self.input[start..self.pos].to_string())
            }
        }
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_ident_char(ch) {
                self.bump();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

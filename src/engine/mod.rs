//! Annotation engine.
//!
//! [`rule::AnnotationRule`] declares where annotations come from (match
//! selector, lookup mode, key extraction) and where they land
//! ([`placement::Placement`], classes). [`apply::Engine`] executes rules
//! against a document: resolve, render, dedup, insert, and report the
//! attachments so the watcher can register teardown.

pub mod apply;
pub mod placement;
pub mod rule;

pub use apply::{Attachment, Engine};
pub use placement::Placement;
pub use rule::{AnnotationRule, LookupMode, Predicate, RuleBuilder, RuleError};

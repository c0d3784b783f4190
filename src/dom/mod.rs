//! Mutable document model.
//!
//! Annotation needs a tree it can write into, so pages are ingested into an
//! arena [`Document`] (`scraper` handles the HTML parsing, see
//! [`parse`]). Structural and attribute mutations are recorded and flushed
//! as [`mutation::MutationBatch`] values over a broadcast bus, which is what
//! the dynamic content watcher consumes.

pub mod arena;
pub mod mutation;
pub mod parse;
pub mod select;

pub use arena::{Document, Fragment, NodeData, NodeId};
pub use mutation::{MutationBatch, MutationBus, Subscription};
pub use select::Selector;

//! Mutation batching and the broadcast bus.
//!
//! The arena records raw [`Mutation`] values as the document changes;
//! [`Document::commit`](crate::dom::Document::commit) flushes them onto a
//! [`MutationBus`]. Consumers subscribe with a selector and an attribute
//! list and receive [`MutationBatch`] values scoped to what they asked for:
//! elements matching the selector that entered the tree (directly or inside
//! an added subtree) and matching elements whose watched attributes changed.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dom::arena::{Document, NodeId};
use crate::dom::select::Selector;

/// A single raw document mutation.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Node attached to the document tree.
    Added(NodeId),
    /// Attribute set on an attached element.
    AttrChanged { node: NodeId, attr: String },
    /// Text node content replaced.
    TextChanged { node: NodeId },
}

/// Mutations delivered to one subscriber, already filtered to its interest.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Matching elements newly attached (including descendants of added
    /// subtrees).
    pub added: Vec<NodeId>,
    /// Matching elements whose watched attribute changed.
    pub attr_changed: Vec<NodeId>,
    /// Text nodes whose content changed, unfiltered.
    pub text_changed: Vec<NodeId>,
}

impl MutationBatch {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.attr_changed.is_empty() && self.text_changed.is_empty()
    }
}

/// Broadcast channel carrying committed mutation batches.
#[derive(Debug, Clone)]
pub struct MutationBus {
    tx: broadcast::Sender<Arc<Vec<Mutation>>>,
}

impl MutationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a batch of raw mutations. Dropped silently when nobody is
    /// subscribed, same as an un-observed document.
    pub fn publish(&self, mutations: Vec<Mutation>) {
        let _ = self.tx.send(Arc::new(mutations));
    }

    /// Subscribe to batches scoped to `selector`, watching the given
    /// attributes for changes.
    pub fn subscribe(&self, selector: Selector, attributes: &[&str]) -> Subscription {
        Subscription {
            selector,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            rx: self.tx.subscribe(),
        }
    }

    /// Raw unfiltered stream of committed batches.
    pub fn raw_stream(&self) -> BroadcastStream<Arc<Vec<Mutation>>> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MutationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// One consumer's view of the bus: a selector, a watched-attribute set and
/// a receiver.
pub struct Subscription {
    selector: Selector,
    attributes: Vec<String>,
    rx: broadcast::Receiver<Arc<Vec<Mutation>>>,
}

impl Subscription {
    /// Await the next committed batch and filter it against the document.
    ///
    /// Returns `None` when the bus is closed. A lagged receiver skips to the
    /// oldest retained batch rather than erroring.
    pub async fn next_batch(&mut self, doc: &Document) -> Option<MutationBatch> {
        loop {
            match self.rx.recv().await {
                Ok(raw) => return Some(self.filter(doc, &raw)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "mutation subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain every batch already queued, merged into one filtered batch.
    pub fn drain(&mut self, doc: &Document) -> MutationBatch {
        let mut merged = MutationBatch::default();
        while let Ok(raw) = self.rx.try_recv() {
            let batch = self.filter(doc, &raw);
            merged.added.extend(batch.added);
            merged.attr_changed.extend(batch.attr_changed);
            merged.text_changed.extend(batch.text_changed);
        }
        merged.added.sort();
        merged.added.dedup();
        merged
    }

    /// Scope a raw mutation list to this subscription's interest.
    pub fn filter(&self, doc: &Document, raw: &[Mutation]) -> MutationBatch {
        let mut batch = MutationBatch::default();
        for m in raw {
            match m {
                Mutation::Added(id) => {
                    // An added subtree can contain matching descendants.
                    for n in doc.descendants(*id) {
                        if doc.is_element(n) && self.selector.matches(doc, n) {
                            batch.added.push(n);
                        }
                    }
                }
                Mutation::AttrChanged { node, attr } => {
                    if self.attributes.iter().any(|a| a == attr)
                        && self.selector.matches(doc, *node)
                    {
                        batch.attr_changed.push(*node);
                    }
                }
                Mutation::TextChanged { node } => batch.text_changed.push(*node),
            }
        }
        batch.added.sort();
        batch.added.dedup();
        batch
    }
}

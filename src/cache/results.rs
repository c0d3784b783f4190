//! Lookup memoization.
//!
//! ## One operation per signature
//!
//! The first caller for a signature installs a shared future; every later
//! caller (concurrent or not) awaits the same future and gets the same
//! `Arc`'d result. Empty results are memoized exactly like non-empty
//! ones. Entries are never evicted; memoization lasts the life of the
//! process.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::client::signature::RequestSignature;

type SharedLookup = Shared<BoxFuture<'static, Arc<Vec<Value>>>>;

/// Signature-keyed memoization of lookup results.
#[derive(Default)]
pub struct ResultCache {
    entries: DashMap<RequestSignature, SharedLookup>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the shared operation for `signature`, installing one built
    /// from `fetch` if this is the first time the signature is seen.
    ///
    /// `fetch` is invoked at most once per signature; the future it
    /// returns only starts running when the shared handle is first
    /// awaited.
    pub fn get_or_fetch<F, Fut>(&self, signature: RequestSignature, fetch: F) -> SharedLookup
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Vec<Value>> + Send + 'static,
    {
        self.entries
            .entry(signature)
            .or_insert_with(|| fetch().map(Arc::new).boxed().shared())
            .clone()
    }

    pub fn contains(&self, signature: &RequestSignature) -> bool {
        self.entries.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

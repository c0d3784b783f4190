//! Rendered-fragment templates.
//!
//! Rendering the same results twice should not rebuild the tree. The
//! cache stores one detached [`Fragment`] per identity key (joined tag
//! names for a tag group, the artist id for an artist credit). Insertion
//! always goes through [`Document::adopt`](crate::dom::Document::adopt),
//! which deep-copies, so templates stay pristine no matter what happens
//! to inserted copies.

use dashmap::DashMap;

use crate::dom::Fragment;

/// Identity-keyed cache of detached rendered templates.
#[derive(Default)]
pub struct FragmentCache {
    entries: DashMap<String, Fragment>,
}

impl FragmentCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Clone of the template for `key`, if one is cached.
    pub fn get(&self, key: &str) -> Option<Fragment> {
        self.entries.get(key).map(|f| f.clone())
    }

    pub fn insert(&self, key: &str, fragment: Fragment) {
        self.entries.insert(key.to_string(), fragment);
    }

    /// Template for `key`, building and caching it on first use.
    pub fn get_or_build_with(&self, key: &str, build: impl FnOnce() -> Fragment) -> Fragment {
        self.entries
            .entry(key.to_string())
            .or_insert_with(build)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

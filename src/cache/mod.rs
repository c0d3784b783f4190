//! Process-lifetime caches.
//!
//! [`results::ResultCache`] memoizes remote lookups by their canonical
//! signature so identical questions share one network operation.
//! [`fragments::FragmentCache`] keeps detached rendered templates keyed by
//! the identities of the results they render. Neither cache evicts;
//! both live as long as the pipeline.

pub mod fragments;
pub mod results;

pub use fragments::FragmentCache;
pub use results::ResultCache;

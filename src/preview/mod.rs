//! Artist hover cards.
//!
//! [`builder::PreviewBuilder`] joins the two lookups behind a card and
//! memoizes the result per artist. [`card::CardRenderer`] turns that
//! data into a detached fragment. [`theme`] derives the card's
//! dark/light scheme from the page around the anchor, which is why it
//! is computed per presentation and never cached with the data.

pub mod builder;
pub mod card;
pub mod format;
pub mod theme;

pub use builder::{ArtistPreview, PreviewBuilder};
pub use card::CardRenderer;
pub use theme::{choose_scheme, Scheme, Theme};

//! Rule declaration and construction.
//!
//! A rule is built once at startup; anything wrong with it (a selector
//! that does not parse, most commonly) fails construction with a
//! [`RuleError`] instead of surfacing later mid-application. Construction
//! also resolves the lookup mode to its default key extractor, so
//! application never hits an unconfigured case.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::dom::select::SelectorError;
use crate::dom::{Document, NodeId, Selector};
use crate::engine::placement::Placement;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid match selector `{selector}`")]
    MatchSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },
    #[error("invalid predicate selector `{selector}`")]
    PredicateSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },
    #[error("invalid text-watch selector `{selector}`")]
    WatchSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },
}

/// What a matched element's key resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Element text names a tag; resolve through wiki aliases.
    Tag,
    /// Nearest anchor href names an artist profile URL.
    ArtistByUrl,
    /// Element text names an artist.
    ArtistByName,
}

/// Pulls the lookup key out of a matched element.
pub type ExtractorFn = Arc<dyn Fn(&Document, NodeId) -> Option<String> + Send + Sync>;
/// Element-level filter applied after the match selector.
pub type PredicateFn = Arc<dyn Fn(&Document, NodeId) -> bool + Send + Sync>;
/// Hook run after an annotation is inserted (or re-bound on a duplicate).
pub type AttachHook = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

/// Secondary filter on matched elements.
#[derive(Clone)]
pub enum Predicate {
    /// Every match passes.
    Any,
    /// Match must also satisfy this selector.
    Matches(Selector),
    /// Arbitrary element test.
    Func(PredicateFn),
}

impl Predicate {
    pub fn accepts(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Matches(sel) => sel.matches(doc, node),
            Predicate::Func(f) => f(doc, node),
        }
    }
}

/// A fully constructed annotation rule.
#[derive(Clone)]
pub struct AnnotationRule {
    pub(crate) selector: Selector,
    pub(crate) mode: LookupMode,
    pub(crate) predicate: Predicate,
    pub(crate) extractor: ExtractorFn,
    pub(crate) placement: Placement,
    pub(crate) classes: String,
    pub(crate) on_attached: Option<AttachHook>,
    pub(crate) watch_for_changes: Option<Selector>,
    pub(crate) required_attributes: Vec<String>,
}

impl AnnotationRule {
    pub fn builder(mode: LookupMode, selector: &str) -> RuleBuilder {
        RuleBuilder::new(mode, selector)
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Attributes whose changes should re-trigger this rule when watched.
    pub fn required_attributes(&self) -> &[String] {
        &self.required_attributes
    }

    pub fn watch_for_changes(&self) -> Option<&Selector> {
        self.watch_for_changes.as_ref()
    }

    pub(crate) fn extract_key(&self, doc: &Document, node: NodeId) -> Option<String> {
        (self.extractor)(doc, node).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for AnnotationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationRule")
            .field("mode", &self.mode)
            .field("selector", &self.selector.source())
            .field("placement", &self.placement)
            .field("classes", &self.classes)
            .finish_non_exhaustive()
    }
}

/// Staged configuration for an [`AnnotationRule`].
pub struct RuleBuilder {
    mode: LookupMode,
    selector: String,
    predicate_selector: Option<String>,
    predicate_fn: Option<PredicateFn>,
    extractor: Option<ExtractorFn>,
    placement: Placement,
    classes: String,
    on_attached: Option<AttachHook>,
    watch_for_changes: Option<String>,
    required_attributes: Vec<String>,
}

impl RuleBuilder {
    fn new(mode: LookupMode, selector: &str) -> Self {
        Self {
            mode,
            selector: selector.to_string(),
            predicate_selector: None,
            predicate_fn: None,
            extractor: None,
            placement: Placement::AfterAnchor,
            classes: String::new(),
            on_attached: None,
            watch_for_changes: None,
            required_attributes: Vec::new(),
        }
    }

    /// Matches must also satisfy this selector.
    pub fn predicate_selector(mut self, selector: &str) -> Self {
        self.predicate_selector = Some(selector.to_string());
        self
    }

    /// Matches must pass this test.
    pub fn predicate(mut self, f: impl Fn(&Document, NodeId) -> bool + Send + Sync + 'static) -> Self {
        self.predicate_fn = Some(Arc::new(f));
        self
    }

    /// Replace the mode's default key extractor.
    pub fn extractor(
        mut self,
        f: impl Fn(&Document, NodeId) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.extractor = Some(Arc::new(f));
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Extra classes stamped on every inserted annotation.
    pub fn classes(mut self, classes: &str) -> Self {
        self.classes = classes.to_string();
        self
    }

    pub fn on_attached(mut self, f: impl Fn(&mut Document, NodeId) + Send + Sync + 'static) -> Self {
        self.on_attached = Some(Arc::new(f));
        self
    }

    /// Tear the annotation down on the first text change inside the
    /// element matching `target` within the placement container.
    pub fn watch_for_changes(mut self, target: &str) -> Self {
        self.watch_for_changes = Some(target.to_string());
        self
    }

    /// Attribute changes that re-trigger this rule in watch mode.
    pub fn required_attributes(mut self, attrs: &[&str]) -> Self {
        self.required_attributes = attrs.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn build(self) -> Result<AnnotationRule, RuleError> {
        let selector =
            Selector::parse(&self.selector).map_err(|source| RuleError::MatchSelector {
                selector: self.selector.clone(),
                source,
            })?;

        let predicate = if let Some(f) = self.predicate_fn {
            Predicate::Func(f)
        } else if let Some(ps) = self.predicate_selector {
            let sel = Selector::parse(&ps).map_err(|source| RuleError::PredicateSelector {
                selector: ps.clone(),
                source,
            })?;
            Predicate::Matches(sel)
        } else {
            Predicate::Any
        };

        let watch_for_changes = match self.watch_for_changes {
            Some(ws) => Some(Selector::parse(&ws).map_err(|source| RuleError::WatchSelector {
                selector: ws.clone(),
                source,
            })?),
            None => None,
        };

        let extractor = self
            .extractor
            .unwrap_or_else(|| default_extractor(self.mode));

        Ok(AnnotationRule {
            selector,
            mode: self.mode,
            predicate,
            extractor,
            placement: self.placement,
            classes: self.classes,
            on_attached: self.on_attached,
            watch_for_changes,
            required_attributes: self.required_attributes,
        })
    }
}

/// Mode-resolved default key extraction: element text for names, the
/// nearest ancestor link's href for profile URLs.
fn default_extractor(mode: LookupMode) -> ExtractorFn {
    match mode {
        LookupMode::Tag | LookupMode::ArtistByName => {
            Arc::new(|doc: &Document, node: NodeId| {
                let text = doc.text_content(node);
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        }
        LookupMode::ArtistByUrl => Arc::new(|doc: &Document, node: NodeId| {
            let mut cur = Some(node);
            while let Some(n) = cur {
                if let Some(el) = doc.element(n) {
                    if el.tag == "a" {
                        return el.attr("href").map(|h| h.to_string());
                    }
                }
                cur = doc.parent(n);
            }
            None
        }),
    }
}

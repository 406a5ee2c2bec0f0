#![forbid(unsafe_code)]

//! Smooth scrolling for in-page anchors.

use std::collections::HashMap;

use crate::effect::{BlockAlign, Effect, ScrollBehavior};
use crate::registry::{AnchorLink, ElementId, ElementRegistry};

/// Resolves a fragment identifier (without the leading `#`) to an element.
pub trait FragmentResolver {
    fn resolve(&mut self, fragment: &str) -> Option<ElementId>;
}

impl FragmentResolver for HashMap<String, ElementId> {
    fn resolve(&mut self, fragment: &str) -> Option<ElementId> {
        self.get(fragment).copied()
    }
}

/// Resolver that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFragments;

impl FragmentResolver for NoFragments {
    fn resolve(&mut self, _fragment: &str) -> Option<ElementId> {
        None
    }
}

/// Fragment identifier of an in-page `href`.
///
/// `None` for the bare `#` (and for anything not starting with `#`), which the
/// feature leaves entirely to the browser.
#[must_use]
pub fn fragment_of(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|rest| !rest.is_empty())
}

#[derive(Debug, Clone)]
pub struct AnchorScroll {
    anchors: Vec<AnchorLink>,
}

impl AnchorScroll {
    /// Arm the feature; `None` when the page has no in-page anchors.
    #[must_use]
    pub fn arm(registry: &ElementRegistry) -> Option<Self> {
        if registry.anchors.is_empty() {
            return None;
        }
        Some(Self {
            anchors: registry.anchors.clone(),
        })
    }

    #[must_use]
    pub fn href(&self, anchor: ElementId) -> Option<&str> {
        self.anchors
            .iter()
            .find(|a| a.id == anchor)
            .map(|a| a.href.as_str())
    }

    /// Resolve the scroll target of `anchor`.
    pub fn resolve<R: FragmentResolver + ?Sized>(
        &self,
        anchor: ElementId,
        resolver: &mut R,
    ) -> Option<ElementId> {
        fragment_of(self.href(anchor)?).and_then(|fragment| resolver.resolve(fragment))
    }

    /// Handle a click on `anchor` whose fragment resolved to `target`.
    ///
    /// A bare `#` link produces nothing, so the default action survives. Any
    /// other fragment cancels the default; when the target is missing the
    /// link goes inert.
    #[must_use]
    pub fn click(&self, anchor: ElementId, target: Option<ElementId>) -> Vec<Effect> {
        let Some(href) = self.href(anchor) else {
            return Vec::new();
        };
        if fragment_of(href).is_none() {
            return Vec::new();
        }

        let mut effects = vec![Effect::PreventDefault];
        match target {
            Some(target) => effects.push(Effect::ScrollIntoView {
                target,
                behavior: ScrollBehavior::Smooth,
                block: BlockAlign::Start,
            }),
            None => tracing::debug!(href, "in-page anchor has no target"),
        }
        effects
    }
}

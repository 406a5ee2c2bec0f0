#![forbid(unsafe_code)]

//! Element discovery and the lookup cache every feature reads from.
//!
//! Discovery runs once, before any feature is armed. Singular entries that are
//! missing resolve to `None`, missing collections to an empty `Vec`; absence is
//! never an error. The host supplies element access through [`ElementSource`],
//! so the same discovery code runs against a live document and against test
//! fixtures.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::PageConfig;

/// Opaque handle into the host's element arena.
///
/// Handles are stable for the page lifetime. The same DOM element always maps
/// to the same handle, even when it matches several selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u32);

impl ElementId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ElementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read access to the host document used during discovery.
pub trait ElementSource {
    /// First element matching `selector` in document order.
    fn query_one(&mut self, selector: &str) -> Option<ElementId>;

    /// All elements matching `selector` in document order.
    fn query_all(&mut self, selector: &str) -> Vec<ElementId>;

    /// All descendants of `scope` matching `selector` in document order.
    fn query_all_within(&mut self, scope: ElementId, selector: &str) -> Vec<ElementId>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;
}

/// A singular control whose markup may ship with the active marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkedElement {
    pub id: ElementId,
    pub marked: bool,
}

impl MarkedElement {
    #[must_use]
    pub const fn new(id: ElementId) -> Self {
        Self { id, marked: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterControl {
    pub id: ElementId,
    pub category: Option<String>,
    pub marked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCard {
    pub id: ElementId,
    pub category: Option<String>,
}

/// In-page link; `href` is the raw attribute and always starts with `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorLink {
    pub id: ElementId,
    pub href: String,
}

/// Everything discovered at startup, keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementRegistry {
    pub menu_toggle: Option<MarkedElement>,
    pub nav_panel: Option<MarkedElement>,
    pub nav_links: Vec<ElementId>,
    pub pricing_switch: Option<MarkedElement>,
    pub monthly_prices: Vec<ElementId>,
    pub yearly_prices: Vec<ElementId>,
    pub filter_controls: Vec<FilterControl>,
    pub content_cards: Vec<ContentCard>,
    pub reveal_targets: Vec<ElementId>,
    pub anchors: Vec<AnchorLink>,
}

impl ElementRegistry {
    /// Resolve every logical name once against `source`.
    pub fn discover<S: ElementSource + ?Sized>(source: &mut S, config: &PageConfig) -> Self {
        let selectors = &config.selectors;
        let markers = &config.markers;

        let marked = |source: &mut S, selector: &str| {
            source.query_one(selector).map(|id| MarkedElement {
                id,
                marked: source.has_class(id, &markers.active_class),
            })
        };

        let menu_toggle = marked(source, &selectors.menu_toggle);
        let nav_panel = marked(source, &selectors.nav_panel);
        let nav_links = nav_panel
            .map(|panel| source.query_all_within(panel.id, &selectors.nav_link))
            .unwrap_or_default();
        let pricing_switch = marked(source, &selectors.pricing_switch);
        let monthly_prices = source.query_all(&selectors.monthly_price);
        let yearly_prices = source.query_all(&selectors.yearly_price);

        let filter_controls = source
            .query_all(&selectors.filter_control)
            .into_iter()
            .map(|id| FilterControl {
                id,
                category: source.attribute(id, &markers.category_attribute),
                marked: source.has_class(id, &markers.active_class),
            })
            .collect();
        let content_cards = source
            .query_all(&selectors.content_card)
            .into_iter()
            .map(|id| ContentCard {
                id,
                category: source.attribute(id, &markers.category_attribute),
            })
            .collect();

        let reveal_targets = source.query_all(&selectors.reveal_targets.join(", "));
        let anchors = source
            .query_all(&selectors.in_page_anchor)
            .into_iter()
            .filter_map(|id| {
                let href = source.attribute(id, "href")?;
                href.starts_with('#').then_some(AnchorLink { id, href })
            })
            .collect();

        let registry = Self {
            menu_toggle,
            nav_panel,
            nav_links,
            pricing_switch,
            monthly_prices,
            yearly_prices,
            filter_controls,
            content_cards,
            reveal_targets,
            anchors,
        };
        tracing::debug!(
            elements = registry.element_count(),
            filter_controls = registry.filter_controls.len(),
            content_cards = registry.content_cards.len(),
            reveal_targets = registry.reveal_targets.len(),
            anchors = registry.anchors.len(),
            "element registry discovered"
        );
        registry
    }

    /// Number of distinct elements referenced by the registry.
    #[must_use]
    pub fn element_count(&self) -> usize {
        let mut seen = BTreeSet::new();
        seen.extend(self.menu_toggle.map(|m| m.id));
        seen.extend(self.nav_panel.map(|m| m.id));
        seen.extend(self.pricing_switch.map(|m| m.id));
        seen.extend(self.nav_links.iter().copied());
        seen.extend(self.monthly_prices.iter().copied());
        seen.extend(self.yearly_prices.iter().copied());
        seen.extend(self.filter_controls.iter().map(|c| c.id));
        seen.extend(self.content_cards.iter().map(|c| c.id));
        seen.extend(self.reveal_targets.iter().copied());
        seen.extend(self.anchors.iter().map(|a| a.id));
        seen.len()
    }

    #[must_use]
    pub fn anchor(&self, id: ElementId) -> Option<&AnchorLink> {
        self.anchors.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn filter_control(&self, id: ElementId) -> Option<&FilterControl> {
        self.filter_controls.iter().find(|c| c.id == id)
    }

    // Builder helpers for hosts and fixtures that assemble a registry by hand.

    #[must_use]
    pub fn with_menu_toggle(mut self, id: ElementId) -> Self {
        self.menu_toggle = Some(MarkedElement::new(id));
        self
    }

    #[must_use]
    pub fn with_nav_panel(mut self, id: ElementId, links: impl IntoIterator<Item = ElementId>) -> Self {
        self.nav_panel = Some(MarkedElement::new(id));
        self.nav_links = links.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_pricing_switch(mut self, id: ElementId, marked: bool) -> Self {
        self.pricing_switch = Some(MarkedElement { id, marked });
        self
    }

    #[must_use]
    pub fn with_prices(
        mut self,
        monthly: impl IntoIterator<Item = ElementId>,
        yearly: impl IntoIterator<Item = ElementId>,
    ) -> Self {
        self.monthly_prices = monthly.into_iter().collect();
        self.yearly_prices = yearly.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_filter_control(mut self, id: ElementId, category: &str) -> Self {
        self.filter_controls.push(FilterControl {
            id,
            category: Some(category.to_owned()),
            marked: false,
        });
        self
    }

    #[must_use]
    pub fn with_content_card(mut self, id: ElementId, category: &str) -> Self {
        self.content_cards.push(ContentCard {
            id,
            category: Some(category.to_owned()),
        });
        self
    }

    #[must_use]
    pub fn with_reveal_targets(mut self, ids: impl IntoIterator<Item = ElementId>) -> Self {
        self.reveal_targets.extend(ids);
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, id: ElementId, href: &str) -> Self {
        self.anchors.push(AnchorLink {
            id,
            href: href.to_owned(),
        });
        self
    }
}

#![forbid(unsafe_code)]

//! The page behavior controller.
//!
//! Owns one optional state machine per feature and routes [`PageEvent`]s to
//! them. The controller is built from an [`ElementRegistry`] value, so tests
//! construct it without a document; the host only feeds events in and applies
//! the returned [`Effect`]s.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorScroll, FragmentResolver};
use crate::config::PageConfig;
use crate::effect::Effect;
use crate::filter::CategoryFilter;
use crate::nav::{NavInput, NavMenu, NavState};
use crate::pricing::{BillingPeriod, PricingSwitch};
use crate::registry::{ElementId, ElementRegistry};
use crate::reveal::{IntersectionSample, RevealSet};

bitflags! {
    /// Features whose guards passed at construction.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArmedFeatures: u8 {
        const NAV     = 0b0_0001;
        const PRICING = 0b0_0010;
        const FILTER  = 0b0_0100;
        const ANCHORS = 0b0_1000;
        const REVEAL  = 0b1_0000;
    }
}

/// Host events, one variant per listener the host registers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEvent {
    MenuToggleClick,
    NavLinkClick {
        link: ElementId,
    },
    /// Document-level click. `inside_menu` is true when the click target is
    /// contained in the menu toggle or the nav panel.
    DocumentClick {
        inside_menu: bool,
    },
    PricingSwitchClick,
    FilterClick {
        control: ElementId,
    },
    /// In-page anchor click; `target` is the already resolved fragment.
    AnchorClick {
        anchor: ElementId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ElementId>,
    },
    Intersection {
        samples: Vec<IntersectionSample>,
    },
}

impl PageEvent {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MenuToggleClick => "menu_toggle_click",
            Self::NavLinkClick { .. } => "nav_link_click",
            Self::DocumentClick { .. } => "document_click",
            Self::PricingSwitchClick => "pricing_switch_click",
            Self::FilterClick { .. } => "filter_click",
            Self::AnchorClick { .. } => "anchor_click",
            Self::Intersection { .. } => "intersection",
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct PageController {
    nav: Option<NavMenu>,
    pricing: Option<PricingSwitch>,
    filter: Option<CategoryFilter>,
    anchors: Option<AnchorScroll>,
    reveal: Option<RevealSet>,
    armed: ArmedFeatures,
}

impl PageController {
    /// Arm every feature whose required elements exist.
    #[must_use]
    pub fn new(registry: &ElementRegistry, config: &PageConfig) -> Self {
        let nav = NavMenu::arm(registry);
        let pricing = PricingSwitch::arm(registry);
        let filter = CategoryFilter::arm(registry, &config.markers.all_category);
        let anchors = AnchorScroll::arm(registry);
        let reveal = RevealSet::arm(registry, &config.reveal);

        let mut armed = ArmedFeatures::empty();
        armed.set(ArmedFeatures::NAV, nav.is_some());
        armed.set(ArmedFeatures::PRICING, pricing.is_some());
        armed.set(ArmedFeatures::FILTER, filter.is_some());
        armed.set(ArmedFeatures::ANCHORS, anchors.is_some());
        armed.set(ArmedFeatures::REVEAL, reveal.is_some());
        tracing::info!(features = ?armed, "page controller armed");

        Self {
            nav,
            pricing,
            filter,
            anchors,
            reveal,
            armed,
        }
    }

    #[must_use]
    pub const fn armed(&self) -> ArmedFeatures {
        self.armed
    }

    /// Drop `features` the host cannot drive. Their state is discarded and
    /// their events produce no effects from now on.
    pub fn disarm(&mut self, features: ArmedFeatures) {
        if features.contains(ArmedFeatures::NAV) {
            self.nav = None;
        }
        if features.contains(ArmedFeatures::PRICING) {
            self.pricing = None;
        }
        if features.contains(ArmedFeatures::FILTER) {
            self.filter = None;
        }
        if features.contains(ArmedFeatures::ANCHORS) {
            self.anchors = None;
        }
        if features.contains(ArmedFeatures::REVEAL) {
            self.reveal = None;
        }
        let dropped = self.armed & features;
        self.armed.remove(features);
        if !dropped.is_empty() {
            tracing::warn!(features = ?dropped, "features disarmed");
        }
    }

    /// Startup effects. Only the first call returns anything.
    pub fn start(&mut self) -> Vec<Effect> {
        self.reveal.as_mut().map(RevealSet::start).unwrap_or_default()
    }

    /// Build an anchor click event, resolving its fragment through `resolver`.
    pub fn anchor_click<R: FragmentResolver + ?Sized>(
        &self,
        anchor: ElementId,
        resolver: &mut R,
    ) -> PageEvent {
        let target = self
            .anchors
            .as_ref()
            .and_then(|a| a.resolve(anchor, resolver));
        PageEvent::AnchorClick { anchor, target }
    }

    /// Route one event. Events for features that are not armed, or that name
    /// elements the feature does not own, produce no effects.
    pub fn handle(&mut self, event: &PageEvent) -> Vec<Effect> {
        let effects = match event {
            PageEvent::MenuToggleClick => self.nav_input(NavInput::Toggle),
            PageEvent::NavLinkClick { link } => {
                if self.nav.as_ref().is_some_and(|nav| nav.is_link(*link)) {
                    self.nav_input(NavInput::Link)
                } else {
                    Vec::new()
                }
            }
            PageEvent::DocumentClick { inside_menu: false } => self.nav_input(NavInput::Outside),
            PageEvent::DocumentClick { inside_menu: true } => Vec::new(),
            PageEvent::PricingSwitchClick => self
                .pricing
                .as_mut()
                .map(PricingSwitch::click)
                .unwrap_or_default(),
            PageEvent::FilterClick { control } => self
                .filter
                .as_mut()
                .map(|f| f.select(*control))
                .unwrap_or_default(),
            PageEvent::AnchorClick { anchor, target } => self
                .anchors
                .as_ref()
                .map(|a| a.click(*anchor, *target))
                .unwrap_or_default(),
            PageEvent::Intersection { samples } => self
                .reveal
                .as_mut()
                .map(|r| r.observe(samples))
                .unwrap_or_default(),
        };
        tracing::trace!(event = event.kind(), effects = effects.len(), "event handled");
        effects
    }

    fn nav_input(&mut self, input: NavInput) -> Vec<Effect> {
        self.nav
            .as_mut()
            .map(|nav| nav.apply(input))
            .unwrap_or_default()
    }

    /// `None` when the nav feature is not armed.
    #[must_use]
    pub fn nav_state(&self) -> Option<NavState> {
        self.nav.as_ref().map(NavMenu::state)
    }

    #[must_use]
    pub fn billing_period(&self) -> Option<BillingPeriod> {
        self.pricing.as_ref().map(PricingSwitch::period)
    }

    #[must_use]
    pub fn selected_category(&self) -> Option<&str> {
        self.filter.as_ref()?.selected_category()
    }

    #[must_use]
    pub fn selected_filter(&self) -> Option<ElementId> {
        self.filter.as_ref()?.selected()
    }

    /// Reveal targets still waiting for their first qualifying intersection.
    #[must_use]
    pub fn pending_reveals(&self) -> &[ElementId] {
        match &self.reveal {
            Some(reveal) => reveal.pending(),
            None => &[],
        }
    }

    #[must_use]
    pub fn reveal(&self) -> Option<&RevealSet> {
        self.reveal.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn empty_page_arms_nothing_and_ignores_events() {
        let mut controller = PageController::new(&ElementRegistry::default(), &PageConfig::default());
        assert_eq!(controller.armed(), ArmedFeatures::empty());
        assert!(controller.start().is_empty());
        for event in [
            PageEvent::MenuToggleClick,
            PageEvent::DocumentClick { inside_menu: false },
            PageEvent::PricingSwitchClick,
            PageEvent::FilterClick {
                control: ElementId::new(0),
            },
            PageEvent::AnchorClick {
                anchor: ElementId::new(0),
                target: None,
            },
            PageEvent::Intersection { samples: vec![] },
        ] {
            assert!(controller.handle(&event).is_empty(), "{event:?}");
        }
        assert_eq!(controller.nav_state(), None);
        assert!(controller.pending_reveals().is_empty());
    }

    #[test]
    fn inside_menu_click_is_ignored() {
        let registry = ElementRegistry::default()
            .with_menu_toggle(ElementId::new(1))
            .with_nav_panel(ElementId::new(2), [ElementId::new(3)]);
        let mut controller = PageController::new(&registry, &PageConfig::default());
        controller.handle(&PageEvent::MenuToggleClick);
        assert!(
            controller
                .handle(&PageEvent::DocumentClick { inside_menu: true })
                .is_empty()
        );
        assert_eq!(controller.nav_state(), Some(NavState::Open));

        // A link that is not inside the panel does not close the menu.
        assert!(
            controller
                .handle(&PageEvent::NavLinkClick {
                    link: ElementId::new(9)
                })
                .is_empty()
        );
        assert_eq!(controller.nav_state(), Some(NavState::Open));
    }

    #[test]
    fn event_json_is_tagged() {
        let event = PageEvent::AnchorClick {
            anchor: ElementId::new(4),
            target: None,
        };
        let json = event.to_json_string().expect("serialize");
        assert_eq!(json, r#"{"kind":"anchor_click","anchor":4}"#);
        assert_eq!(PageEvent::from_json_str(&json).expect("deserialize"), event);
    }

    #[test]
    #[traced_test]
    fn disarmed_reveal_stays_inert() {
        let target = ElementId::new(5);
        let registry = ElementRegistry::default()
            .with_pricing_switch(ElementId::new(0), false)
            .with_reveal_targets([target]);
        let mut controller = PageController::new(&registry, &PageConfig::default());
        assert_eq!(
            controller.armed(),
            ArmedFeatures::PRICING | ArmedFeatures::REVEAL
        );

        controller.disarm(ArmedFeatures::REVEAL);
        assert_eq!(controller.armed(), ArmedFeatures::PRICING);
        assert_eq!(controller.armed().bits(), 0b0_0010);
        assert!(controller.reveal().is_none());
        assert!(controller.pending_reveals().is_empty());
        assert!(controller.start().is_empty());
        let sample = IntersectionSample {
            target,
            is_intersecting: true,
            ratio: 1.0,
        };
        assert!(
            controller
                .handle(&PageEvent::Intersection {
                    samples: vec![sample]
                })
                .is_empty()
        );
        assert!(!controller.handle(&PageEvent::PricingSwitchClick).is_empty());
        assert!(logs_contain("features disarmed"));

        // Disarming something that was never armed is silent.
        controller.disarm(ArmedFeatures::NAV);
        assert_eq!(controller.armed(), ArmedFeatures::PRICING);
    }

    #[test]
    #[traced_test]
    fn logs_armed_features() {
        let registry = ElementRegistry::default().with_pricing_switch(ElementId::new(0), false);
        let controller = PageController::new(&registry, &PageConfig::default());
        assert_eq!(controller.armed(), ArmedFeatures::PRICING);
        assert!(logs_contain("page controller armed"));
    }
}

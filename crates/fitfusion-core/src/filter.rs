#![forbid(unsafe_code)]

//! Category filter over the class cards.
//!
//! Every click re-evaluates every card from scratch; the only state kept is
//! which control is selected. Category comparison is exact and unvalidated:
//! an unknown category simply matches no card.

use crate::effect::{Display, Effect};
use crate::registry::{ContentCard, ElementId, ElementRegistry, FilterControl};

#[derive(Debug, Clone)]
pub struct CategoryFilter {
    controls: Vec<FilterControl>,
    cards: Vec<ContentCard>,
    all_category: String,
    selected: Option<ElementId>,
}

impl CategoryFilter {
    /// Arm the filter; `None` with zero controls or zero cards.
    #[must_use]
    pub fn arm(registry: &ElementRegistry, all_category: &str) -> Option<Self> {
        if registry.filter_controls.is_empty() || registry.content_cards.is_empty() {
            return None;
        }
        let selected = registry
            .filter_controls
            .iter()
            .find(|c| c.marked)
            .map(|c| c.id);
        Some(Self {
            controls: registry.filter_controls.clone(),
            cards: registry.content_cards.clone(),
            all_category: all_category.to_owned(),
            selected,
        })
    }

    /// Control currently carrying the active marker, as far as clicks go.
    #[must_use]
    pub const fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Category of the selected control. `None` when nothing is selected or
    /// the selected control has no category attribute.
    #[must_use]
    pub fn selected_category(&self) -> Option<&str> {
        let id = self.selected?;
        self.control(id)?.category.as_deref()
    }

    #[must_use]
    pub fn is_control(&self, id: ElementId) -> bool {
        self.control(id).is_some()
    }

    /// Handle a click on `control`. Unknown ids produce no effects.
    pub fn select(&mut self, control: ElementId) -> Vec<Effect> {
        let Some(clicked) = self.control(control) else {
            return Vec::new();
        };
        let category = clicked.category.clone();

        let mut effects = Vec::with_capacity(self.controls.len() + 1 + self.cards.len());
        effects.extend(self.controls.iter().map(|c| Effect::SetMarker {
            target: c.id,
            on: false,
        }));
        effects.push(Effect::SetMarker {
            target: control,
            on: true,
        });

        let show_all = category.as_deref() == Some(self.all_category.as_str());
        let mut visible = 0usize;
        for card in &self.cards {
            let shown = show_all || card.category == category;
            visible += usize::from(shown);
            effects.push(Effect::SetDisplay {
                target: card.id,
                display: Display::shown(shown),
            });
        }

        self.selected = Some(control);
        tracing::debug!(
            category = category.as_deref().unwrap_or("<none>"),
            visible,
            total = self.cards.len(),
            "category filter applied"
        );
        effects
    }

    fn control(&self, id: ElementId) -> Option<&FilterControl> {
        self.controls.iter().find(|c| c.id == id)
    }
}

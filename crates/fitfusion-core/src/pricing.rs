#![forbid(unsafe_code)]

//! Monthly / yearly pricing switch.

use serde::{Deserialize, Serialize};

use crate::effect::{Display, Effect};
use crate::registry::{ElementId, ElementRegistry};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Yearly,
}

impl BillingPeriod {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Monthly => Self::Yearly,
            Self::Yearly => Self::Monthly,
        }
    }

    #[must_use]
    pub const fn is_yearly(self) -> bool {
        matches!(self, Self::Yearly)
    }
}

#[derive(Debug, Clone)]
pub struct PricingSwitch {
    switch: ElementId,
    monthly: Vec<ElementId>,
    yearly: Vec<ElementId>,
    period: BillingPeriod,
}

impl PricingSwitch {
    /// Arm the switch; `None` when the switch control is absent.
    #[must_use]
    pub fn arm(registry: &ElementRegistry) -> Option<Self> {
        let switch = registry.pricing_switch?;
        Some(Self {
            switch: switch.id,
            monthly: registry.monthly_prices.clone(),
            yearly: registry.yearly_prices.clone(),
            period: if switch.marked {
                BillingPeriod::Yearly
            } else {
                BillingPeriod::Monthly
            },
        })
    }

    #[must_use]
    pub const fn period(&self) -> BillingPeriod {
        self.period
    }

    /// Flip the period and render the switch marker plus every price label.
    pub fn click(&mut self) -> Vec<Effect> {
        self.period = self.period.flipped();
        tracing::debug!(period = ?self.period, "pricing period switched");
        self.render()
    }

    fn render(&self) -> Vec<Effect> {
        let yearly = self.period.is_yearly();
        let mut effects = Vec::with_capacity(1 + self.monthly.len() + self.yearly.len());
        effects.push(Effect::SetMarker {
            target: self.switch,
            on: yearly,
        });
        effects.extend(self.monthly.iter().map(|&target| Effect::SetDisplay {
            target,
            display: Display::shown(!yearly),
        }));
        effects.extend(self.yearly.iter().map(|&target| Effect::SetDisplay {
            target,
            display: Display::shown(yearly),
        }));
        effects
    }
}

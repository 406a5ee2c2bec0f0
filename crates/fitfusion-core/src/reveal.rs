#![forbid(unsafe_code)]

//! One-shot reveal-on-scroll animation.
//!
//! Targets start hidden (transparent, pushed down) with a CSS transition
//! declared on opacity and transform. The host observes them against the
//! viewport and reports [`IntersectionSample`]s; the first qualifying sample
//! for a target reveals it and drops it from the watch set for good.
//!
//! [`Viewport::sample`] reproduces the observer's arithmetic (root bounds
//! shrunk by the bottom margin, ratio of the target's area) so the same
//! decisions can be made without a browser.

use serde::{Deserialize, Serialize};

use crate::effect::{Effect, StyleProperty};
use crate::registry::{ElementId, ElementRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Fraction of the target's area that must be visible.
    pub threshold: f64,
    /// Pixels cut off the bottom of the viewport before testing.
    pub bottom_margin_px: u32,
    /// Initial downward offset of hidden targets.
    pub offset_px: u32,
    pub duration_ms: u32,
    pub easing: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            bottom_margin_px: 50,
            offset_px: 20,
            duration_ms: 600,
            easing: "ease".into(),
        }
    }
}

impl RevealConfig {
    /// Observer root margin in CSS shorthand (`top right bottom left`).
    #[must_use]
    pub fn root_margin(&self) -> String {
        format!("0px 0px -{}px 0px", self.bottom_margin_px)
    }

    #[must_use]
    pub fn hidden_transform(&self) -> String {
        format!("translateY({}px)", self.offset_px)
    }

    #[must_use]
    pub fn transition(&self) -> String {
        let secs = f64::from(self.duration_ms) / 1000.0;
        format!(
            "opacity {secs}s {easing}, transform {secs}s {easing}",
            easing = self.easing
        )
    }

    #[must_use]
    pub fn qualifies(&self, sample: &IntersectionSample) -> bool {
        sample.is_intersecting && sample.ratio >= self.threshold
    }
}

/// Axis-aligned rectangle in CSS pixels, relative to the viewport origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same rectangle moved by `dy` (positive is down).
    #[must_use]
    pub const fn shifted(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Intersection of `rect` with the margin-adjusted viewport.
    ///
    /// Edge-adjacent rectangles count as intersecting with a zero ratio. A
    /// zero-area target that intersects reports a ratio of `1.0`.
    #[must_use]
    pub fn sample(&self, target: ElementId, rect: Rect, config: &RevealConfig) -> IntersectionSample {
        let root_bottom = (self.height - f64::from(config.bottom_margin_px)).max(0.0);
        let left = rect.x.max(0.0);
        let right = (rect.x + rect.width).min(self.width);
        let top = rect.y.max(0.0);
        let bottom = (rect.y + rect.height).min(root_bottom);

        let is_intersecting = right >= left && bottom >= top;
        let area = rect.width * rect.height;
        let ratio = if !is_intersecting {
            0.0
        } else if area <= 0.0 {
            1.0
        } else {
            ((right - left) * (bottom - top) / area).clamp(0.0, 1.0)
        };
        IntersectionSample {
            target,
            is_intersecting,
            ratio,
        }
    }
}

/// One observer entry as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionSample {
    pub target: ElementId,
    pub is_intersecting: bool,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct RevealSet {
    watched: Vec<ElementId>,
    config: RevealConfig,
    started: bool,
}

impl RevealSet {
    /// Arm the animation; `None` when there is nothing to reveal.
    #[must_use]
    pub fn arm(registry: &ElementRegistry, config: &RevealConfig) -> Option<Self> {
        let mut watched: Vec<ElementId> = Vec::with_capacity(registry.reveal_targets.len());
        for &id in &registry.reveal_targets {
            if !watched.contains(&id) {
                watched.push(id);
            }
        }
        if watched.is_empty() {
            return None;
        }
        Some(Self {
            watched,
            config: config.clone(),
            started: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Targets not yet revealed.
    #[must_use]
    pub fn pending(&self) -> &[ElementId] {
        &self.watched
    }

    #[must_use]
    pub fn is_watching(&self, id: ElementId) -> bool {
        self.watched.contains(&id)
    }

    /// Hide every target and start observing it. Only the first call emits.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        let transform = self.config.hidden_transform();
        let transition = self.config.transition();
        let mut effects = Vec::with_capacity(self.watched.len() * 4);
        for &target in &self.watched {
            effects.push(Effect::style(target, StyleProperty::Opacity, "0"));
            effects.push(Effect::style(target, StyleProperty::Transform, transform.as_str()));
            effects.push(Effect::style(target, StyleProperty::Transition, transition.as_str()));
            effects.push(Effect::Observe { target });
        }
        tracing::debug!(targets = self.watched.len(), "reveal observation started");
        effects
    }

    /// Reveal every watched target with a qualifying sample.
    pub fn observe(&mut self, samples: &[IntersectionSample]) -> Vec<Effect> {
        let mut effects = Vec::new();
        for sample in samples {
            if !self.config.qualifies(sample) {
                continue;
            }
            let Some(pos) = self.watched.iter().position(|&id| id == sample.target) else {
                continue;
            };
            self.watched.remove(pos);

            let target = sample.target;
            effects.push(Effect::style(target, StyleProperty::Opacity, "1"));
            effects.push(Effect::style(target, StyleProperty::Transform, "translateY(0)"));
            effects.push(Effect::Unobserve { target });
            tracing::trace!(%target, ratio = sample.ratio, "revealed");
        }
        effects
    }
}

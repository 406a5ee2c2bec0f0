#![forbid(unsafe_code)]

//! DOM effects requested by the page controller.
//!
//! The core never touches a document. Every feature answers an event with an
//! ordered list of [`Effect`] values and the host applies them in order. The
//! JSON form (a `kind` tag plus snake_case fields) is stable so that session
//! traces can be compared across builds.

use serde::{Deserialize, Serialize};

use crate::registry::ElementId;

/// CSS `display` values the features switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Display {
    Block,
    None,
}

impl Display {
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::None => "none",
        }
    }

    /// `Block` when `visible`, `None` otherwise.
    #[must_use]
    pub const fn shown(visible: bool) -> Self {
        if visible { Self::Block } else { Self::None }
    }
}

/// Inline style properties written by the reveal animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleProperty {
    Opacity,
    Transform,
    Transition,
}

impl StyleProperty {
    #[must_use]
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::Transform => "transform",
            Self::Transition => "transition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Smooth,
}

/// Vertical alignment of a scrolled-to element within the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockAlign {
    Start,
}

/// One DOM mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Add (`on`) or remove the active marker class.
    SetMarker { target: ElementId, on: bool },
    SetDisplay {
        target: ElementId,
        display: Display,
    },
    SetStyle {
        target: ElementId,
        property: StyleProperty,
        value: String,
    },
    /// Cancel the default action of the event being handled.
    PreventDefault,
    ScrollIntoView {
        target: ElementId,
        behavior: ScrollBehavior,
        block: BlockAlign,
    },
    /// Start watching `target` for viewport intersection.
    Observe { target: ElementId },
    /// Stop watching `target`. Never followed by another `Observe` for it.
    Unobserve { target: ElementId },
}

impl Effect {
    /// Element touched by this effect, if any.
    #[must_use]
    pub const fn target(&self) -> Option<ElementId> {
        match self {
            Self::SetMarker { target, .. }
            | Self::SetDisplay { target, .. }
            | Self::SetStyle { target, .. }
            | Self::ScrollIntoView { target, .. }
            | Self::Observe { target }
            | Self::Unobserve { target } => Some(*target),
            Self::PreventDefault => None,
        }
    }

    pub(crate) fn style(target: ElementId, property: StyleProperty, value: impl Into<String>) -> Self {
        Self::SetStyle {
            target,
            property,
            value: value.into(),
        }
    }

    /// Encode this effect as a stable JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Last display value written to `target` in `effects`, if any.
#[must_use]
pub fn final_display(effects: &[Effect], target: ElementId) -> Option<Display> {
    effects.iter().rev().find_map(|effect| match effect {
        Effect::SetDisplay { target: t, display } if *t == target => Some(*display),
        _ => None,
    })
}

/// Last marker value written to `target` in `effects`, if any.
#[must_use]
pub fn final_marker(effects: &[Effect], target: ElementId) -> Option<bool> {
    effects.iter().rev().find_map(|effect| match effect {
        Effect::SetMarker { target: t, on } if *t == target => Some(*on),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_kind_tag_and_bare_ids() {
        let effect = Effect::SetDisplay {
            target: ElementId::new(7),
            display: Display::None,
        };
        assert_eq!(
            effect.to_json_string().expect("serialize"),
            r#"{"kind":"set_display","target":7,"display":"none"}"#
        );
        assert_eq!(
            Effect::PreventDefault.to_json_string().expect("serialize"),
            r#"{"kind":"prevent_default"}"#
        );
    }

    #[test]
    fn final_values_take_the_last_write() {
        let id = ElementId::new(1);
        let effects = [
            Effect::SetMarker { target: id, on: false },
            Effect::SetDisplay {
                target: id,
                display: Display::None,
            },
            Effect::SetMarker { target: id, on: true },
        ];
        assert_eq!(final_marker(&effects, id), Some(true));
        assert_eq!(final_display(&effects, id), Some(Display::None));
        assert_eq!(final_display(&effects, ElementId::new(2)), None);
    }

    #[test]
    fn css_names() {
        assert_eq!(Display::shown(true).as_css(), "block");
        assert_eq!(Display::shown(false).as_css(), "none");
        assert_eq!(StyleProperty::Transition.css_name(), "transition");
    }
}

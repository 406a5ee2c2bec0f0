#![forbid(unsafe_code)]

//! Mobile navigation toggle.

use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::registry::{ElementId, ElementRegistry};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    #[default]
    Closed,
    Open,
}

impl NavState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }
}

/// Inputs the menu reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavInput {
    /// The toggle control itself was clicked.
    Toggle,
    /// A link inside the panel was clicked.
    Link,
    /// A click landed outside both the toggle and the panel.
    Outside,
}

/// Two-state menu bound to one toggle control and one panel.
#[derive(Debug, Clone)]
pub struct NavMenu {
    toggle: ElementId,
    panel: ElementId,
    links: Vec<ElementId>,
    state: NavState,
}

impl NavMenu {
    /// Arm the menu; `None` unless both the toggle and the panel exist.
    #[must_use]
    pub fn arm(registry: &ElementRegistry) -> Option<Self> {
        let toggle = registry.menu_toggle?;
        let panel = registry.nav_panel?;
        let state = if toggle.marked || panel.marked {
            NavState::Open
        } else {
            NavState::Closed
        };
        Some(Self {
            toggle: toggle.id,
            panel: panel.id,
            links: registry.nav_links.clone(),
            state,
        })
    }

    #[must_use]
    pub const fn state(&self) -> NavState {
        self.state
    }

    #[must_use]
    pub fn is_link(&self, id: ElementId) -> bool {
        self.links.contains(&id)
    }

    /// Advance the state machine and render the markers for the new state.
    ///
    /// Closing an already closed menu still re-renders; the markers end up in
    /// the same place either way.
    pub fn apply(&mut self, input: NavInput) -> Vec<Effect> {
        let next = match input {
            NavInput::Toggle => self.state.toggled(),
            NavInput::Link | NavInput::Outside => NavState::Closed,
        };
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, ?input, "nav menu transition");
        }
        self.state = next;
        self.render()
    }

    fn render(&self) -> Vec<Effect> {
        let on = self.state.is_open();
        vec![
            Effect::SetMarker {
                target: self.toggle,
                on,
            },
            Effect::SetMarker {
                target: self.panel,
                on,
            },
        ]
    }
}

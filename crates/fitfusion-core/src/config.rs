#![forbid(unsafe_code)]

//! Page configuration.
//!
//! Every section is `#[serde(default)]`, so a host may ship a partial JSON
//! object and keep the stock landing-page contract for everything it omits.

use serde::{Deserialize, Serialize};

use crate::reveal::RevealConfig;

/// Configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The JSON text did not match the schema.
    Parse(String),
    /// A selector or class name was empty.
    Empty(&'static str),
    /// Reveal threshold outside `[0, 1]`.
    Threshold(f64),
    /// Reveal transition with a zero duration.
    ZeroDuration,
    /// Session trace that could not hold a single event.
    ZeroTraceCapacity,
    /// Unknown log level name.
    LogLevel(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid page config: {msg}"),
            Self::Empty(field) => write!(f, "{field} must not be empty"),
            Self::Threshold(value) => {
                write!(f, "reveal threshold must be within [0, 1], got {value}")
            }
            Self::ZeroDuration => f.write_str("reveal duration must be non-zero"),
            Self::ZeroTraceCapacity => f.write_str("trace capacity must be non-zero"),
            Self::LogLevel(level) => write!(f, "unknown log level: {level}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Log verbosity accepted in [`PageConfig::log_level`], least verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [Self; 5] = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
    }
}

/// Selector contract between the markup and the features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub menu_toggle: String,
    pub nav_panel: String,
    /// Matched inside the nav panel only.
    pub nav_link: String,
    pub pricing_switch: String,
    pub monthly_price: String,
    pub yearly_price: String,
    pub filter_control: String,
    pub content_card: String,
    pub reveal_targets: Vec<String>,
    pub in_page_anchor: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            menu_toggle: ".menu-toggle".into(),
            nav_panel: ".nav-links".into(),
            nav_link: "a".into(),
            pricing_switch: ".toggle".into(),
            monthly_price: ".monthly-price".into(),
            yearly_price: ".yearly-price".into(),
            filter_control: ".filter-btn".into(),
            content_card: ".class-card".into(),
            reveal_targets: vec![
                ".step-card".into(),
                ".class-card".into(),
                ".testimonial".into(),
                ".pricing-card".into(),
            ],
            in_page_anchor: r##"a[href^="#"]"##.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Class toggled on controls and panels.
    pub active_class: String,
    /// Filter category that shows every card.
    pub all_category: String,
    /// Attribute carrying a control's or card's category.
    pub category_attribute: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            active_class: "active".into(),
            all_category: "all".into(),
            category_attribute: "data-category".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub selectors: SelectorConfig,
    pub markers: MarkerConfig,
    pub reveal: RevealConfig,
    /// Maximum event records kept by the session trace.
    pub trace_capacity: usize,
    /// A [`LogLevel`] name.
    pub log_level: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            selectors: SelectorConfig::default(),
            markers: MarkerConfig::default(),
            reveal: RevealConfig::default(),
            trace_capacity: 1024,
            log_level: LogLevel::Info.as_str().into(),
        }
    }
}

impl PageConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.selectors;
        let required = [
            ("selectors.menu_toggle", &s.menu_toggle),
            ("selectors.nav_panel", &s.nav_panel),
            ("selectors.nav_link", &s.nav_link),
            ("selectors.pricing_switch", &s.pricing_switch),
            ("selectors.monthly_price", &s.monthly_price),
            ("selectors.yearly_price", &s.yearly_price),
            ("selectors.filter_control", &s.filter_control),
            ("selectors.content_card", &s.content_card),
            ("selectors.in_page_anchor", &s.in_page_anchor),
            ("markers.active_class", &self.markers.active_class),
            ("markers.all_category", &self.markers.all_category),
            ("markers.category_attribute", &self.markers.category_attribute),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(field));
            }
        }
        if s.reveal_targets.iter().any(|sel| sel.trim().is_empty()) {
            return Err(ConfigError::Empty("selectors.reveal_targets"));
        }

        let threshold = self.reveal.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }
        if self.reveal.duration_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.trace_capacity == 0 {
            return Err(ConfigError::ZeroTraceCapacity);
        }

        match LogLevel::parse(&self.log_level) {
            Some(_) => Ok(()),
            None => Err(ConfigError::LogLevel(self.log_level.clone())),
        }
    }

    /// The configured level. Falls back to `Info` for a config that skipped
    /// [`PageConfig::validate`].
    #[must_use]
    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Info)
    }
}

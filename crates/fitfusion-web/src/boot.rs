#![forbid(unsafe_code)]

//! Host-independent pieces of page startup.

use std::cell::Cell;

use fitfusion_core::{ConfigError, PageConfig};

/// Id of the optional `<script type="application/json">` holding page config.
pub const CONFIG_ELEMENT_ID: &str = "fitfusion-config";

/// Resolve the page configuration from the optional embedded JSON.
///
/// Invalid JSON falls back to the defaults; the error is returned so the
/// caller can report it once logging is up.
#[must_use]
pub fn resolve_config(embedded: Option<&str>) -> (PageConfig, Option<ConfigError>) {
    match embedded.map(str::trim).filter(|text| !text.is_empty()) {
        None => (PageConfig::default(), None),
        Some(text) => match PageConfig::from_json_str(text) {
            Ok(config) => (config, None),
            Err(err) => (PageConfig::default(), Some(err)),
        },
    }
}

/// Single-shot latch guarding page initialization.
#[derive(Debug, Default)]
pub struct BootGuard {
    claimed: Cell<bool>,
}

impl BootGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            claimed: Cell::new(false),
        }
    }

    /// `true` for the first caller only.
    pub fn claim(&self) -> bool {
        !self.claimed.replace(true)
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.claimed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_config_uses_defaults() {
        for embedded in [None, Some(""), Some("  \n ")] {
            let (config, err) = resolve_config(embedded);
            assert_eq!(config, PageConfig::default());
            assert!(err.is_none());
        }
    }

    #[test]
    fn embedded_config_is_applied() {
        let (config, err) = resolve_config(Some(r#"{ "log_level": "debug" }"#));
        assert!(err.is_none());
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn broken_config_reports_and_falls_back() {
        let (config, err) = resolve_config(Some(r#"{ "reveal": { "threshold": -1 } }"#));
        assert_eq!(config, PageConfig::default());
        assert!(matches!(err, Some(ConfigError::Threshold(_))));
    }

    #[test]
    fn guard_claims_once() {
        let guard = BootGuard::new();
        assert!(!guard.is_claimed());
        assert!(guard.claim());
        assert!(!guard.claim());
        assert!(guard.is_claimed());
    }
}

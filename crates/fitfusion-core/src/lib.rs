#![forbid(unsafe_code)]

//! Host-agnostic behavior model for the FitFusion landing page.
//!
//! `fitfusion-core` owns everything the page does that is not a DOM call:
//! element discovery against an abstract [`ElementSource`], one explicit state
//! machine per feature, and a [`PageController`] that turns host events into
//! ordered [`Effect`] lists.
//!
//! # Features
//!
//! - **Nav**: mobile menu toggle, closed by links and outside clicks.
//! - **Pricing**: monthly / yearly switch over the price labels.
//! - **Filter**: class-card category filter with an `all` sentinel.
//! - **Anchors**: smooth scroll to in-page fragments.
//! - **Reveal**: one-shot fade-in of content blocks entering the viewport.
//!
//! Each feature is armed only if its elements exist; a page without them is a
//! valid page where that feature does nothing.
//!
//! # Design principles
//!
//! - **No I/O**: the host discovers elements, delivers events and applies
//!   effects. Nothing here depends on a browser.
//! - **Explicit state**: toggles and selections live in enums; the DOM marker
//!   class is an output, never an input.
//! - **Deterministic**: identical registry and events always produce identical
//!   effects, which [`trace`] records and replays.

pub mod anchor;
pub mod config;
pub mod controller;
pub mod effect;
pub mod filter;
pub mod nav;
pub mod pricing;
pub mod registry;
pub mod reveal;
pub mod trace;

pub use anchor::{AnchorScroll, FragmentResolver, NoFragments, fragment_of};
pub use config::{ConfigError, LogLevel, MarkerConfig, PageConfig, SelectorConfig};
pub use controller::{ArmedFeatures, PageController, PageEvent};
pub use effect::{BlockAlign, Display, Effect, ScrollBehavior, StyleProperty};
pub use filter::CategoryFilter;
pub use nav::{NavInput, NavMenu, NavState};
pub use pricing::{BillingPeriod, PricingSwitch};
pub use registry::{
    AnchorLink, ContentCard, ElementId, ElementRegistry, ElementSource, FilterControl,
    MarkedElement,
};
pub use reveal::{IntersectionSample, Rect, RevealConfig, RevealSet, Viewport};
pub use trace::{ReplayReport, SessionTrace, TraceError, TraceRecord, replay};

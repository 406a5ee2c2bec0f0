#![forbid(unsafe_code)]

//! WASM front end for the FitFusion landing page.
//!
//! The module start function boots the page once the document is parsed:
//! - discovers elements into a `fitfusion-core` registry,
//! - registers one browser listener per feature and an intersection observer,
//! - feeds DOM events to the controller and applies the returned effects.
//!
//! Native builds compile only the host-independent parts (logging layer and
//! startup helpers) so the workspace checks and tests on any target.

pub mod boot;
pub mod logging;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{armed_features, destroy, session_trace_jsonl};

//! Application-level orchestration.
//!
//! `Dashboard` owns the session state and the refresh/run workflows; the
//! controller loop feeds it commands from presentation layers and streams
//! state snapshots back to them.

#[cfg_attr(not(feature = "tui"), allow(dead_code))]
mod controller;
mod dashboard;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use dashboard::{Dashboard, RunOutcome};

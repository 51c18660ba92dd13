//! Sync engine for opnsync
//!
//! The engine orchestrates:
//! 1. Planning - Turn manifest groups into bulk passes
//! 2. Diffing - Reconcile every pass in dry run and show the result
//! 3. Executing - Confirm, then run the passes for real

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::SyncPlan;

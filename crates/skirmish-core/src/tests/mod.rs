//! Crate-level tests.
//!
//! - `helpers.rs`: encounter factories shared by every test module
//! - `integration.rs`: full turns driven through the executor and the AI
//! - `scenarios.rs`: worked rules examples with exact numbers
//! - `determinism.rs`: seeded replays and property tests

pub mod helpers;
mod determinism;
mod integration;

// Re-export for convenience
pub use helpers::*;

//! # Integration Scenarios
//!
//! End-to-end behavior of the fixture types across the whole engine.

pub mod async_rules;
pub mod authorization;
pub mod edit_lifecycle;
pub mod graph_identity;
pub mod properties;
pub mod rules;

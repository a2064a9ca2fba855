//! # Bizframe Test Suite
//!
//! Unified test crate for the lifecycle engine.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs       # Customer, OrderLine, Address, Account
//! │   └── integration/      # Cross-module scenarios
//! │       ├── async_rules.rs
//! │       ├── authorization.rs
//! │       ├── edit_lifecycle.rs
//! │       ├── graph_identity.rs
//! │       ├── persistence.rs
//! │       ├── properties.rs
//! │       └── rules.rs
//! └── benches/
//!     └── object_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bizframe-tests
//!
//! # By area
//! cargo test -p bizframe-tests integration::edit_lifecycle::
//! cargo test -p bizframe-tests integration::persistence::
//!
//! # Benchmarks
//! cargo bench -p bizframe-tests
//! ```
//!
//! Set `BF_LOG_LEVEL=debug` to see engine logs while a test runs.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod integration;

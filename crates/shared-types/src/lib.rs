//! # Shared Types Crate
//!
//! Vocabulary shared across the Bizframe workspace.
//!
//! ## Contents
//!
//! - **Errors**: `FrameworkError`, the single error taxonomy surfaced by the
//!   lifecycle engine, the notification bus and the data portal.
//! - **Entities**: `TypeName`, `RuleSeverity`, `AuthorizationAction`.
//! - **Security**: `Principal`, the identity consulted by authorization rules.
//!
//! ## Design Principles
//!
//! - **No engine types here**: business objects, field values and rules live in
//!   `bizframe-core`; this crate only holds what the bus and the engine must
//!   agree on.
//! - **Cloneable errors**: errors travel through broadcast channels and object
//!   events, so every error is `Clone`.

pub mod entities;
pub mod errors;
pub mod security;

pub use entities::*;
pub use errors::*;
pub use security::*;

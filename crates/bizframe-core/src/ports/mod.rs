//! Ports: what a host plugs into the engine.

pub mod definition;
pub mod persistence;

pub use definition::{BusinessType, NoHooks, ObjectHooks};
pub use persistence::ObjectPersistence;

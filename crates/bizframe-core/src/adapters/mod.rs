//! Adapters between the engine and its outer ports.

pub(crate) mod bus;
pub mod data_portal;

pub use data_portal::LocalDataPortal;

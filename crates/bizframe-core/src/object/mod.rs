//! Business objects, lists and the graph that links them.

mod access;
mod business_object;
mod busy;
mod bypass;
mod edit;
mod graph;
mod list;
mod listeners;
mod properties;
mod validation;

pub use business_object::BusinessObject;
pub use busy::CancellationSignal;
pub use bypass::{BypassGuard, RuleSuppressionGuard};
pub use graph::GraphNode;
pub use list::BusinessList;
pub use properties::FieldAccessor;

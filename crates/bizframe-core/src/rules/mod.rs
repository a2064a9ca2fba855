//! Business and authorization rules.

pub mod authorization;
pub mod common;
pub mod registry;
pub mod rule;

pub use authorization::{
    AuthorizationCache, AuthorizationContext, AuthorizationLambda, AuthorizationRule, IsInRole,
    IsNotInRole,
};
pub use common::{
    AsyncLambda, Dependency, Lambda, MaxLength, MaxValue, MinLength, MinValue, RegexMatch,
    Required,
};
pub use registry::{RuleRegistry, RuleSet, RuleSetBuilder, TypeRules};
pub use rule::{AsyncBusinessRule, BusinessRule, RegisteredRule, RuleContext, RuleInfo, RuleResult};

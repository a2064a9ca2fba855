//! Common business rules.

use super::rule::{AsyncBusinessRule, BusinessRule, RuleContext, RuleInfo, RuleResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use regex::Regex;
use shared_types::{FrameworkError, RuleSeverity};

/// Adds the builder methods every message-producing rule shares.
macro_rules! rule_builders {
    ($($rule:ident),* $(,)?) => {
        $(
            impl $rule {
                #[must_use]
                pub fn with_priority(mut self, priority: i32) -> Self {
                    self.info = self.info.with_priority(priority);
                    self
                }

                #[must_use]
                pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
                    self.severity = severity;
                    self
                }

                /// Replace the default message.
                #[must_use]
                pub fn with_message(mut self, message: impl Into<String>) -> Self {
                    self.message = Some(message.into());
                    self
                }

                #[must_use]
                pub fn affects<I, S>(mut self, properties: I) -> Self
                where
                    I: IntoIterator<Item = S>,
                    S: Into<String>,
                {
                    self.info = self.info.affects(properties);
                    self
                }

                fn report(&self, context: &mut RuleContext, default_message: String) {
                    let message = self.message.clone().unwrap_or(default_message);
                    context.add_result(RuleResult::new(self.severity, message));
                }
            }
        )*
    };
}

/// Value must not be null or empty text.
#[derive(Debug, Clone)]
pub struct Required {
    info: RuleInfo,
    severity: RuleSeverity,
    message: Option<String>,
}

impl Required {
    pub fn new(property: &str) -> Self {
        Self {
            info: RuleInfo::new("Required", Some(property)),
            severity: RuleSeverity::Error,
            message: None,
        }
    }
}

impl BusinessRule for Required {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        let value = context.primary_value();
        let blank = match value.as_str() {
            Some(text) => text.trim().is_empty(),
            None => value.is_null(),
        };
        if blank {
            let message = format!("{} required", context.friendly_name());
            self.report(context, message);
        }
    }
}

/// Text must not exceed `max` characters.
#[derive(Debug, Clone)]
pub struct MaxLength {
    info: RuleInfo,
    max: usize,
    severity: RuleSeverity,
    message: Option<String>,
}

impl MaxLength {
    pub fn new(property: &str, max: usize) -> Self {
        Self {
            info: RuleInfo::new("MaxLength", Some(property)),
            max,
            severity: RuleSeverity::Error,
            message: None,
        }
    }
}

impl BusinessRule for MaxLength {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        let length = context.primary_value().to_string().chars().count();
        if length > self.max {
            let message = format!(
                "{} can not exceed {} characters",
                context.friendly_name(),
                self.max
            );
            self.report(context, message);
        }
    }
}

/// Text must have at least `min` characters.
#[derive(Debug, Clone)]
pub struct MinLength {
    info: RuleInfo,
    min: usize,
    severity: RuleSeverity,
    message: Option<String>,
}

impl MinLength {
    pub fn new(property: &str, min: usize) -> Self {
        Self {
            info: RuleInfo::new("MinLength", Some(property)),
            min,
            severity: RuleSeverity::Error,
            message: None,
        }
    }
}

impl BusinessRule for MinLength {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        let length = context.primary_value().to_string().chars().count();
        if length < self.min {
            let message = format!(
                "{} must be at least {} characters",
                context.friendly_name(),
                self.min
            );
            self.report(context, message);
        }
    }
}

/// Numeric value must be at least `min`. Null passes.
#[derive(Debug, Clone)]
pub struct MinValue {
    info: RuleInfo,
    min: f64,
    severity: RuleSeverity,
    message: Option<String>,
}

impl MinValue {
    pub fn new(property: &str, min: impl Into<f64>) -> Self {
        Self {
            info: RuleInfo::new("MinValue", Some(property)),
            min: min.into(),
            severity: RuleSeverity::Error,
            message: None,
        }
    }
}

impl BusinessRule for MinValue {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        if let Some(value) = context.primary_value().as_f64() {
            if value < self.min {
                let message = format!("{} must be at least {}", context.friendly_name(), self.min);
                self.report(context, message);
            }
        }
    }
}

/// Numeric value must not exceed `max`. Null passes.
#[derive(Debug, Clone)]
pub struct MaxValue {
    info: RuleInfo,
    max: f64,
    severity: RuleSeverity,
    message: Option<String>,
}

impl MaxValue {
    pub fn new(property: &str, max: impl Into<f64>) -> Self {
        Self {
            info: RuleInfo::new("MaxValue", Some(property)),
            max: max.into(),
            severity: RuleSeverity::Error,
            message: None,
        }
    }
}

impl BusinessRule for MaxValue {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        if let Some(value) = context.primary_value().as_f64() {
            if value > self.max {
                let message = format!("{} can not exceed {}", context.friendly_name(), self.max);
                self.report(context, message);
            }
        }
    }
}

/// Text must match a regular expression. Empty text passes; pair with
/// [`Required`] to reject it.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    info: RuleInfo,
    pattern: Regex,
    severity: RuleSeverity,
    message: Option<String>,
}

impl RegexMatch {
    pub fn new(property: &str, pattern: &str) -> Result<Self, FrameworkError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            FrameworkError::rule_configuration(format!("RegexMatch/{property}"), e.to_string())
        })?;
        Ok(Self {
            info: RuleInfo::new("RegexMatch", Some(property)),
            pattern,
            severity: RuleSeverity::Error,
            message: None,
        })
    }
}

impl BusinessRule for RegexMatch {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        let text = context.primary_value().to_string();
        if !text.is_empty() && !self.pattern.is_match(&text) {
            let message = format!("{} value is invalid", context.friendly_name());
            self.report(context, message);
        }
    }
}

rule_builders!(Required, MaxLength, MinLength, MinValue, MaxValue, RegexMatch);

/// Re-validates and notifies dependent properties when the primary changes.
#[derive(Debug, Clone)]
pub struct Dependency {
    info: RuleInfo,
}

impl Dependency {
    pub fn new<I, S>(property: &str, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            info: RuleInfo::new("Dependency", Some(property)).affects(dependents),
        }
    }
}

impl BusinessRule for Dependency {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, _context: &mut RuleContext) {}
}

type RuleFn = dyn Fn(&mut RuleContext) + Send + Sync;

/// Closure-backed synchronous rule.
pub struct Lambda {
    info: RuleInfo,
    rule: Box<RuleFn>,
}

impl Lambda {
    /// `property` is the primary property, or `None` for an object rule.
    pub fn new<F>(property: Option<&str>, rule: F) -> Self
    where
        F: Fn(&mut RuleContext) + Send + Sync + 'static,
    {
        Self {
            info: RuleInfo::new("Lambda", property),
            rule: Box::new(rule),
        }
    }

    /// Adjust the rule's descriptor (priority, inputs, affected properties).
    #[must_use]
    pub fn with_info(mut self, configure: impl FnOnce(RuleInfo) -> RuleInfo) -> Self {
        self.info = configure(self.info);
        self
    }
}

impl BusinessRule for Lambda {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn execute(&self, context: &mut RuleContext) {
        (self.rule)(context);
    }
}

type AsyncRuleFn = dyn Fn(RuleContext) -> BoxFuture<'static, RuleContext> + Send + Sync;

/// Closure-backed asynchronous rule.
pub struct AsyncLambda {
    info: RuleInfo,
    rule: Box<AsyncRuleFn>,
}

impl AsyncLambda {
    pub fn new<F>(property: Option<&str>, rule: F) -> Self
    where
        F: Fn(RuleContext) -> BoxFuture<'static, RuleContext> + Send + Sync + 'static,
    {
        Self {
            info: RuleInfo::new("AsyncLambda", property),
            rule: Box::new(rule),
        }
    }

    #[must_use]
    pub fn with_info(mut self, configure: impl FnOnce(RuleInfo) -> RuleInfo) -> Self {
        self.info = configure(self.info);
        self
    }
}

#[async_trait]
impl AsyncBusinessRule for AsyncLambda {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    async fn execute(&self, context: RuleContext) -> RuleContext {
        (self.rule)(context).await
    }
}

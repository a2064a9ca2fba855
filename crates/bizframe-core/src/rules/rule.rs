//! Rule contracts: descriptors, execution context and results.

use crate::domain::metadata::PropertyDescriptor;
use crate::domain::value::FieldValue;
use crate::object::BusinessObject;
use async_trait::async_trait;
use shared_types::{FrameworkError, Principal, RuleSeverity};
use std::collections::HashMap;
use std::sync::Arc;

/// Static description of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    rule_type: String,
    primary_property: Option<String>,
    input_properties: Vec<String>,
    affected_properties: Vec<String>,
    priority: i32,
    can_run_as_affected_property: bool,
}

impl RuleInfo {
    /// A rule of `rule_type` bound to `primary` (`None` for object rules).
    pub fn new(rule_type: impl Into<String>, primary: Option<&str>) -> Self {
        Self {
            rule_type: rule_type.into(),
            primary_property: primary.map(str::to_string),
            input_properties: Vec::new(),
            affected_properties: Vec::new(),
            priority: 0,
            can_run_as_affected_property: true,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Extra properties whose values the rule reads.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// Properties re-validated and notified after this rule runs.
    #[must_use]
    pub fn affects<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// Whether the rule runs when its property is re-checked as affected.
    #[must_use]
    pub fn run_as_affected(mut self, allowed: bool) -> Self {
        self.can_run_as_affected_property = allowed;
        self
    }

    #[must_use]
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    #[must_use]
    pub fn primary_property(&self) -> Option<&str> {
        self.primary_property.as_deref()
    }

    #[must_use]
    pub fn input_properties(&self) -> &[String] {
        &self.input_properties
    }

    #[must_use]
    pub fn affected_properties(&self) -> &[String] {
        &self.affected_properties
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn can_run_as_affected_property(&self) -> bool {
        self.can_run_as_affected_property
    }

    /// Primary and input properties.
    pub fn read_properties(&self) -> impl Iterator<Item = &str> {
        self.primary_property
            .iter()
            .chain(self.input_properties.iter())
            .map(String::as_str)
    }
}

/// One outcome reported by a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub severity: RuleSeverity,
    pub description: String,
    /// Skip the remaining rules of this run.
    pub stop_processing: bool,
    /// Further properties the outcome is reported against.
    pub properties: Vec<String>,
}

impl RuleResult {
    pub fn new(severity: RuleSeverity, description: impl Into<String>) -> Self {
        Self {
            severity,
            description: description.into(),
            stop_processing: false,
            properties: Vec::new(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(RuleSeverity::Error, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(RuleSeverity::Warning, description)
    }

    pub fn information(description: impl Into<String>) -> Self {
        Self::new(RuleSeverity::Information, description)
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new(RuleSeverity::Success, description)
    }

    #[must_use]
    pub fn stop(mut self) -> Self {
        self.stop_processing = true;
        self
    }

    #[must_use]
    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(Into::into));
        self
    }
}

/// Check reported results and keep the ones worth recording.
///
/// A failure without a description is a defect in the rule. Success results
/// are kept only when they carry a message.
pub(crate) fn validate_results(
    rule_name: &str,
    results: Vec<RuleResult>,
) -> Result<Vec<RuleResult>, FrameworkError> {
    if results
        .iter()
        .any(|r| r.severity != RuleSeverity::Success && r.description.trim().is_empty())
    {
        return Err(FrameworkError::rule_configuration(
            rule_name,
            "a failed result must have a description",
        ));
    }
    Ok(results
        .into_iter()
        .filter(|r| !r.description.is_empty())
        .collect())
}

/// Everything a rule sees while it runs, and everything it reports.
pub struct RuleContext {
    rule_name: String,
    primary: Option<PropertyDescriptor>,
    origin_property: Option<String>,
    target: Option<BusinessObject>,
    inputs: HashMap<String, FieldValue>,
    outputs: Vec<(String, FieldValue)>,
    results: Vec<RuleResult>,
    principal: Arc<Principal>,
}

impl RuleContext {
    pub(crate) fn new(
        rule_name: String,
        primary: Option<PropertyDescriptor>,
        origin_property: Option<String>,
        target: Option<BusinessObject>,
        inputs: HashMap<String, FieldValue>,
        principal: Arc<Principal>,
    ) -> Self {
        Self {
            rule_name,
            primary,
            origin_property,
            target,
            inputs,
            outputs: Vec::new(),
            results: Vec::new(),
            principal,
        }
    }

    /// The object under validation. Async rules get `None`: they run
    /// detached and must work from their inputs.
    #[must_use]
    pub fn target(&self) -> Option<&BusinessObject> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    #[must_use]
    pub fn primary_property(&self) -> Option<&PropertyDescriptor> {
        self.primary.as_ref()
    }

    /// Property whose check triggered this run.
    #[must_use]
    pub fn origin_property(&self) -> Option<&str> {
        self.origin_property.as_deref()
    }

    /// Display name of the primary property, or `""` for object rules.
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        self.primary
            .as_ref()
            .map_or("", |p| p.friendly_name.as_str())
    }

    /// Value of the primary property when the run started.
    #[must_use]
    pub fn primary_value(&self) -> FieldValue {
        self.primary
            .as_ref()
            .and_then(|p| self.inputs.get(&p.name))
            .cloned()
            .unwrap_or_default()
    }

    /// Value of a primary or input property when the run started.
    #[must_use]
    pub fn input(&self, property: &str) -> Option<&FieldValue> {
        self.inputs.get(property)
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn add_result(&mut self, result: RuleResult) {
        self.results.push(result);
    }

    pub fn add_error(&mut self, description: impl Into<String>) {
        self.add_result(RuleResult::error(description));
    }

    pub fn add_warning(&mut self, description: impl Into<String>) {
        self.add_result(RuleResult::warning(description));
    }

    pub fn add_information(&mut self, description: impl Into<String>) {
        self.add_result(RuleResult::information(description));
    }

    pub fn add_success(&mut self, description: impl Into<String>) {
        self.add_result(RuleResult::success(description));
    }

    /// Write a value back into the object when the rule finishes.
    pub fn add_output_value(&mut self, property: impl Into<String>, value: impl Into<FieldValue>) {
        self.outputs.push((property.into(), value.into()));
    }

    #[must_use]
    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    #[must_use]
    pub fn outputs(&self) -> &[(String, FieldValue)] {
        &self.outputs
    }

    pub(crate) fn into_outcome(self) -> (Vec<RuleResult>, Vec<(String, FieldValue)>) {
        (self.results, self.outputs)
    }
}

/// A synchronous business rule.
pub trait BusinessRule: Send + Sync {
    fn info(&self) -> &RuleInfo;

    fn execute(&self, context: &mut RuleContext);
}

/// An asynchronous business rule, run on a background task.
#[async_trait]
pub trait AsyncBusinessRule: Send + Sync {
    fn info(&self) -> &RuleInfo;

    async fn execute(&self, context: RuleContext) -> RuleContext;
}

#[derive(Clone)]
pub(crate) enum RuleHandle {
    Sync(Arc<dyn BusinessRule>),
    Async(Arc<dyn AsyncBusinessRule>),
}

/// A rule registered on a type, with its unique name.
pub struct RegisteredRule {
    name: String,
    info: RuleInfo,
    handle: RuleHandle,
    order: usize,
}

impl RegisteredRule {
    pub(crate) fn new(name: String, handle: RuleHandle, order: usize) -> Self {
        let info = match &handle {
            RuleHandle::Sync(rule) => rule.info().clone(),
            RuleHandle::Async(rule) => rule.info().clone(),
        };
        Self {
            name,
            info,
            handle,
            order,
        }
    }

    /// Unique rule URI, `rule://<type>/<rule>/<property>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn info(&self) -> &RuleInfo {
        &self.info
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.info.priority()
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.handle, RuleHandle::Async(_))
    }

    /// Registration order within the type.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn handle(&self) -> &RuleHandle {
        &self.handle
    }
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("name", &self.name)
            .field("priority", &self.info.priority)
            .field("is_async", &self.is_async())
            .finish()
    }
}

//! # Rule Execution
//!
//! Runs a type's rules against one instance.
//!
//! ## Order
//!
//! Rules run in ascending priority, registration order within a priority.
//! After the first Error, rules with a priority above
//! `process_through_priority` are skipped; a result flagged
//! `stop_processing` ends the run.
//!
//! ## Affected Properties
//!
//! A run returns the checked property followed by every property a rule
//! named as affected or wrote through an output value. Affected properties
//! have their `run_as_affected` rules re-run once, without further cascading.
//! The caller raises `PropertyChanged` for the returned list after the run.
//!
//! ## Async Rules
//!
//! Async rules are started on the context's runtime and counted as busy.
//! Their completion replaces the broken rules of their own (rule, origin)
//! pair and raises notifications from the completing task.

use super::business_object::BusinessObject;
use super::bypass::RuleDepthGuard;
use crate::adapters::bus;
use crate::domain::broken_rules::RuleOrigin;
use crate::domain::events::ObjectEvent;
use crate::domain::metadata::{PropertyDescriptor, PropertyKey};
use crate::domain::value::FieldValue;
use crate::rules::rule::{validate_results, AsyncBusinessRule, RuleHandle};
use crate::rules::{RegisteredRule, RuleContext, RuleResult};
use futures::FutureExt;
use shared_types::FrameworkError;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

fn merge<I, S>(into: &mut Vec<String>, names: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for name in names {
        let name = name.as_ref();
        if !into.iter().any(|existing| existing == name) {
            into.push(name.to_string());
        }
    }
}

impl BusinessObject {
    /// Run every property's rules, then the object rules.
    pub fn check_rules(&self) -> Result<(), FrameworkError> {
        if self.is_rule_checking_suppressed() {
            return Ok(());
        }
        let mut changed = Vec::new();
        for name in self.cell().rules.properties_with_rules() {
            let descriptor = self.property(name.as_str())?;
            let affected = self.run_property_rules(&descriptor)?;
            merge(&mut changed, affected);
        }
        merge(&mut changed, self.run_object_rules()?);
        for property in changed {
            self.emit(ObjectEvent::PropertyChanged { property });
        }
        Ok(())
    }

    /// Run the rules not bound to a property.
    pub fn check_object_rules(&self) -> Result<(), FrameworkError> {
        for property in self.run_object_rules()? {
            self.emit(ObjectEvent::PropertyChanged { property });
        }
        Ok(())
    }

    /// Run one property's rules; returns the properties notified as changed.
    pub fn check_property_rules(
        &self,
        key: impl PropertyKey,
    ) -> Result<Vec<String>, FrameworkError> {
        let descriptor = self.property(key)?;
        let changed = self.run_property_rules(&descriptor)?;
        for property in &changed {
            self.emit(ObjectEvent::PropertyChanged {
                property: property.clone(),
            });
        }
        Ok(changed)
    }

    pub(super) fn run_property_rules(
        &self,
        descriptor: &PropertyDescriptor,
    ) -> Result<Vec<String>, FrameworkError> {
        let mut affected = vec![descriptor.name.clone()];
        if self.is_rule_checking_suppressed() {
            return Ok(affected);
        }
        let max_depth = self.context().config().rules.max_rule_depth;
        let _depth = RuleDepthGuard::enter(&self.cell().rule_depth, max_depth)?;

        let rules = self.cell().rules.rules_for_property(&descriptor.name);
        self.execute_rules(&rules, Some(&descriptor.name), &mut affected)?;

        let dependents: Vec<String> = affected.iter().skip(1).cloned().collect();
        for name in dependents {
            let rules = self.cell().rules.rules_as_affected(&name);
            if rules.is_empty() {
                continue;
            }
            let mut nested = vec![name.clone()];
            self.execute_rules(&rules, Some(&name), &mut nested)?;
            merge(&mut affected, nested);
        }
        Ok(affected)
    }

    fn run_object_rules(&self) -> Result<Vec<String>, FrameworkError> {
        let mut affected = Vec::new();
        if self.is_rule_checking_suppressed() {
            return Ok(affected);
        }
        let max_depth = self.context().config().rules.max_rule_depth;
        let _depth = RuleDepthGuard::enter(&self.cell().rule_depth, max_depth)?;
        let rules = self.cell().rules.object_rules();
        self.execute_rules(&rules, None, &mut affected)?;
        Ok(affected)
    }

    fn execute_rules(
        &self,
        rules: &[Arc<RegisteredRule>],
        origin: Option<&str>,
        affected: &mut Vec<String>,
    ) -> Result<(), FrameworkError> {
        let process_through = self.context().config().rules.process_through_priority;
        let mut errored = false;
        let mut errors_changed = false;

        for rule in rules {
            if errored && rule.priority() > process_through {
                break;
            }
            match rule.handle() {
                RuleHandle::Sync(handler) => {
                    let mut context = self.rule_context(rule, origin, true)?;
                    handler.execute(&mut context);
                    let (results, outputs) = context.into_outcome();
                    let results = validate_results(rule.name(), results)?;

                    errored |= results.iter().any(|r| r.severity.blocks_validity());
                    let stop = results.iter().any(|r| r.stop_processing);
                    errors_changed |= self.record_results(rule, origin, &results);
                    self.apply_outputs(outputs, affected)?;
                    merge(affected, rule.info().affected_properties());
                    if stop {
                        debug!(rule = %rule.name(), "Rule requested stop");
                        break;
                    }
                }
                RuleHandle::Async(handler) => {
                    self.start_async_rule(rule, handler.clone(), origin)?;
                }
            }
        }

        if errors_changed {
            self.emit(ObjectEvent::ErrorsChanged {
                property: origin.map(str::to_string),
            });
        }
        Ok(())
    }

    fn rule_context(
        &self,
        rule: &RegisteredRule,
        origin: Option<&str>,
        with_target: bool,
    ) -> Result<RuleContext, FrameworkError> {
        let info = rule.info();
        let primary = info
            .primary_property()
            .map(|name| self.property(name))
            .transpose()?;
        let descriptors = info
            .read_properties()
            .map(|name| self.property(name))
            .collect::<Result<Vec<_>, _>>()?;

        let inputs: HashMap<String, FieldValue> = {
            let state = self.state();
            descriptors
                .iter()
                .map(|d| (d.name.clone(), state.fields.value_or_default(d)))
                .collect()
        };

        Ok(RuleContext::new(
            rule.name().to_string(),
            primary,
            origin.map(str::to_string),
            with_target.then(|| self.clone()),
            inputs,
            self.context().principal(),
        ))
    }

    fn record_results(
        &self,
        rule: &RegisteredRule,
        origin: Option<&str>,
        results: &[RuleResult],
    ) -> bool {
        let origin = RuleOrigin {
            rule_name: rule.name(),
            origin_property: origin,
            primary_property: rule.info().primary_property(),
            priority: rule.priority(),
        };
        self.state().broken_rules.set_broken_rules(origin, results)
    }

    /// Write rule outputs: dirty, no notification.
    fn apply_outputs(
        &self,
        outputs: Vec<(String, FieldValue)>,
        affected: &mut Vec<String>,
    ) -> Result<(), FrameworkError> {
        let cascade = self.context().config().rules.cascade_on_dirty_properties;
        for (name, value) in outputs {
            let descriptor = self.property(name.as_str())?;
            let value = value.coerce(descriptor.kind, &descriptor.name)?;
            let change = self.store(&descriptor, value, true)?;
            merge(affected, [&descriptor.name]);
            if cascade && change.is_changed() {
                let nested = self.run_property_rules(&descriptor)?;
                merge(affected, nested);
            }
        }
        Ok(())
    }

    fn start_async_rule(
        &self,
        rule: &Arc<RegisteredRule>,
        handler: Arc<dyn AsyncBusinessRule>,
        origin: Option<&str>,
    ) -> Result<(), FrameworkError> {
        let runtime = self.context().runtime()?;
        let context = self.rule_context(rule, origin, false)?;
        let property = rule.info().primary_property().map(str::to_string);

        self.cell().busy.rule_started(property.as_deref());
        self.emit(ObjectEvent::BusyChanged {
            property: property.clone(),
            busy: true,
        });

        let object = self.clone();
        let rule = rule.clone();
        let origin = origin.map(str::to_string);
        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(handler.execute(context))
                .catch_unwind()
                .await
                .ok();
            object.complete_async_rule(&rule, origin.as_deref(), property, outcome);
        });
        Ok(())
    }

    fn complete_async_rule(
        &self,
        rule: &RegisteredRule,
        origin: Option<&str>,
        property: Option<String>,
        outcome: Option<RuleContext>,
    ) {
        let mut changed = Vec::new();
        match outcome {
            Some(context) => {
                let (results, outputs) = context.into_outcome();
                match validate_results(rule.name(), results) {
                    Ok(results) => {
                        let errors_changed = self.record_results(rule, origin, &results);
                        merge(&mut changed, property.iter());
                        if let Err(error) = self.apply_outputs(outputs, &mut changed) {
                            self.report_unhandled(property.clone(), error);
                        }
                        merge(&mut changed, rule.info().affected_properties());
                        if errors_changed {
                            self.emit(ObjectEvent::ErrorsChanged {
                                property: origin.map(str::to_string),
                            });
                        }
                    }
                    Err(error) => self.report_unhandled(property.clone(), error),
                }
            }
            None => self.report_unhandled(
                property.clone(),
                FrameworkError::invalid_operation(format!("async rule {} panicked", rule.name())),
            ),
        }

        for name in changed {
            self.emit(ObjectEvent::PropertyChanged { property: name });
        }

        let remaining = self.cell().busy.rule_finished(property.as_deref());
        self.emit(ObjectEvent::BusyChanged {
            property,
            busy: false,
        });
        if remaining == 0 {
            self.emit(ObjectEvent::ValidationComplete);
            bus::publish_validation_complete(self.context(), self.type_name(), self.identity());
        }
    }
}

//! Scoped guards over an object's counters.

use super::business_object::BusinessObject;
use shared_types::FrameworkError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// While held, property writes skip authorization, notifications and rules.
///
/// Guards nest; checks resume when the last one drops.
#[must_use = "checks resume as soon as the guard is dropped"]
pub struct BypassGuard {
    object: BusinessObject,
}

impl BypassGuard {
    pub(crate) fn new(object: BusinessObject) -> Self {
        object.cell().bypass.fetch_add(1, Ordering::AcqRel);
        Self { object }
    }
}

impl Drop for BypassGuard {
    fn drop(&mut self) {
        self.object.cell().bypass.fetch_sub(1, Ordering::AcqRel);
    }
}

/// While held, rule checks on the object do nothing.
#[must_use = "rule checking resumes as soon as the guard is dropped"]
pub struct RuleSuppressionGuard {
    object: BusinessObject,
}

impl RuleSuppressionGuard {
    pub(crate) fn new(object: BusinessObject) -> Self {
        object
            .cell()
            .rule_suppression
            .fetch_add(1, Ordering::AcqRel);
        Self { object }
    }
}

impl Drop for RuleSuppressionGuard {
    fn drop(&mut self) {
        self.object
            .cell()
            .rule_suppression
            .fetch_sub(1, Ordering::AcqRel);
    }
}

/// Counts one level of nested rule runs.
pub(crate) struct RuleDepthGuard<'a> {
    depth: &'a AtomicUsize,
}

impl<'a> RuleDepthGuard<'a> {
    pub(crate) fn enter(depth: &'a AtomicUsize, max: usize) -> Result<Self, FrameworkError> {
        let level = depth.fetch_add(1, Ordering::AcqRel) + 1;
        if level > max {
            depth.fetch_sub(1, Ordering::AcqRel);
            return Err(FrameworkError::invalid_operation(format!(
                "rule runs nested deeper than {max}"
            )));
        }
        Ok(Self { depth })
    }
}

impl Drop for RuleDepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

//! # Broken Rules
//!
//! Recorded rule failures of one object.
//!
//! Each rule run replaces exactly the entries that share its (rule name,
//! origin property) pair, so running the same failing rule twice leaves one
//! entry. Replacement happens in a single `&mut` call under the owning
//! object's lock; readers never see both the old and the new outcome.

use crate::rules::RuleResult;
use shared_types::RuleSeverity;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenRule {
    rule_name: String,
    description: String,
    severity: RuleSeverity,
    origin_property: Option<String>,
    property: Option<String>,
    priority: i32,
    display_index: usize,
}

impl BrokenRule {
    /// Human-readable message.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn severity(&self) -> RuleSeverity {
        self.severity
    }

    /// Property the failure is reported against (`None` for object rules).
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// URI of the rule that produced this entry.
    #[must_use]
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Insertion order, for stable display.
    #[must_use]
    pub fn display_index(&self) -> usize {
        self.display_index
    }
}

/// Where a batch of results came from.
#[derive(Debug, Clone, Copy)]
pub struct RuleOrigin<'a> {
    pub rule_name: &'a str,
    /// Property whose check triggered the run.
    pub origin_property: Option<&'a str>,
    /// Property the rule is bound to.
    pub primary_property: Option<&'a str>,
    pub priority: i32,
}

/// Broken rules of one object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokenRulesCollection {
    rules: Vec<BrokenRule>,
    next_display_index: usize,
}

impl BrokenRulesCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries of `origin`'s (rule, origin property) pair with
    /// `results`. Returns whether the visible set changed.
    pub fn set_broken_rules(&mut self, origin: RuleOrigin<'_>, results: &[RuleResult]) -> bool {
        let before: Vec<BrokenRule> = self
            .rules
            .iter()
            .filter(|r| Self::same_source(r, &origin))
            .cloned()
            .collect();
        self.rules.retain(|r| !Self::same_source(r, &origin));

        let mut added = Vec::new();
        for result in results {
            let targets = std::iter::once(origin.primary_property.map(str::to_string))
                .chain(result.properties.iter().cloned().map(Some));
            for property in targets {
                added.push(BrokenRule {
                    rule_name: origin.rule_name.to_string(),
                    description: result.description.clone(),
                    severity: result.severity,
                    origin_property: origin.origin_property.map(str::to_string),
                    property,
                    priority: origin.priority,
                    display_index: self.next_display_index,
                });
                self.next_display_index += 1;
            }
        }

        let changed = before.len() != added.len()
            || before.iter().zip(&added).any(|(old, new)| {
                old.description != new.description
                    || old.severity != new.severity
                    || old.property != new.property
            });
        self.rules.extend(added);
        changed
    }

    fn same_source(rule: &BrokenRule, origin: &RuleOrigin<'_>) -> bool {
        rule.rule_name == origin.rule_name
            && rule.origin_property.as_deref() == origin.origin_property
    }

    /// Entries for one property, highest priority (lowest number) first.
    #[must_use]
    pub fn for_property(&self, property: &str) -> Vec<&BrokenRule> {
        let mut matching: Vec<_> = self
            .rules
            .iter()
            .filter(|r| r.property.as_deref() == Some(property))
            .collect();
        matching.sort_by_key(|r| (r.priority, r.display_index));
        matching
    }

    /// First error for a property by priority.
    #[must_use]
    pub fn first_broken_rule(&self, property: &str) -> Option<&BrokenRule> {
        self.first_with_severity(property, RuleSeverity::Error)
    }

    /// First entry of a given severity for a property by priority.
    #[must_use]
    pub fn first_with_severity(
        &self,
        property: &str,
        severity: RuleSeverity,
    ) -> Option<&BrokenRule> {
        self.for_property(property)
            .into_iter()
            .find(|r| r.severity == severity)
    }

    #[must_use]
    pub fn count(&self, severity: RuleSeverity) -> usize {
        self.rules.iter().filter(|r| r.severity == severity).count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(RuleSeverity::Error)
    }

    /// No entry blocks validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.rules.iter().any(|r| r.severity.blocks_validity())
    }

    /// Whether a property has any error.
    #[must_use]
    pub fn has_errors_for(&self, property: &str) -> bool {
        self.first_broken_rule(property).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrokenRule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

//! # Security Principal
//!
//! The identity authorization rules are evaluated against.
//!
//! Authentication is out of scope: a host builds a `Principal` from whatever
//! identity system it uses and installs it on the application context. The
//! engine only asks two questions of it: is the user authenticated, and is the
//! user in a role.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The active user.
///
/// Principals are installed behind an `Arc`; the engine detects a user switch
/// by pointer inequality, so a changed principal must be a new `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    roles: BTreeSet<String>,
    authenticated: bool,
}

impl Principal {
    /// An authenticated principal with the given roles.
    pub fn new<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authenticated: true,
        }
    }

    /// The unauthenticated principal with no roles.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            roles: BTreeSet::new(),
            authenticated: false,
        }
    }

    /// User name (empty for anonymous).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the host authenticated this user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Role membership test.
    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True if the principal holds at least one of `roles`.
    #[must_use]
    pub fn is_in_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.is_in_role(r.as_ref()))
    }

    /// Roles in sorted order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::anonymous()
    }
}

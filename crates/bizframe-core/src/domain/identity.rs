//! Graph identity allocation.
//!
//! Only the root of a graph hands out identities; every other node delegates
//! through its parent link. A node that already holds an identity above the
//! root's counter keeps it and the counter jumps forward, so a re-parented
//! node never collides with identities issued earlier.

/// Monotonic identity source owned by a graph root.
#[derive(Debug, Clone, Default)]
pub struct IdentityManager {
    next: i32,
}

impl IdentityManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity for a node currently holding `current`.
    pub fn next_identity(&mut self, current: i32) -> i32 {
        if current > self.next {
            self.next = current;
        } else {
            self.next += 1;
        }
        self.next
    }

    /// Highest identity issued so far.
    #[must_use]
    pub fn last_issued(&self) -> i32 {
        self.next
    }
}

/// Identity of one node plus the source it uses while it is a root.
#[derive(Debug, Default)]
pub(crate) struct IdentityState {
    pub(crate) identity: i32,
    pub(crate) manager: Option<IdentityManager>,
}

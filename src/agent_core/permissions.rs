//! Permission Store: session grants for mutating tools.
//!
//! Answering "always" at a confirmation prompt grants the tool for the rest
//! of the session. The executor checks `PermissionStore::check()` before
//! prompting; an active grant skips the prompt. `/clear` drops every grant.
//! Nothing is persisted.

use std::collections::HashSet;

// ─── Types ──────────────────────────────────────────────────────────────────

/// Result of checking a tool's permission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Tool has an active grant; skip confirmation.
    Allowed,
    /// No grant; proceed with normal confirmation flow.
    NeedsConfirmation,
}

// ─── PermissionStore ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PermissionStore {
    session_grants: HashSet<String>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a tool has an active permission grant.
    pub fn check(&self, tool_name: &str) -> PermissionStatus {
        if self.session_grants.contains(tool_name) {
            PermissionStatus::Allowed
        } else {
            PermissionStatus::NeedsConfirmation
        }
    }

    /// Grant a tool for the rest of the session.
    pub fn grant(&mut self, tool_name: &str) {
        self.session_grants.insert(tool_name.to_string());
        tracing::info!(tool = tool_name, "permission granted for session");
    }

    /// Clear all session grants.
    pub fn clear_session(&mut self) {
        let count = self.session_grants.len();
        self.session_grants.clear();
        if count > 0 {
            tracing::info!(cleared = count, "session permissions cleared");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_returns_needs_confirmation_by_default() {
        let store = PermissionStore::new();
        assert_eq!(store.check("write_file"), PermissionStatus::NeedsConfirmation);
    }

    #[test]
    fn test_session_grant_allows_tool() {
        let mut store = PermissionStore::new();
        store.grant("write_file");
        assert_eq!(store.check("write_file"), PermissionStatus::Allowed);
        assert_eq!(store.check("delete_file"), PermissionStatus::NeedsConfirmation);
    }

    #[test]
    fn test_clear_session_removes_grants() {
        let mut store = PermissionStore::new();
        store.grant("tool_a");
        store.grant("tool_b");

        store.clear_session();

        assert_eq!(store.check("tool_a"), PermissionStatus::NeedsConfirmation);
        assert_eq!(store.check("tool_b"), PermissionStatus::NeedsConfirmation);
    }
}

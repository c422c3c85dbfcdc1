//! Administrative authorization gate.
//!
//! A single explicit check, independent of the job/queue core: the caller
//! presents their user id and the shared secret, and gets an allow/deny
//! decision against the configured admin list.

use crate::config::AdminConfig;
use tracing::warn;

/// Outcome of an admin authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    Allow,
    Deny,
}

impl AdminDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Checks whether `requester_id` may perform admin operations.
///
/// Both conditions must hold: the id is on the allow-list and the
/// presented secret matches. An empty configured secret denies everyone,
/// so an unconfigured deployment fails closed.
#[must_use]
pub fn authorize_admin(requester_id: i64, provided_secret: &str, config: &AdminConfig) -> AdminDecision {
    if config.admin_secret.is_empty() {
        warn!("Admin secret is not configured; denying all admin requests");
        return AdminDecision::Deny;
    }

    let id_known = config.admin_user_ids.contains(&requester_id);
    let secret_matches = constant_time_eq(provided_secret.as_bytes(), config.admin_secret.as_bytes());

    if id_known && secret_matches {
        AdminDecision::Allow
    } else {
        warn!(requester_id, "Denied admin request");
        AdminDecision::Deny
    }
}

// Byte-wise comparison that does not short-circuit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_config() -> AdminConfig {
        AdminConfig {
            admin_user_ids: vec![42, 99],
            admin_secret: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_allow_known_admin_with_secret() {
        let decision = authorize_admin(42, "hunter2", &admin_config());
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_deny_wrong_secret() {
        let decision = authorize_admin(42, "hunter3", &admin_config());
        assert_eq!(decision, AdminDecision::Deny);
    }

    #[test]
    fn test_deny_unknown_user() {
        let decision = authorize_admin(7, "hunter2", &admin_config());
        assert_eq!(decision, AdminDecision::Deny);
    }

    #[test]
    fn test_deny_when_secret_unconfigured() {
        let config = AdminConfig {
            admin_user_ids: vec![42],
            admin_secret: String::new(),
        };
        assert_eq!(authorize_admin(42, "", &config), AdminDecision::Deny);
    }
}

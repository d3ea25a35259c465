//! Actions - gated operations awaiting biometric approval

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};

use crate::descriptor::Modality;
use crate::principal::PrincipalId;

/// Minutes between request and expiry
pub const DEFAULT_ACTION_TTL_MINUTES: i64 = 15;

/// Lifecycle status of an action
///
/// Transitions are one-way: `Pending -> Approved | Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Approved,
    Denied,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionStatus::Pending)
    }
}

/// A requested operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Caller-opaque, globally unique identifier
    pub action_id: String,
    /// Free-form classification (deploy, rollback, pipeline_modify, ...)
    pub kind: String,
    pub description: String,
    pub requester: PrincipalId,
    pub status: ActionStatus,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub approver: Option<PrincipalId>,
    pub approval_method: Option<Modality>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Action {
    /// Create a pending action expiring `ttl` after now
    pub fn new(
        requester: PrincipalId,
        kind: impl Into<String>,
        description: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
        ttl: Duration,
    ) -> Self {
        // Storage keeps microseconds; truncate so the in-memory copy matches
        let now = Utc::now().trunc_subsecs(6);
        Self {
            action_id: format!("ACT-{}", uuid::Uuid::new_v4()),
            kind: kind.into(),
            description: description.into(),
            requester,
            status: ActionStatus::Pending,
            metadata,
            created_at: now,
            expires_at: now + ttl,
            approver: None,
            approval_method: None,
            approved_at: None,
        }
    }

    /// Expired strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_action_is_pending_with_ttl() {
        let action = Action::new(
            PrincipalId(1),
            "deploy",
            "prod release",
            HashMap::new(),
            Duration::minutes(DEFAULT_ACTION_TTL_MINUTES),
        );

        assert!(action.action_id.starts_with("ACT-"));
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.expires_at - action.created_at, Duration::minutes(15));
        assert!(action.approver.is_none());
    }

    #[test]
    fn test_action_ids_are_unique() {
        let a = Action::new(PrincipalId(1), "deploy", "a", HashMap::new(), Duration::minutes(1));
        let b = Action::new(PrincipalId(1), "deploy", "b", HashMap::new(), Duration::minutes(1));
        assert_ne!(a.action_id, b.action_id);
    }

    #[test]
    fn test_expiry_is_strict() {
        let action = Action::new(PrincipalId(1), "rollback", "r", HashMap::new(), Duration::minutes(15));
        assert!(!action.is_expired_at(action.expires_at));
        assert!(action.is_expired_at(action.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(ActionStatus::Approved.is_terminal());
        assert!(ActionStatus::Denied.is_terminal());
        assert_eq!(ActionStatus::Denied.to_string(), "denied");
    }
}

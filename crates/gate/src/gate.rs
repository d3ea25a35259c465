//! Action approval state machine

use std::collections::HashMap;
use std::sync::Arc;

use biogate_audit::AuditEntry;
use biogate_biometric::BiometricVerifier;
use biogate_core::{Action, ActionStatus, Modality, NewAuditEvent, Principal, PrincipalId};
use biogate_store::{Decision, Store};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};

/// A request to gate an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub kind: String,
    pub description: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Returned by `request_action`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionTicket {
    pub action_id: String,
    pub status: ActionStatus,
    pub expires_at: DateTime<Utc>,
}

/// Returned by `approve_action` once a terminal decision is committed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalDecision {
    pub action_id: String,
    pub approved: bool,
    pub status: ActionStatus,
    pub message: String,
    pub similarity_score: Option<f64>,
}

/// Read-only view of an action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStatusView {
    pub action_id: String,
    pub kind: String,
    pub status: ActionStatus,
    pub expires_at: DateTime<Utc>,
    pub approver: Option<PrincipalId>,
    pub approval_method: Option<Modality>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<Action> for ActionStatusView {
    fn from(action: Action) -> Self {
        Self {
            action_id: action.action_id,
            kind: action.kind,
            status: action.status,
            expires_at: action.expires_at,
            approver: action.approver,
            approval_method: action.approval_method,
            approved_at: action.approved_at,
        }
    }
}

/// Counts of actions per status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
}

/// Owns the lifecycle of gated actions
pub struct ActionGate {
    store: Arc<Store>,
    verifier: Arc<BiometricVerifier>,
    config: GateConfig,
}

impl ActionGate {
    pub fn new(store: Arc<Store>, verifier: Arc<BiometricVerifier>, config: GateConfig) -> Self {
        Self {
            store,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    fn principal(&self, id: PrincipalId) -> GateResult<Principal> {
        self.store
            .get_principal(id)?
            .ok_or(GateError::PrincipalNotFound(id))
    }

    fn action(&self, action_id: &str) -> GateResult<Action> {
        self.store
            .get_action(action_id)?
            .ok_or_else(|| GateError::NotFound(action_id.to_string()))
    }

    /// Create a PENDING action that expires after the configured TTL
    pub fn request_action(&self, requester: PrincipalId, request: ActionRequest) -> GateResult<ActionTicket> {
        if request.kind.trim().is_empty() {
            return Err(GateError::Validation("action kind must not be empty".to_string()));
        }
        let principal = self.principal(requester)?;
        if !principal.is_active {
            return Err(GateError::Validation(format!("requester {} is inactive", principal.id)));
        }

        let action = Action::new(
            principal.id,
            request.kind,
            request.description,
            request.metadata,
            self.config.action_ttl(),
        );
        let event = AuditEntry::approval(ActionStatus::Pending, format!("Action requested: {}", action.kind))
            .actor(&principal)
            .action(&action.action_id)
            .detail(action.description.clone())
            .build();
        self.store.insert_action(&action, &event)?;

        info!(
            action_id = %action.action_id,
            kind = %action.kind,
            requester = %principal.pseudonym,
            expires_at = %action.expires_at,
            "action requested"
        );

        Ok(ActionTicket {
            action_id: action.action_id,
            status: action.status,
            expires_at: action.expires_at,
        })
    }

    /// Commit a terminal decision, or report who got there first
    fn commit(&self, action_id: &str, decision: &Decision, event: &NewAuditEvent) -> GateResult<()> {
        if self.store.decide_action(action_id, decision, event)? {
            return Ok(());
        }
        let current = self.action(action_id)?;
        warn!(action_id, status = %current.status, "lost approval race");
        Err(GateError::AlreadyDecided(current.status))
    }

    /// Deny an overdue action. The approver is recorded only if known.
    fn deny_expired(
        &self,
        action: &Action,
        approver: Option<&Principal>,
        modality: Modality,
    ) -> GateResult<ApprovalDecision> {
        let mut entry = AuditEntry::approval(ActionStatus::Denied, format!("Action expired: {}", action.kind));
        if let Some(approver) = approver {
            entry = entry.actor(approver);
        }
        let event = entry
            .modality(modality)
            .action(&action.action_id)
            .detail("Action has expired")
            .build();
        self.commit(&action.action_id, &Decision::Denied, &event)?;
        info!(action_id = %action.action_id, "approval attempted after expiry; action denied");
        Err(GateError::Expired)
    }

    /// Approve a pending action with a biometric sample from the approver
    ///
    /// Exactly one terminal transition happens per successful call. The
    /// (slow) biometric check runs without holding any store lock; expiry is
    /// judged again once it returns, and the store refuses an approval whose
    /// timestamp lies past the action's expiry.
    pub async fn approve_action(
        &self,
        action_id: &str,
        approver_id: PrincipalId,
        modality: Modality,
        sample: &[u8],
    ) -> GateResult<ApprovalDecision> {
        let action = self.action(action_id)?;
        if action.status.is_terminal() {
            return Err(GateError::AlreadyDecided(action.status));
        }

        let approver = self.store.get_principal(approver_id)?;
        if action.is_expired_at(Utc::now()) {
            return self.deny_expired(&action, approver.as_ref(), modality);
        }
        let approver = approver.ok_or(GateError::PrincipalNotFound(approver_id))?;

        let auth = self.verifier.authenticate(approver.id, modality, sample).await?;

        let decided_at = Utc::now().trunc_subsecs(6);
        if action.is_expired_at(decided_at) {
            return self.deny_expired(&action, Some(&approver), modality);
        }

        let (decision, event, message) = if !auth.success {
            let event = AuditEntry::approval(ActionStatus::Denied, format!("Action approval failed: {}", action.kind))
                .actor(&approver)
                .modality(modality)
                .similarity(auth.similarity_score)
                .action(&action.action_id)
                .detail(auth.message.clone())
                .build();
            (Decision::Denied, event, "Biometric authentication failed".to_string())
        } else if !auth.authenticated {
            let event = AuditEntry::approval(ActionStatus::Denied, format!("Action denied: {}", action.kind))
                .actor(&approver)
                .modality(modality)
                .similarity(auth.similarity_score)
                .action(&action.action_id)
                .detail("Biometric verification failed")
                .build();
            (
                Decision::Denied,
                event,
                "Biometric verification failed. Action denied.".to_string(),
            )
        } else {
            let decision = Decision::Approved {
                approver: approver.id,
                method: modality,
                at: decided_at,
            };
            let event = AuditEntry::approval(ActionStatus::Approved, format!("Action approved: {}", action.kind))
                .actor(&approver)
                .modality(modality)
                .similarity(auth.similarity_score)
                .action(&action.action_id)
                .detail(format!("Action approved via {}", modality))
                .build();
            (decision, event, "Action approved successfully".to_string())
        };

        if !self.store.decide_action(&action.action_id, &decision, &event)? {
            let current = self.action(&action.action_id)?;
            if current.status == ActionStatus::Pending {
                return self.deny_expired(&action, Some(&approver), modality);
            }
            warn!(action_id = %action.action_id, status = %current.status, "lost approval race");
            return Err(GateError::AlreadyDecided(current.status));
        }
        let status = decision.status();

        info!(
            action_id = %action.action_id,
            approver = %approver.pseudonym,
            %modality,
            %status,
            similarity = ?auth.similarity_score,
            "action decided"
        );

        Ok(ApprovalDecision {
            action_id: action.action_id,
            approved: status == ActionStatus::Approved,
            status,
            message,
            similarity_score: auth.similarity_score,
        })
    }

    /// Current status and expiry; no side effects
    pub fn get_status(&self, action_id: &str) -> GateResult<ActionStatusView> {
        Ok(self.action(action_id)?.into())
    }

    /// Demote every overdue PENDING action to DENIED; returns how many
    pub fn sweep_expired(&self) -> GateResult<usize> {
        let demoted = self.store.expire_overdue(Utc::now(), |action| {
            AuditEntry::approval(ActionStatus::Denied, format!("Action expired: {}", action.kind))
                .action(&action.action_id)
                .detail("expired before approval")
                .build()
        })?;
        if !demoted.is_empty() {
            info!(count = demoted.len(), "expired actions denied");
        }
        Ok(demoted.len())
    }

    /// Most recent actions, optionally filtered by status
    pub fn list_actions(&self, status: Option<ActionStatus>, limit: u32) -> GateResult<Vec<Action>> {
        Ok(self.store.list_actions(status, limit)?)
    }

    pub fn stats(&self) -> GateResult<GateStats> {
        Ok(GateStats {
            pending: self.store.count_actions_by_status(ActionStatus::Pending)?,
            approved: self.store.count_actions_by_status(ActionStatus::Approved)?,
            denied: self.store.count_actions_by_status(ActionStatus::Denied)?,
        })
    }
}

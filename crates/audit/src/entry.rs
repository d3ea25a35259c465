//! Audit event construction

use biogate_core::{ActionStatus, AuditCategory, Modality, NewAuditEvent, Principal};
use chrono::{SubsecRound, Utc};

/// Builder for a [`NewAuditEvent`]
#[derive(Debug, Clone)]
pub struct AuditEntry {
    event: NewAuditEvent,
}

impl AuditEntry {
    pub fn new(category: AuditCategory, status: ActionStatus, summary: impl Into<String>) -> Self {
        Self {
            event: NewAuditEvent {
                principal: None,
                pseudonym: None,
                summary: summary.into(),
                category,
                status,
                modality: None,
                similarity_score: None,
                action_id: None,
                detail: None,
                timestamp: Utc::now().trunc_subsecs(6),
            },
        }
    }

    /// "Biometric enrollment: <modality>"
    pub fn enrollment(modality: Modality, status: ActionStatus) -> Self {
        Self::new(
            AuditCategory::Enrollment,
            status,
            format!("Biometric enrollment: {}", modality),
        )
        .modality(modality)
    }

    /// "Biometric authentication: <modality>"
    pub fn authentication(modality: Modality, status: ActionStatus) -> Self {
        Self::new(
            AuditCategory::Authentication,
            status,
            format!("Biometric authentication: {}", modality),
        )
        .modality(modality)
    }

    pub fn approval(status: ActionStatus, summary: impl Into<String>) -> Self {
        Self::new(AuditCategory::Approval, status, summary)
    }

    /// Attribute the event to a principal (id and pseudonym)
    pub fn actor(mut self, principal: &Principal) -> Self {
        self.event.principal = Some(principal.id);
        self.event.pseudonym = Some(principal.pseudonym.clone());
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        self.event.modality = Some(modality);
        self
    }

    pub fn similarity(mut self, score: Option<f64>) -> Self {
        self.event.similarity_score = score;
        self
    }

    pub fn action(mut self, action_id: impl Into<String>) -> Self {
        self.event.action_id = Some(action_id.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.event.detail = Some(detail.into());
        self
    }

    pub fn build(self) -> NewAuditEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::{pseudonymize, PrincipalId, Role};

    #[test]
    fn test_authentication_entry() {
        let principal = Principal {
            id: PrincipalId(3),
            username: "carol".to_string(),
            full_name: None,
            role: Role::Operator,
            is_active: true,
            consent_given: true,
            consent_at: None,
            pseudonym: pseudonymize("carol"),
            created_at: Utc::now(),
        };

        let event = AuditEntry::authentication(Modality::Voice, ActionStatus::Denied)
            .actor(&principal)
            .similarity(Some(0.42))
            .detail("Authentication failed")
            .build();

        assert_eq!(event.category, AuditCategory::Authentication);
        assert_eq!(event.summary, "Biometric authentication: voice");
        assert_eq!(event.principal, Some(PrincipalId(3)));
        assert_eq!(event.pseudonym.as_deref(), Some(pseudonymize("carol").as_str()));
        assert_eq!(event.modality, Some(Modality::Voice));
        assert_eq!(event.similarity_score, Some(0.42));
        assert!(event.action_id.is_none());
    }

    #[test]
    fn test_approval_entry_links_action() {
        let event = AuditEntry::approval(ActionStatus::Denied, "Action expired: deploy")
            .action("ACT-1")
            .build();
        assert_eq!(event.category, AuditCategory::Approval);
        assert_eq!(event.action_id.as_deref(), Some("ACT-1"));
        assert!(event.principal.is_none());
        assert!(event.pseudonym.is_none());
    }
}

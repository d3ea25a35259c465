//! Audit events - the append-only trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::action::ActionStatus;
use crate::descriptor::Modality;
use crate::principal::PrincipalId;

/// What kind of operation an audit event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuditCategory {
    Enrollment,
    Authentication,
    Approval,
}

/// A persisted audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    /// Nulled when the principal is erased
    pub principal: Option<PrincipalId>,
    pub pseudonym: Option<String>,
    pub summary: String,
    pub category: AuditCategory,
    pub status: ActionStatus,
    pub modality: Option<Modality>,
    pub similarity_score: Option<f64>,
    pub action_id: Option<String>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An audit event not yet written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
    pub principal: Option<PrincipalId>,
    pub pseudonym: Option<String>,
    pub summary: String,
    pub category: AuditCategory,
    pub status: ActionStatus,
    pub modality: Option<Modality>,
    pub similarity_score: Option<f64>,
    pub action_id: Option<String>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditEvent {
    /// Attach the storage id assigned on insert
    pub fn persisted(self, id: i64) -> AuditEvent {
        AuditEvent {
            id,
            principal: self.principal,
            pseudonym: self.pseudonym,
            summary: self.summary,
            category: self.category,
            status: self.status,
            modality: self.modality,
            similarity_score: self.similarity_score,
            action_id: self.action_id,
            detail: self.detail,
            timestamp: self.timestamp,
        }
    }
}

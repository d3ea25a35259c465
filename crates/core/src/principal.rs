//! Principals - subjects that request and approve actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::pseudonym::pseudonymize;

/// Storage identifier of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    SecurityOfficer,
}

/// A registered subject identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub consent_given: bool,
    pub consent_at: Option<DateTime<Utc>>,
    /// SHA-256 of the username, used in logs instead of the identity
    pub pseudonym: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Biometric operations require an active principal with consent on file
    pub fn may_use_biometrics(&self) -> bool {
        self.is_active && self.consent_given
    }
}

/// Registration input for a new principal
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub consent_given: bool,
    pub pseudonym: String,
    pub created_at: DateTime<Utc>,
}

impl NewPrincipal {
    pub fn new(username: impl Into<String>, role: Role, consent_given: bool) -> Self {
        let username = username.into();
        let pseudonym = pseudonymize(&username);
        Self {
            username,
            full_name: None,
            role,
            consent_given,
            pseudonym,
            created_at: Utc::now(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Consent timestamp recorded at registration
    pub fn consent_at(&self) -> Option<DateTime<Utc>> {
        self.consent_given.then_some(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_roundtrip_strings() {
        assert_eq!(Role::SecurityOfficer.to_string(), "security_officer");
        assert_eq!(Role::from_str("operator").unwrap(), Role::Operator);
        assert!(Role::from_str("devops").is_err());
    }

    #[test]
    fn test_new_principal_pseudonym() {
        let p = NewPrincipal::new("alice", Role::Operator, true);
        assert_eq!(p.pseudonym, pseudonymize("alice"));
        assert_eq!(p.consent_at(), Some(p.created_at));

        let p = NewPrincipal::new("bob", Role::Admin, false);
        assert!(p.consent_at().is_none());
    }
}

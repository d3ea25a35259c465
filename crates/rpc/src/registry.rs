//! Principal registry: registration, consent, activation, erasure

use std::sync::Arc;

use biogate_core::{NewPrincipal, Principal, PrincipalId, Role};
use biogate_store::{ErasureReport, Store, StoreError};
use chrono::Utc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Principal not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct PrincipalRegistry {
    store: Arc<Store>,
}

impl PrincipalRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Register an active principal; the pseudonym is derived from the username
    pub fn register(
        &self,
        username: &str,
        full_name: Option<&str>,
        role: Role,
        consent: bool,
    ) -> Result<Principal, RegistryError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RegistryError::Validation("username must not be empty".to_string()));
        }

        let mut new = NewPrincipal::new(username, role, consent);
        if let Some(full_name) = full_name {
            new = new.with_full_name(full_name);
        }
        let principal = self.store.insert_principal(&new)?;
        info!(id = %principal.id, pseudonym = %principal.pseudonym, role = %principal.role, "principal registered");
        Ok(principal)
    }

    pub fn get(&self, id: PrincipalId) -> Result<Principal, RegistryError> {
        self.store
            .get_principal(id)?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn find(&self, username: &str) -> Result<Principal, RegistryError> {
        self.store
            .find_principal(username)?
            .ok_or_else(|| RegistryError::NotFound(username.to_string()))
    }

    /// Grant stamps the consent date; revoke clears it and blocks biometrics at once
    pub fn set_consent(&self, id: PrincipalId, granted: bool) -> Result<Principal, RegistryError> {
        let principal = self.store.set_consent(id, granted, Utc::now())?;
        info!(pseudonym = %principal.pseudonym, granted, "biometric consent updated");
        Ok(principal)
    }

    pub fn set_active(&self, id: PrincipalId, active: bool) -> Result<Principal, RegistryError> {
        let principal = self.store.set_active(id, active)?;
        info!(pseudonym = %principal.pseudonym, active, "principal activation updated");
        Ok(principal)
    }

    /// Delete a principal and their descriptors; audit history is kept but detached
    pub fn erase(&self, id: PrincipalId) -> Result<ErasureReport, RegistryError> {
        Ok(self.store.erase_principal(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::pseudonymize;

    fn registry() -> PrincipalRegistry {
        PrincipalRegistry::new(Arc::new(Store::in_memory().unwrap()))
    }

    #[test]
    fn test_register_and_find() {
        let registry = registry();
        let alice = registry
            .register("alice", Some("Alice Nguyen"), Role::SecurityOfficer, true)
            .unwrap();

        assert_eq!(alice.pseudonym, pseudonymize("alice"));
        assert!(alice.is_active);
        assert!(alice.consent_at.is_some());
        assert_eq!(registry.find("alice").unwrap().id, alice.id);
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let registry = registry();
        registry.register("bob", None, Role::Operator, false).unwrap();
        let result = registry.register("bob", None, Role::Admin, false);
        assert!(matches!(result, Err(RegistryError::Store(StoreError::Conflict(_)))));
    }

    #[test]
    fn test_blank_username_rejected() {
        let result = registry().register("  ", None, Role::Operator, true);
        assert!(matches!(result, Err(RegistryError::Validation(_))));
    }

    #[test]
    fn test_consent_revoke_and_grant() {
        let registry = registry();
        let carol = registry.register("carol", None, Role::Operator, true).unwrap();

        let revoked = registry.set_consent(carol.id, false).unwrap();
        assert!(!revoked.consent_given);
        assert!(revoked.consent_at.is_none());

        let granted = registry.set_consent(carol.id, true).unwrap();
        assert!(granted.may_use_biometrics());
    }

    #[test]
    fn test_erase_unknown_principal() {
        let result = registry().erase(PrincipalId(77));
        assert!(matches!(result, Err(RegistryError::Store(StoreError::NotFound(_)))));
    }
}

//! Principal rows and erasure

use biogate_core::{NewPrincipal, Principal, PrincipalId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use crate::codec::{opt_ts, parse_enum, parse_opt_ts, parse_ts, ts};
use crate::error::StoreError;
use crate::Store;

const PRINCIPAL_COLUMNS: &str =
    "id, username, full_name, role, is_active, consent_given, consent_at, pseudonym, created_at";

fn principal_from_row(row: &Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: PrincipalId(row.get(0)?),
        username: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_enum(3, &row.get::<_, String>(3)?)?,
        is_active: row.get(4)?,
        consent_given: row.get(5)?,
        consent_at: parse_opt_ts(6, row.get(6)?)?,
        pseudonym: row.get(7)?,
        created_at: parse_ts(8, &row.get::<_, String>(8)?)?,
    })
}

/// What an erasure removed or detached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErasureReport {
    pub descriptors_removed: usize,
    pub audit_events_detached: usize,
}

impl Store {
    /// Register a principal; duplicate usernames are a `Conflict`
    pub fn insert_principal(&self, new: &NewPrincipal) -> Result<Principal, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO principals
             (username, full_name, role, is_active, consent_given, consent_at, pseudonym, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)",
            params![
                new.username,
                new.full_name,
                new.role.to_string(),
                new.consent_given,
                opt_ts(&new.consent_at()),
                new.pseudonym,
                ts(&new.created_at),
            ],
        )
        .map_err(|e| StoreError::from_insert(e, format!("principal '{}' already exists", new.username)))?;

        let id = PrincipalId(conn.last_insert_rowid());
        drop(conn);
        self.get_principal(id)?
            .ok_or_else(|| StoreError::NotFound(format!("principal {}", id)))
    }

    pub fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        let conn = self.conn()?;
        let principal = conn
            .query_row(
                &format!("SELECT {} FROM principals WHERE id = ?1", PRINCIPAL_COLUMNS),
                params![id.0],
                principal_from_row,
            )
            .optional()?;
        Ok(principal)
    }

    pub fn find_principal(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let conn = self.conn()?;
        let principal = conn
            .query_row(
                &format!("SELECT {} FROM principals WHERE username = ?1", PRINCIPAL_COLUMNS),
                params![username],
                principal_from_row,
            )
            .optional()?;
        Ok(principal)
    }

    /// Grant or revoke biometric consent
    pub fn set_consent(
        &self,
        id: PrincipalId,
        granted: bool,
        at: DateTime<Utc>,
    ) -> Result<Principal, StoreError> {
        let consent_at = granted.then(|| ts(&at));
        let rows = self.conn()?.execute(
            "UPDATE principals SET consent_given = ?1, consent_at = ?2 WHERE id = ?3",
            params![granted, consent_at, id.0],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("principal {}", id)));
        }
        self.get_principal(id)?
            .ok_or_else(|| StoreError::NotFound(format!("principal {}", id)))
    }

    pub fn set_active(&self, id: PrincipalId, active: bool) -> Result<Principal, StoreError> {
        let rows = self.conn()?.execute(
            "UPDATE principals SET is_active = ?1 WHERE id = ?2",
            params![active, id.0],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("principal {}", id)));
        }
        self.get_principal(id)?
            .ok_or_else(|| StoreError::NotFound(format!("principal {}", id)))
    }

    /// Erase a principal: descriptors deleted, audit references nulled,
    /// audit rows themselves retained
    pub fn erase_principal(&self, id: PrincipalId) -> Result<ErasureReport, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let audit_events_detached = tx.execute(
            "UPDATE audit_events SET principal_id = NULL WHERE principal_id = ?1",
            params![id.0],
        )?;
        let descriptors_removed = tx.execute(
            "DELETE FROM biometric_descriptors WHERE principal_id = ?1",
            params![id.0],
        )?;
        let rows = tx.execute("DELETE FROM principals WHERE id = ?1", params![id.0])?;
        if rows == 0 {
            // dropping the transaction rolls back
            return Err(StoreError::NotFound(format!("principal {}", id)));
        }
        tx.commit()?;

        info!(
            principal = %id,
            descriptors_removed,
            audit_events_detached,
            "principal erased"
        );

        Ok(ErasureReport {
            descriptors_removed,
            audit_events_detached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::{pseudonymize, Role};

    #[test]
    fn test_insert_and_get_principal() {
        let store = Store::in_memory().unwrap();
        let p = store
            .insert_principal(&NewPrincipal::new("alice", Role::Operator, true).with_full_name("Alice A."))
            .unwrap();

        assert_eq!(p.username, "alice");
        assert_eq!(p.full_name.as_deref(), Some("Alice A."));
        assert_eq!(p.role, Role::Operator);
        assert!(p.is_active);
        assert!(p.consent_given);
        assert!(p.consent_at.is_some());
        assert_eq!(p.pseudonym, pseudonymize("alice"));

        let found = store.find_principal("alice").unwrap().unwrap();
        assert_eq!(found.id, p.id);
        assert!(store.find_principal("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let store = Store::in_memory().unwrap();
        store.insert_principal(&NewPrincipal::new("alice", Role::Operator, true)).unwrap();
        let result = store.insert_principal(&NewPrincipal::new("alice", Role::Admin, false));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_consent_revoke_and_grant() {
        let store = Store::in_memory().unwrap();
        let p = store.insert_principal(&NewPrincipal::new("bob", Role::Admin, true)).unwrap();

        let revoked = store.set_consent(p.id, false, Utc::now()).unwrap();
        assert!(!revoked.consent_given);
        assert!(revoked.consent_at.is_none());
        assert!(!revoked.may_use_biometrics());

        let granted = store.set_consent(p.id, true, Utc::now()).unwrap();
        assert!(granted.may_use_biometrics());
    }

    #[test]
    fn test_unknown_principal_updates_fail() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.set_active(PrincipalId(99), false),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.erase_principal(PrincipalId(99)),
            Err(StoreError::NotFound(_))
        ));
    }
}

//! Action rows and status transitions

use biogate_core::{Action, ActionStatus, Modality, NewAuditEvent, PrincipalId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::audit::insert_audit;
use crate::codec::{opt_ts, parse_enum, parse_json, parse_opt_enum, parse_opt_ts, parse_ts, ts};
use crate::error::StoreError;
use crate::Store;

const ACTION_COLUMNS: &str = "action_id, kind, description, requester_id, status, metadata, \
     created_at, expires_at, approver_id, approval_method, approved_at";

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        action_id: row.get(0)?,
        kind: row.get(1)?,
        description: row.get(2)?,
        requester: PrincipalId(row.get(3)?),
        status: parse_enum(4, &row.get::<_, String>(4)?)?,
        metadata: parse_json(5, &row.get::<_, String>(5)?)?,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
        expires_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        approver: row.get::<_, Option<i64>>(8)?.map(PrincipalId),
        approval_method: parse_opt_enum(9, row.get(9)?)?,
        approved_at: parse_opt_ts(10, row.get(10)?)?,
    })
}

/// Terminal transition applied to a pending action
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approved {
        approver: PrincipalId,
        method: Modality,
        at: DateTime<Utc>,
    },
    Denied,
}

impl Decision {
    pub fn status(&self) -> ActionStatus {
        match self {
            Decision::Approved { .. } => ActionStatus::Approved,
            Decision::Denied => ActionStatus::Denied,
        }
    }
}

impl Store {
    /// Persist a new pending action with its request audit event
    pub fn insert_action(&self, action: &Action, event: &NewAuditEvent) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&action.metadata)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO actions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                ACTION_COLUMNS
            ),
            params![
                action.action_id,
                action.kind,
                action.description,
                action.requester.0,
                action.status.to_string(),
                metadata,
                ts(&action.created_at),
                ts(&action.expires_at),
                action.approver.map(|p| p.0),
                action.approval_method.map(|m| m.to_string()),
                opt_ts(&action.approved_at),
            ],
        )
        .map_err(|e| StoreError::from_insert(e, format!("action {} already exists", action.action_id)))?;
        insert_audit(&tx, event)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_action(&self, action_id: &str) -> Result<Option<Action>, StoreError> {
        let conn = self.conn()?;
        let action = conn
            .query_row(
                &format!("SELECT {} FROM actions WHERE action_id = ?1", ACTION_COLUMNS),
                params![action_id],
                action_from_row,
            )
            .optional()?;
        Ok(action)
    }

    /// Apply a terminal decision if, and only if, the stored status is still
    /// pending. An approval additionally requires `at` to lie within the
    /// action's expiry. Returns `false` (and writes nothing) otherwise.
    pub fn decide_action(
        &self,
        action_id: &str,
        decision: &Decision,
        event: &NewAuditEvent,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = match decision {
            Decision::Approved { approver, method, at } => tx.execute(
                "UPDATE actions
                 SET status = 'approved', approver_id = ?1, approval_method = ?2, approved_at = ?3
                 WHERE action_id = ?4 AND status = 'pending' AND expires_at >= ?3",
                params![approver.0, method.to_string(), ts(at), action_id],
            )?,
            Decision::Denied => tx.execute(
                "UPDATE actions SET status = 'denied' WHERE action_id = ?1 AND status = 'pending'",
                params![action_id],
            )?,
        };

        if rows == 0 {
            return Ok(false);
        }

        insert_audit(&tx, event)?;
        tx.commit()?;
        Ok(true)
    }

    /// Deny every pending action whose expiry lies before `now`, writing one
    /// audit event per action. Returns the demoted actions.
    pub fn expire_overdue<F>(&self, now: DateTime<Utc>, mut audit_for: F) -> Result<Vec<Action>, StoreError>
    where
        F: FnMut(&Action) -> NewAuditEvent,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let overdue = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM actions WHERE status = 'pending' AND expires_at < ?1 ORDER BY expires_at",
                ACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![ts(&now)], action_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut demoted = Vec::with_capacity(overdue.len());
        for mut action in overdue {
            let rows = tx.execute(
                "UPDATE actions SET status = 'denied' WHERE action_id = ?1 AND status = 'pending'",
                params![action.action_id],
            )?;
            if rows == 0 {
                continue;
            }
            action.status = ActionStatus::Denied;
            insert_audit(&tx, &audit_for(&action))?;
            demoted.push(action);
        }

        tx.commit()?;
        Ok(demoted)
    }

    /// Actions newest-first, optionally filtered by status
    pub fn list_actions(&self, status: Option<ActionStatus>, limit: u32) -> Result<Vec<Action>, StoreError> {
        let conn = self.conn()?;
        let actions = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM actions WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                    ACTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![status.to_string(), limit], action_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM actions ORDER BY created_at DESC LIMIT ?1",
                    ACTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![limit], action_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(actions)
    }

    pub fn count_actions_by_status(&self, status: ActionStatus) -> Result<usize, StoreError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM actions WHERE status = ?1",
            params![status.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::{AuditCategory, NewPrincipal, Role};
    use chrono::Duration;
    use std::collections::HashMap;

    fn approval_event(action: &Action, status: ActionStatus) -> NewAuditEvent {
        NewAuditEvent {
            principal: Some(action.requester),
            pseudonym: None,
            summary: format!("Action {}: {}", status, action.kind),
            category: AuditCategory::Approval,
            status,
            modality: None,
            similarity_score: None,
            action_id: Some(action.action_id.clone()),
            detail: None,
            timestamp: Utc::now(),
        }
    }

    fn setup() -> (Store, PrincipalId) {
        let store = Store::in_memory().unwrap();
        let p = store.insert_principal(&NewPrincipal::new("alice", Role::Operator, true)).unwrap();
        (store, p.id)
    }

    fn pending(requester: PrincipalId, ttl: Duration) -> Action {
        let mut metadata = HashMap::new();
        metadata.insert("environment".to_string(), serde_json::json!("production"));
        Action::new(requester, "deploy", "prod release", metadata, ttl)
    }

    #[test]
    fn test_insert_and_get_action() {
        let (store, alice) = setup();
        let action = pending(alice, Duration::minutes(15));
        store.insert_action(&action, &approval_event(&action, ActionStatus::Pending)).unwrap();

        let loaded = store.get_action(&action.action_id).unwrap().unwrap();
        assert_eq!(loaded, action);
        assert!(store.get_action("ACT-missing").unwrap().is_none());
    }

    #[test]
    fn test_decide_is_compare_and_swap() {
        let (store, alice) = setup();
        let action = pending(alice, Duration::minutes(15));
        store.insert_action(&action, &approval_event(&action, ActionStatus::Pending)).unwrap();

        let approve = Decision::Approved {
            approver: alice,
            method: Modality::Face,
            at: Utc::now(),
        };
        assert!(store
            .decide_action(&action.action_id, &approve, &approval_event(&action, ActionStatus::Approved))
            .unwrap());
        assert!(!store
            .decide_action(&action.action_id, &Decision::Denied, &approval_event(&action, ActionStatus::Denied))
            .unwrap());

        let loaded = store.get_action(&action.action_id).unwrap().unwrap();
        assert_eq!(loaded.status, ActionStatus::Approved);
        assert_eq!(loaded.approver, Some(alice));
        assert_eq!(loaded.approval_method, Some(Modality::Face));
        assert!(loaded.approved_at.is_some());
    }

    #[test]
    fn test_approval_after_expiry_is_refused() {
        let (store, alice) = setup();
        let action = pending(alice, Duration::minutes(15));
        store.insert_action(&action, &approval_event(&action, ActionStatus::Pending)).unwrap();

        let late = Decision::Approved {
            approver: alice,
            method: Modality::Voice,
            at: action.expires_at + Duration::milliseconds(1),
        };
        assert!(!store
            .decide_action(&action.action_id, &late, &approval_event(&action, ActionStatus::Approved))
            .unwrap());
        assert_eq!(store.get_action(&action.action_id).unwrap().unwrap().status, ActionStatus::Pending);

        // a denial is still accepted once expired
        assert!(store
            .decide_action(&action.action_id, &Decision::Denied, &approval_event(&action, ActionStatus::Denied))
            .unwrap());
        assert_eq!(store.get_action(&action.action_id).unwrap().unwrap().status, ActionStatus::Denied);
    }

    #[test]
    fn test_lost_race_writes_no_audit() {
        let (store, alice) = setup();
        let action = pending(alice, Duration::minutes(15));
        store.insert_action(&action, &approval_event(&action, ActionStatus::Pending)).unwrap();
        store
            .decide_action(&action.action_id, &Decision::Denied, &approval_event(&action, ActionStatus::Denied))
            .unwrap();
        store
            .decide_action(&action.action_id, &Decision::Denied, &approval_event(&action, ActionStatus::Denied))
            .unwrap();

        let filter = crate::AuditFilter {
            action_id: Some(action.action_id.clone()),
            ..Default::default()
        };
        let (total, _) = store.query_audit(&filter, crate::Page::default()).unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_expire_overdue_only_touches_stale_pending() {
        let (store, alice) = setup();
        let stale = pending(alice, Duration::minutes(-1));
        let fresh = pending(alice, Duration::minutes(15));
        store.insert_action(&stale, &approval_event(&stale, ActionStatus::Pending)).unwrap();
        store.insert_action(&fresh, &approval_event(&fresh, ActionStatus::Pending)).unwrap();

        let demoted = store
            .expire_overdue(Utc::now(), |a| approval_event(a, ActionStatus::Denied))
            .unwrap();
        assert_eq!(demoted.len(), 1);
        assert_eq!(demoted[0].action_id, stale.action_id);

        // idempotent
        let again = store
            .expire_overdue(Utc::now(), |a| approval_event(a, ActionStatus::Denied))
            .unwrap();
        assert!(again.is_empty());

        assert_eq!(store.count_actions_by_status(ActionStatus::Denied).unwrap(), 1);
        assert_eq!(store.count_actions_by_status(ActionStatus::Pending).unwrap(), 1);
    }

    #[test]
    fn test_list_actions_by_status() {
        let (store, alice) = setup();
        for _ in 0..3 {
            let action = pending(alice, Duration::minutes(15));
            store.insert_action(&action, &approval_event(&action, ActionStatus::Pending)).unwrap();
        }
        assert_eq!(store.list_actions(Some(ActionStatus::Pending), 10).unwrap().len(), 3);
        assert_eq!(store.list_actions(None, 2).unwrap().len(), 2);
        assert!(store.list_actions(Some(ActionStatus::Approved), 10).unwrap().is_empty());
    }
}

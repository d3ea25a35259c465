//! Audit event rows (append-only)

use biogate_core::{AuditCategory, AuditEvent, NewAuditEvent, PrincipalId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::codec::{parse_enum, parse_opt_enum, parse_ts, ts};
use crate::error::StoreError;
use crate::Store;

const AUDIT_COLUMNS: &str = "id, principal_id, pseudonym, summary, category, status, modality, \
     similarity_score, action_id, detail, timestamp";

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEvent> {
    Ok(AuditEvent {
        id: row.get(0)?,
        principal: row.get::<_, Option<i64>>(1)?.map(PrincipalId),
        pseudonym: row.get(2)?,
        summary: row.get(3)?,
        category: parse_enum(4, &row.get::<_, String>(4)?)?,
        status: parse_enum(5, &row.get::<_, String>(5)?)?,
        modality: parse_opt_enum(6, row.get(6)?)?,
        similarity_score: row.get(7)?,
        action_id: row.get(8)?,
        detail: row.get(9)?,
        timestamp: parse_ts(10, &row.get::<_, String>(10)?)?,
    })
}

/// Insert inside an open connection or transaction
pub(crate) fn insert_audit(conn: &Connection, event: &NewAuditEvent) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO audit_events
         (principal_id, pseudonym, summary, category, status, modality,
          similarity_score, action_id, detail, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.principal.map(|p| p.0),
            event.pseudonym,
            event.summary,
            event.category.to_string(),
            event.status.to_string(),
            event.modality.map(|m| m.to_string()),
            event.similarity_score,
            event.action_id,
            event.detail,
            ts(&event.timestamp),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit query filters; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub principal: Option<PrincipalId>,
    pub category: Option<AuditCategory>,
    pub action_id: Option<String>,
}

impl AuditFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(principal) = self.principal {
            clauses.push("principal_id = ?");
            values.push(Value::Integer(principal.0));
        }
        if let Some(category) = self.category {
            clauses.push("category = ?");
            values.push(Value::Text(category.to_string()));
        }
        if let Some(ref action_id) = self.action_id {
            clauses.push("action_id = ?");
            values.push(Value::Text(action_id.clone()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

/// Offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

impl Store {
    /// Append a standalone audit event
    pub fn append_audit(&self, event: &NewAuditEvent) -> Result<AuditEvent, StoreError> {
        let conn = self.conn()?;
        let id = insert_audit(&conn, event)?;
        Ok(event.clone().persisted(id))
    }

    /// Matching events newest-first, plus the total match count
    pub fn query_audit(&self, filter: &AuditFilter, page: Page) -> Result<(u64, Vec<AuditEvent>), StoreError> {
        let (where_clause, values) = filter.where_clause();
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_events {}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut page_values = values;
        page_values.push(Value::Integer(i64::from(page.limit)));
        page_values.push(Value::Integer(i64::from(page.skip)));

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            AUDIT_COLUMNS, where_clause
        ))?;
        let events = stmt
            .query_map(params_from_iter(page_values.iter()), audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total as u64, events))
    }

    /// All matching events oldest-first (for export)
    pub fn audit_events_ascending(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StoreError> {
        let (where_clause, values) = filter.where_clause();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM audit_events {} ORDER BY timestamp ASC, id ASC",
            AUDIT_COLUMNS, where_clause
        ))?;
        let events = stmt
            .query_map(params_from_iter(values.iter()), audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::{ActionStatus, Modality, NewPrincipal, Role};
    use chrono::{Duration, Utc};

    fn event(principal: Option<PrincipalId>, category: AuditCategory, offset_secs: i64) -> NewAuditEvent {
        NewAuditEvent {
            principal,
            pseudonym: Some("p".repeat(64)),
            summary: format!("{} event", category),
            category,
            status: ActionStatus::Approved,
            modality: Some(Modality::Voice),
            similarity_score: Some(0.91),
            action_id: None,
            detail: Some("detail".to_string()),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_query_newest_first_with_pagination() {
        let store = Store::in_memory().unwrap();
        for i in 0..5 {
            store.append_audit(&event(None, AuditCategory::Authentication, i)).unwrap();
        }

        let (total, first) = store.query_audit(&AuditFilter::default(), Page { skip: 0, limit: 2 }).unwrap();
        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert!(first[0].timestamp > first[1].timestamp);

        let (_, last) = store.query_audit(&AuditFilter::default(), Page { skip: 4, limit: 2 }).unwrap();
        assert_eq!(last.len(), 1);
        assert!(last[0].timestamp < first[1].timestamp);
    }

    #[test]
    fn test_query_filters() {
        let store = Store::in_memory().unwrap();
        let p = store.insert_principal(&NewPrincipal::new("alice", Role::Operator, true)).unwrap();

        store.append_audit(&event(Some(p.id), AuditCategory::Enrollment, 0)).unwrap();
        store.append_audit(&event(Some(p.id), AuditCategory::Approval, 1)).unwrap();
        store.append_audit(&event(None, AuditCategory::Approval, 2)).unwrap();

        let by_principal = AuditFilter {
            principal: Some(p.id),
            ..Default::default()
        };
        assert_eq!(store.query_audit(&by_principal, Page::default()).unwrap().0, 2);

        let by_both = AuditFilter {
            principal: Some(p.id),
            category: Some(AuditCategory::Approval),
            ..Default::default()
        };
        let (total, events) = store.query_audit(&by_both, Page::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(events[0].similarity_score, Some(0.91));
        assert_eq!(events[0].modality, Some(Modality::Voice));
    }

    #[test]
    fn test_erasure_nulls_audit_references() {
        let store = Store::in_memory().unwrap();
        let p = store.insert_principal(&NewPrincipal::new("alice", Role::Operator, true)).unwrap();
        store.append_audit(&event(Some(p.id), AuditCategory::Enrollment, 0)).unwrap();
        store.append_audit(&event(Some(p.id), AuditCategory::Authentication, 1)).unwrap();

        let report = store.erase_principal(p.id).unwrap();
        assert_eq!(report.audit_events_detached, 2);
        assert!(store.get_principal(p.id).unwrap().is_none());

        let events = store.audit_events_ascending(&AuditFilter::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.principal.is_none()));
        assert_eq!(events[0].category, AuditCategory::Enrollment);
        assert_eq!(events[0].detail.as_deref(), Some("detail"));
    }
}

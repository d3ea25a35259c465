//! Audit recorder - append, query and export

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use biogate_core::{AuditCategory, AuditEvent, NewAuditEvent, PrincipalId};
use biogate_store::{AuditFilter, Page, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};

/// Largest page a query may request
pub const MAX_PAGE_LIMIT: u32 = 1000;

const DEFAULT_PAGE_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// Audit log query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub principal: Option<PrincipalId>,
    #[serde(default)]
    pub category: Option<AuditCategory>,
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            principal: None,
            category: None,
            action_id: None,
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl AuditQuery {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            principal: self.principal,
            category: self.category,
            action_id: self.action_id.clone(),
        }
    }
}

/// One page of audit events, newest first
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    /// Matches before pagination
    pub total: u64,
    pub events: Vec<AuditEvent>,
}

/// Append-only audit trail over the shared store
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<Store>,
}

impl AuditRecorder {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Append a standalone event
    ///
    /// Events tied to a state change are written by the store inside that
    /// change's transaction instead.
    pub fn record(&self, event: NewAuditEvent) -> AuditResult<AuditEvent> {
        let persisted = self.store.append_audit(&event)?;
        debug!(
            id = persisted.id,
            category = %persisted.category,
            status = %persisted.status,
            "audit event recorded"
        );
        Ok(persisted)
    }

    /// Filtered, paginated query (newest first)
    pub fn query(&self, query: &AuditQuery) -> AuditResult<AuditPage> {
        if query.limit == 0 || query.limit > MAX_PAGE_LIMIT {
            return Err(AuditError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, query.limit
            )));
        }

        let page = Page {
            skip: query.skip,
            limit: query.limit,
        };
        let (total, events) = self.store.query_audit(&query.filter(), page)?;
        Ok(AuditPage { total, events })
    }

    /// Write every matching event to `path` as JSON lines, oldest first
    ///
    /// Returns the number of lines written. An existing file is replaced.
    pub fn export_jsonl(&self, path: impl AsRef<Path>, query: &AuditQuery) -> AuditResult<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let events = self.store.audit_events_ascending(&query.filter())?;

        let file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        for event in &events {
            let json = serde_json::to_string(event)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        info!(count = events.len(), path = %path.display(), "audit trail exported");
        Ok(events.len())
    }
}

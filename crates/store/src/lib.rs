//! BioGate Store - transactional SQLite storage
//!
//! Four tables, nothing else:
//! - `principals`
//! - `biometric_descriptors` (ciphertext only; one active row per principal + modality)
//! - `actions` (status changes are compare-and-swap on `status = 'pending'`)
//! - `audit_events` (append-only; principal reference nulled on erasure)
//!
//! Every write that pairs a state change with its audit event runs in a
//! single SQLite transaction, so either both rows land or neither does.

mod actions;
mod audit;
mod codec;
mod descriptors;
pub mod error;
mod principals;
mod schema;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub use actions::Decision;
pub use audit::{AuditFilter, Page};
pub use descriptors::DescriptorRecord;
pub use error::StoreError;
pub use principals::ErasureReport;

/// SQLite-backed store shared by all components
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

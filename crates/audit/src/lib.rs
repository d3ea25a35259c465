//! BioGate Audit Recorder
//!
//! Every enrollment, authentication and approval decision leaves an
//! `AuditEvent`. Events are never updated or deleted; erasing a principal
//! only nulls the principal reference.
//!
//! - [`entry::AuditEntry`] builds events with the actor's pseudonym attached
//! - [`recorder::AuditRecorder`] appends, queries (newest-first, paginated)
//!   and exports the trail as JSON lines

pub mod entry;
pub mod error;
pub mod recorder;

pub use entry::AuditEntry;
pub use error::AuditError;
pub use recorder::{AuditPage, AuditQuery, AuditRecorder, MAX_PAGE_LIMIT};

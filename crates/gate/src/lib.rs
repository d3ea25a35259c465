//! BioGate Action Gate
//!
//! Lifecycle of a gated action:
//!
//! ```text
//! request_action ──► PENDING ──approve_action──► APPROVED
//!                       │                 └────► DENIED (mismatch, failure, expiry)
//!                       └──sweep_expired───────► DENIED
//! ```
//!
//! Terminal states are final. The transition out of PENDING is a
//! compare-and-swap in the store, so concurrent approvals of one action
//! produce exactly one decision; the loser sees `AlreadyDecided`.

pub mod config;
pub mod error;
pub mod gate;
pub mod sweeper;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{ActionGate, ActionRequest, ActionStatusView, ActionTicket, ApprovalDecision, GateStats};
pub use sweeper::spawn_expiry_sweeper;

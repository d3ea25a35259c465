//! BioGate Core - Domain types
//!
//! Types shared by every component of the approval gate:
//! - `Principal`: subject identity with role, consent and pseudonym
//! - `FeatureVector`: opaque biometric descriptor (plaintext, never persisted)
//! - `BiometricDescriptor`: encrypted descriptor row, one active per (principal, modality)
//! - `Action`: operation awaiting biometric approval
//! - `AuditEvent`: immutable audit trail record

pub mod action;
pub mod audit;
pub mod descriptor;
pub mod error;
pub mod principal;
pub mod pseudonym;

pub use action::{Action, ActionStatus, DEFAULT_ACTION_TTL_MINUTES};
pub use audit::{AuditCategory, AuditEvent, NewAuditEvent};
pub use descriptor::{BiometricDescriptor, ElementType, FeatureData, FeatureVector, Modality};
pub use error::CoreError;
pub use principal::{NewPrincipal, Principal, PrincipalId, Role};
pub use pseudonym::pseudonymize;

//! Verifier errors

use biogate_core::{Modality, PrincipalId};
use thiserror::Error;

/// Why a sample produced no usable feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("No {0} signal detected in sample")]
    NoSignal(Modality),

    #[error("Unreadable sample: {0}")]
    Unreadable(String),

    #[error("Modality not supported: {0}")]
    Unsupported(Modality),
}

/// Errors that abort a verifier call
///
/// Biometric failures (no signal, no enrollment, mismatch, unreadable
/// descriptor) are reported through the outcome types instead.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    #[error("Store error: {0}")]
    Store(#[from] biogate_store::StoreError),

    #[error("Audit error: {0}")]
    Audit(#[from] biogate_audit::AuditError),
}

pub type VerifierResult<T> = Result<T, VerifierError>;

//! Gate errors

use biogate_biometric::VerifierError;
use biogate_core::{ActionStatus, PrincipalId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Action not found: {0}")]
    NotFound(String),

    #[error("Action is already {0}")]
    AlreadyDecided(ActionStatus),

    #[error("Action has expired")]
    Expired,

    #[error("Principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] biogate_store::StoreError),

    #[error("Verifier error: {0}")]
    Verifier(VerifierError),
}

impl From<VerifierError> for GateError {
    fn from(err: VerifierError) -> Self {
        match err {
            VerifierError::PrincipalNotFound(id) => GateError::PrincipalNotFound(id),
            VerifierError::Validation(msg) => GateError::Validation(msg),
            VerifierError::Store(e) => GateError::Store(e),
            other => GateError::Verifier(other),
        }
    }
}

pub type GateResult<T> = Result<T, GateError>;

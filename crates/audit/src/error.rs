//! Audit errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Store error: {0}")]
    Store(#[from] biogate_store::StoreError),

    #[error("Invalid audit query: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

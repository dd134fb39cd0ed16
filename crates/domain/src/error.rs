//! Domain error taxonomy.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by domain services.
///
/// Each variant maps to exactly one HTTP status in the api crate; the
/// message is user-facing and must never carry internal identifiers.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not registered")]
    NotRegistered,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Zero rows deleted. Covers "no such trade", "not yours" and "no longer
    /// open" without telling them apart.
    #[error("Cannot delete trade")]
    CannotDelete,

    /// Payment flag update matched no row. Reported as a server failure.
    #[error("Failed to update payment status")]
    PaymentNotRecorded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DomainError::NotFound("Resource not found".into()),
            StoreError::AlreadyExists => DomainError::Conflict("Resource already exists".into()),
            StoreError::Conflict => DomainError::Conflict("Conflicting update".into()),
            StoreError::Backend(msg) => DomainError::Internal(format!("Store error: {}", msg)),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        DomainError::Validation(messages.join(", "))
    }
}

//! Error types for the team access engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TeamgateError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Operation forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification callers use to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Forbidden,
    AccessDenied,
    StoreUnavailable,
}

impl TeamgateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Forbidden { .. } | Self::Validation { .. } => ErrorKind::Forbidden,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Database(_) | Self::Internal(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type TeamgateResult<T> = Result<T, TeamgateError>;

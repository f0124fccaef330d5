//! Database-specific error types and conversions.
//!
//! Guarded transactions abort with `THROW "teamgate:<kind>:<entity>:<id>"`
//! so the failing rule can be recovered from the store's error message.

use std::collections::HashMap;

use teamgate_core::error::TeamgateError;

const THROW_NOT_FOUND: &str = "teamgate:not_found:";
const THROW_CONFLICT: &str = "teamgate:conflict:";
const THROW_LAST_ADMIN: &str = "teamgate:last_admin:";

/// Reported for every statement of a cancelled transaction except the one
/// that actually failed.
const NOT_EXECUTED: &str = "not executed due to a failed transaction";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Transaction rejected: {0}")]
    Forbidden(String),

    #[error("Failed to decode {entity} row: {message}")]
    Decode { entity: String, message: String },

    #[error("Query failed: {0}")]
    Query(String),
}

impl DbError {
    /// Classifies the per-statement errors of a guarded transaction.
    ///
    /// A cancelled transaction reports a placeholder for every statement;
    /// the real cause (a guard `THROW`, a unique index rejection or a commit
    /// conflict) may sit at any index. `entity` names the table whose
    /// unique index backs the write.
    pub(crate) fn check_transaction(
        errors: HashMap<usize, surrealdb::Error>,
        entity: &str,
    ) -> Result<(), Self> {
        if errors.is_empty() {
            return Ok(());
        }
        let mut errors: Vec<_> = errors.into_iter().collect();
        errors.sort_by_key(|(index, _)| *index);
        let messages: Vec<String> = errors.into_iter().map(|(_, e)| e.to_string()).collect();
        Err(classify_all(&messages, entity))
    }

    pub(crate) fn decode(entity: &str, message: impl ToString) -> Self {
        Self::Decode {
            entity: entity.into(),
            message: message.to_string(),
        }
    }
}

/// Extracts `(entity, id)` following `marker` in a thrown message.
fn marker_fields<'a>(message: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')))
        .unwrap_or(rest.len());
    let token = &rest[..end];
    Some(token.split_once(':').unwrap_or((token, "")))
}

fn classify(message: &str, entity: &str) -> DbError {
    if let Some((_, group_id)) = marker_fields(message, THROW_LAST_ADMIN) {
        DbError::Forbidden(format!("group {group_id} must keep at least one admin"))
    } else if let Some((entity, id)) = marker_fields(message, THROW_NOT_FOUND) {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    } else if let Some((entity, _)) = marker_fields(message, THROW_CONFLICT) {
        DbError::Conflict {
            entity: entity.into(),
        }
    } else if message.contains("already contains") || is_write_conflict(message) {
        DbError::Conflict {
            entity: entity.into(),
        }
    } else {
        DbError::Query(message.to_string())
    }
}

/// A concurrent transaction committed a write to the same keys first.
fn is_write_conflict(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("transaction conflict") || message.contains("read or write conflict")
}

/// The first message that classifies as a known rule wins; otherwise the
/// first message that is not the cancellation placeholder.
fn classify_all(messages: &[String], entity: &str) -> DbError {
    let mut fallback = None;
    for message in messages {
        match classify(message, entity) {
            DbError::Query(_) => {
                if fallback.is_none() && !message.contains(NOT_EXECUTED) {
                    fallback = Some(message.clone());
                }
            }
            known => return known,
        }
    }
    DbError::Query(
        fallback
            .or_else(|| messages.first().cloned())
            .unwrap_or_default(),
    )
}

impl From<DbError> for TeamgateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TeamgateError::NotFound { entity, id },
            DbError::Conflict { entity } => TeamgateError::AlreadyExists { entity },
            DbError::Forbidden(reason) => TeamgateError::Forbidden { reason },
            other => TeamgateError::Database(other.to_string()),
        }
    }
}

//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The `audit_log` table denies update and delete at the schema level; this
//! repository only ever inserts and selects.

use chrono::{DateTime, SecondsFormat, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use teamgate_core::error::TeamgateResult;
use teamgate_core::models::audit::{AuditLogEntry, AuditLogFilter, CreateAuditLogEntry};
use teamgate_core::repository::{AuditLogRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use super::{CountRow, audit_content, parse_uuid, total_of};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditLogRow {
    record_id: String,
    group_id: Option<String>,
    action: String,
    target_type: String,
    target_id: Option<String>,
    details: serde_json::Value,
    performed_by: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    performed_at: DateTime<Utc>,
}

impl AuditLogRow {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let decode = |e: teamgate_core::error::TeamgateError| DbError::decode("audit_log", e);
        Ok(AuditLogEntry {
            id: parse_uuid("audit_log", &self.record_id)?,
            group_id: self
                .group_id
                .as_deref()
                .map(|g| parse_uuid("audit_log", g))
                .transpose()?,
            action: self.action.parse().map_err(decode)?,
            target_type: self.target_type.parse().map_err(decode)?,
            target_id: self
                .target_id
                .as_deref()
                .map(|t| parse_uuid("audit_log", t))
                .transpose()?,
            details: self.details,
            performed_by: parse_uuid("audit_log", &self.performed_by)?,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            performed_at: self.performed_at,
        })
    }
}

/// SurrealDB implementation of the append-only audit log.
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

// `Surreal<C>` is cloneable for every connection; a derive would demand `C: Clone`.
impl<C: Connection> Clone for SurrealAuditLogRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> TeamgateResult<AuditLogEntry> {
        let id_str = Uuid::new_v4().to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) CONTENT $audit; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('audit_log', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("audit", audit_content(&input)))
            .await
            .map_err(DbError::from)?;

        DbError::check_transaction(result.take_errors(), "audit_log")?;

        let rows: Vec<AuditLogRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;
        Ok(row.try_into_entry()?)
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> TeamgateResult<PaginatedResult<AuditLogEntry>> {
        let mut conditions = Vec::new();
        if filter.group_id.is_some() {
            conditions.push("group_id = $group_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.performed_by.is_some() {
            conditions.push("performed_by = $performed_by");
        }
        if filter.from.is_some() {
            conditions.push("performed_at >= <datetime>$from");
        }
        if filter.to.is_some() {
            conditions.push("performed_at <= <datetime>$to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM audit_log {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
             ORDER BY performed_at DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(group_id) = filter.group_id {
            builder = builder.bind(("group_id", group_id.to_string()));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action.as_str()));
        }
        if let Some(performed_by) = filter.performed_by {
            builder = builder.bind(("performed_by", performed_by.to_string()));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", timestamp(from)));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", timestamp(to)));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let rows: Vec<AuditLogRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_rfc3339_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2024-03-01T12:30:00.000000000Z");
    }
}

//! SurrealDB repository implementations.

mod audit;
mod group;
mod team;

pub use audit::SurrealAuditLogRepository;
pub use group::SurrealUserGroupRepository;
pub use team::SurrealTeamRepository;

use surrealdb_types::SurrealValue;
use teamgate_core::models::audit::CreateAuditLogEntry;
use teamgate_core::models::role::TeamRole;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn total_of(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

fn parse_uuid(entity: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::decode(entity, format!("invalid UUID: {e}")))
}

fn parse_role(entity: &str, value: &str) -> Result<TeamRole, DbError> {
    value
        .parse()
        .map_err(|e: teamgate_core::error::TeamgateError| DbError::decode(entity, e))
}

/// Builds the `CONTENT` object for an `audit_log` insert. Unset optional
/// fields are omitted so the schema stores them as `NONE`, and
/// `performed_at` is left to the field default.
fn audit_content(audit: &CreateAuditLogEntry) -> serde_json::Value {
    let mut content = serde_json::Map::new();
    content.insert("action".into(), audit.action.as_str().into());
    content.insert("target_type".into(), audit.target_type.as_str().into());
    content.insert("performed_by".into(), audit.performed_by.to_string().into());
    content.insert("details".into(), details_object(&audit.details));
    if let Some(group_id) = audit.group_id {
        content.insert("group_id".into(), group_id.to_string().into());
    }
    if let Some(target_id) = audit.target_id {
        content.insert("target_id".into(), target_id.to_string().into());
    }
    if let Some(ip) = &audit.ip_address {
        content.insert("ip_address".into(), ip.clone().into());
    }
    if let Some(ua) = &audit.user_agent {
        content.insert("user_agent".into(), ua.clone().into());
    }
    serde_json::Value::Object(content)
}

/// `details` is stored as an object; scalars are wrapped under `value`.
fn details_object(details: &serde_json::Value) -> serde_json::Value {
    match details {
        serde_json::Value::Object(_) => details.clone(),
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => serde_json::json!({ "value": other }),
    }
}

//! Access provenance for a single user on a single team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::TeamRole;

/// Which membership paths grant a user access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamAccessType {
    Direct,
    Group,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectAccessInfo {
    pub role: TeamRole,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupAccessInfo {
    pub group_id: Uuid,
    pub group_name: String,
    pub role: TeamRole,
    pub assigned_at: DateTime<Utc>,
}

/// Breakdown of how a user reaches a team. Only produced when at least
/// one path exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamAccessInfo {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub access_type: TeamAccessType,
    pub effective_role: TeamRole,
    pub direct_access: Option<DirectAccessInfo>,
    pub group_access: Vec<GroupAccessInfo>,
}

//! User group domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::TeamRole;

/// A named, reusable collection of users. Assigning the group to a team
/// grants every member the group's role on that team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserGroup {
    pub id: Uuid,
    /// Globally unique, case-sensitive.
    pub name: String,
    pub description: Option<String>,
    /// Role copied onto new team grants.
    pub role: TeamRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserGroup {
    pub name: String,
    pub description: Option<String>,
    pub role: TeamRole,
}

/// Partial group update. `description` distinguishes "leave unchanged"
/// (`None`) from "clear" (`Some(None)`); in JSON an absent field leaves it
/// and an explicit `null` clears it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUserGroup {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub role: Option<TeamRole>,
}

/// Any present value, `null` included, becomes `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateUserGroup {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.role.is_none()
    }
}

/// Filter for group listings. `search` matches name or description,
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct UserGroupFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    pub added_by: Uuid,
}

/// Grants every member of `group_id` the `role` on `team_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupTeamAccess {
    pub id: Uuid,
    pub group_id: Uuid,
    pub team_id: Uuid,
    pub role: TeamRole,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupTeamAccess {
    pub group_id: Uuid,
    pub team_id: Uuid,
    pub role: TeamRole,
    pub assigned_by: Uuid,
}

/// A team grant joined with the name of the team it targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTeamAccessWithTeam {
    pub access: GroupTeamAccess,
    pub team_name: String,
}

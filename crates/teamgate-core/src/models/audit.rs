//! Audit log domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::Actor;
use crate::error::TeamgateError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    MemberAdded,
    MemberRemoved,
    MemberAdminGranted,
    MemberAdminRevoked,
    TeamAccessGranted,
    TeamAccessRevoked,
    InvitationSent,
    InvitationAccepted,
    InvitationExpired,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GroupCreated => "GROUP_CREATED",
            Self::GroupUpdated => "GROUP_UPDATED",
            Self::GroupDeleted => "GROUP_DELETED",
            Self::MemberAdded => "MEMBER_ADDED",
            Self::MemberRemoved => "MEMBER_REMOVED",
            Self::MemberAdminGranted => "MEMBER_ADMIN_GRANTED",
            Self::MemberAdminRevoked => "MEMBER_ADMIN_REVOKED",
            Self::TeamAccessGranted => "TEAM_ACCESS_GRANTED",
            Self::TeamAccessRevoked => "TEAM_ACCESS_REVOKED",
            Self::InvitationSent => "INVITATION_SENT",
            Self::InvitationAccepted => "INVITATION_ACCEPTED",
            Self::InvitationExpired => "INVITATION_EXPIRED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = TeamgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GROUP_CREATED" => Self::GroupCreated,
            "GROUP_UPDATED" => Self::GroupUpdated,
            "GROUP_DELETED" => Self::GroupDeleted,
            "MEMBER_ADDED" => Self::MemberAdded,
            "MEMBER_REMOVED" => Self::MemberRemoved,
            "MEMBER_ADMIN_GRANTED" => Self::MemberAdminGranted,
            "MEMBER_ADMIN_REVOKED" => Self::MemberAdminRevoked,
            "TEAM_ACCESS_GRANTED" => Self::TeamAccessGranted,
            "TEAM_ACCESS_REVOKED" => Self::TeamAccessRevoked,
            "INVITATION_SENT" => Self::InvitationSent,
            "INVITATION_ACCEPTED" => Self::InvitationAccepted,
            "INVITATION_EXPIRED" => Self::InvitationExpired,
            other => {
                return Err(TeamgateError::Validation {
                    message: format!("unknown audit action: {other}"),
                });
            }
        })
    }
}

/// Kind of object an audit entry's `target_id` refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    Group,
    Member,
    TeamAccess,
    Invitation,
}

impl AuditTargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Member => "member",
            Self::TeamAccess => "team_access",
            Self::Invitation => "invitation",
        }
    }
}

impl FromStr for AuditTargetType {
    type Err = TeamgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(Self::Group),
            "member" => Ok(Self::Member),
            "team_access" => Ok(Self::TeamAccess),
            "invitation" => Ok(Self::Invitation),
            other => Err(TeamgateError::Validation {
                message: format!("unknown audit target type: {other}"),
            }),
        }
    }
}

/// Immutable record of one permission-affecting mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// `None` for system-wide actions.
    pub group_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub performed_by: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub performed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub group_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub performed_by: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl CreateAuditLogEntry {
    /// Starts an entry attributed to `actor`, carrying its provenance.
    pub fn by(actor: &Actor, action: AuditAction, target_type: AuditTargetType) -> Self {
        Self {
            group_id: None,
            action,
            target_type,
            target_id: None,
            details: serde_json::Value::Object(Default::default()),
            performed_by: actor.id,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        }
    }

    pub fn group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn target(mut self, target_id: Uuid) -> Self {
        self.target_id = Some(target_id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Filters for audit log queries. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub group_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub performed_by: Option<Uuid>,
    /// Inclusive lower bound on `performed_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `performed_at`.
    pub to: Option<DateTime<Utc>>,
}

//! Group mutation service.
//!
//! Every mutation on an existing group runs under that group's lock, checks
//! its preconditions, then hands the domain write and its audit entry to the
//! repository as one transaction. Notifications go out only after commit.
//! Rejections return a [`GroupError`] and leave no audit entry behind.

use serde::Serialize;
use serde_json::json;
use teamgate_core::error::{TeamgateError, TeamgateResult};
use teamgate_core::models::actor::Actor;
use teamgate_core::models::audit::{AuditAction, AuditTargetType, CreateAuditLogEntry};
use teamgate_core::models::group::{
    CreateGroupMember, CreateGroupTeamAccess, CreateUserGroup, GroupMember, GroupTeamAccess,
    GroupTeamAccessWithTeam, UpdateUserGroup, UserGroup, UserGroupFilter,
};
use teamgate_core::notify::{ChangeNotifier, topics};
use teamgate_core::repository::{PaginatedResult, TeamRepository, UserGroupRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::error::GroupError;
use crate::locks::GroupLocks;

pub struct GroupService<G, T, N>
where
    G: UserGroupRepository,
    T: TeamRepository,
    N: ChangeNotifier,
{
    groups: G,
    teams: T,
    notifier: N,
    locks: GroupLocks,
    config: AccessConfig,
}

impl<G, T, N> GroupService<G, T, N>
where
    G: UserGroupRepository,
    T: TeamRepository,
    N: ChangeNotifier,
{
    pub fn new(groups: G, teams: T, notifier: N, config: AccessConfig) -> Self {
        Self {
            groups,
            teams,
            notifier,
            locks: GroupLocks::default(),
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Group lifecycle
    // -----------------------------------------------------------------------

    pub async fn create_group(
        &self,
        input: CreateUserGroup,
        actor: &Actor,
    ) -> Result<UserGroup, GroupError> {
        if self.groups.find_by_name(&input.name).await?.is_some() {
            return Err(GroupError::NameTaken);
        }

        let audit = CreateAuditLogEntry::by(actor, AuditAction::GroupCreated, AuditTargetType::Group)
            .details(json!({
                "name": input.name,
                "role": input.role,
                "description": input.description,
            }));

        // The unique index settles races the lookup above cannot see.
        let group = self.groups.create(input, audit).await.map_err(|e| match e {
            TeamgateError::AlreadyExists { .. } => GroupError::NameTaken,
            other => GroupError::Store(other),
        })?;

        info!(group_id = %group.id, name = %group.name, actor = %actor.id, "group created");
        Ok(group)
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        input: UpdateUserGroup,
        actor: &Actor,
    ) -> Result<UserGroup, GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let before = self.require_group(group_id).await?;
        if input.is_empty() {
            debug!(group_id = %group_id, "empty group update, nothing to write");
            return Ok(before);
        }
        if let Some(name) = input.name.as_deref() {
            if name != before.name && self.groups.find_by_name(name).await?.is_some() {
                return Err(GroupError::NameTaken);
            }
        }

        let audit = CreateAuditLogEntry::by(actor, AuditAction::GroupUpdated, AuditTargetType::Group)
            .target(group_id)
            .details(json!({
                "changes": changes_of(&input),
                "before": {
                    "name": before.name,
                    "description": before.description,
                    "role": before.role,
                },
            }));

        let updated = self
            .groups
            .update(group_id, input, audit)
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::GroupNotFound,
                TeamgateError::AlreadyExists { .. } => GroupError::NameTaken,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, actor = %actor.id, "group updated");
        self.notify(topics::group_updated(group_id), &updated);
        Ok(updated)
    }

    pub async fn delete_group(&self, group_id: Uuid, actor: &Actor) -> Result<(), GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let group = self.require_group(group_id).await?;
        let member_count = self.groups.count_members(group_id).await?;

        let audit = CreateAuditLogEntry::by(actor, AuditAction::GroupDeleted, AuditTargetType::Group)
            .target(group_id)
            .details(json!({ "name": group.name, "memberCount": member_count }));

        self.groups
            .delete(group_id, audit)
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::GroupNotFound,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, member_count, actor = %actor.id, "group deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
        actor: &Actor,
    ) -> Result<GroupMember, GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        self.require_group(group_id).await?;
        if self.groups.find_member(group_id, user_id).await?.is_some() {
            return Err(GroupError::MemberExists);
        }

        let audit = CreateAuditLogEntry::by(actor, AuditAction::MemberAdded, AuditTargetType::Member)
            .details(json!({ "userUid": user_id, "isAdmin": is_admin }));

        let member = self
            .groups
            .add_member(
                CreateGroupMember {
                    group_id,
                    user_id,
                    is_admin,
                    added_by: actor.id,
                },
                audit,
            )
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::GroupNotFound,
                TeamgateError::AlreadyExists { .. } => GroupError::MemberExists,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, user_id = %user_id, is_admin, actor = %actor.id, "member added");
        self.notify(topics::member_added(group_id), &member);
        Ok(member)
    }

    /// Removes `user_id` from the group.
    ///
    /// Unless the actor is a system administrator, an admin cannot remove
    /// themselves and the last admin of a group cannot be removed.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        actor: &Actor,
    ) -> Result<(), GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let member = self
            .groups
            .find_member(group_id, user_id)
            .await?
            .ok_or(GroupError::MemberNotFound)?;
        if member.is_admin {
            self.check_admin_loss(group_id, user_id, actor).await?;
        }

        let audit =
            CreateAuditLogEntry::by(actor, AuditAction::MemberRemoved, AuditTargetType::Member)
                .target(member.id)
                .details(json!({ "userUid": user_id }));

        self.groups
            .remove_member(group_id, user_id, !actor.is_system_admin, audit)
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::MemberNotFound,
                TeamgateError::Forbidden { .. } => GroupError::LastAdmin,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, user_id = %user_id, actor = %actor.id, "member removed");
        self.notify(topics::member_removed(group_id), &json!({ "userUid": user_id }));
        Ok(())
    }

    /// Grants or revokes the admin flag. Setting the current value is a
    /// no-op and is not audited. Revocation follows the same protection
    /// rules as [`remove_member`](Self::remove_member).
    pub async fn set_member_admin(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
        actor: &Actor,
    ) -> Result<GroupMember, GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let member = self
            .groups
            .find_member(group_id, user_id)
            .await?
            .ok_or(GroupError::MemberNotFound)?;
        if member.is_admin == is_admin {
            return Ok(member);
        }
        if !is_admin {
            self.check_admin_loss(group_id, user_id, actor).await?;
        }

        let action = if is_admin {
            AuditAction::MemberAdminGranted
        } else {
            AuditAction::MemberAdminRevoked
        };
        let audit = CreateAuditLogEntry::by(actor, action, AuditTargetType::Member)
            .target(member.id)
            .details(json!({ "userUid": user_id, "isAdmin": is_admin }));

        let member = self
            .groups
            .set_member_admin(group_id, user_id, is_admin, !actor.is_system_admin, audit)
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::MemberNotFound,
                TeamgateError::Forbidden { .. } => GroupError::LastAdmin,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, user_id = %user_id, is_admin, actor = %actor.id, "admin flag changed");
        Ok(member)
    }

    /// Self-removal and last-admin protection for an admin losing the flag.
    async fn check_admin_loss(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        actor: &Actor,
    ) -> Result<(), GroupError> {
        if actor.is_system_admin {
            return Ok(());
        }
        if user_id == actor.id {
            warn!(group_id = %group_id, actor = %actor.id, "admin tried to remove themselves");
            return Err(GroupError::CannotRemoveSelf);
        }
        if self.groups.count_admins(group_id).await? <= 1 {
            warn!(group_id = %group_id, user_id = %user_id, actor = %actor.id, "refusing to drop last admin");
            return Err(GroupError::LastAdmin);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Team access
    // -----------------------------------------------------------------------

    /// Grants every member of the group the group's current default role on
    /// `team_id`. Later changes to the default role do not touch existing
    /// grants.
    pub async fn assign_to_team(
        &self,
        group_id: Uuid,
        team_id: Uuid,
        actor: &Actor,
    ) -> Result<GroupTeamAccess, GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let group = self.require_group(group_id).await?;
        match self.teams.get_by_id(team_id).await {
            Ok(_) => {}
            Err(TeamgateError::NotFound { .. }) => return Err(GroupError::TeamNotFound),
            Err(other) => return Err(other.into()),
        }
        if self.groups.find_team_access(group_id, team_id).await?.is_some() {
            return Err(GroupError::AccessExists);
        }

        let audit = CreateAuditLogEntry::by(
            actor,
            AuditAction::TeamAccessGranted,
            AuditTargetType::TeamAccess,
        )
        .details(json!({ "teamId": team_id }));

        let access = self
            .groups
            .assign_team(
                CreateGroupTeamAccess {
                    group_id,
                    team_id,
                    role: group.role,
                    assigned_by: actor.id,
                },
                audit,
            )
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { entity, .. } if entity == "team" => GroupError::TeamNotFound,
                TeamgateError::NotFound { .. } => GroupError::GroupNotFound,
                TeamgateError::AlreadyExists { .. } => GroupError::AccessExists,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, team_id = %team_id, role = %access.role, actor = %actor.id, "team access granted");
        self.notify(topics::team_access_changed(group_id), &access);
        Ok(access)
    }

    pub async fn revoke_from_team(
        &self,
        group_id: Uuid,
        team_id: Uuid,
        actor: &Actor,
    ) -> Result<(), GroupError> {
        let _guard = self.locks.acquire(group_id).await;

        let access = self
            .groups
            .find_team_access(group_id, team_id)
            .await?
            .ok_or(GroupError::AccessNotFound)?;

        let audit = CreateAuditLogEntry::by(
            actor,
            AuditAction::TeamAccessRevoked,
            AuditTargetType::TeamAccess,
        )
        .target(access.id)
        .details(json!({ "teamId": team_id }));

        self.groups
            .revoke_team(group_id, team_id, audit)
            .await
            .map_err(|e| match e {
                TeamgateError::NotFound { .. } => GroupError::AccessNotFound,
                other => GroupError::Store(other),
            })?;

        info!(group_id = %group_id, team_id = %team_id, actor = %actor.id, "team access revoked");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get_group(&self, group_id: Uuid) -> Result<UserGroup, GroupError> {
        self.require_group(group_id).await
    }

    /// Groups whose name or description contains `search`
    /// (case-insensitive), newest first.
    pub async fn list_groups(
        &self,
        search: Option<String>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> TeamgateResult<PaginatedResult<UserGroup>> {
        self.groups
            .list(
                UserGroupFilter { search },
                self.config.pagination(limit, offset),
            )
            .await
    }

    pub async fn list_members(
        &self,
        group_id: Uuid,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> TeamgateResult<PaginatedResult<GroupMember>> {
        self.groups
            .list_members(group_id, self.config.pagination(limit, offset))
            .await
    }

    pub async fn list_team_access(
        &self,
        group_id: Uuid,
    ) -> TeamgateResult<Vec<GroupTeamAccessWithTeam>> {
        self.groups.list_team_access(group_id).await
    }

    pub async fn list_user_groups(&self, user_id: Uuid) -> TeamgateResult<Vec<UserGroup>> {
        self.groups.get_user_groups(user_id).await
    }

    pub async fn list_team_groups(&self, team_id: Uuid) -> TeamgateResult<Vec<UserGroup>> {
        self.groups.get_team_groups(team_id).await
    }

    pub async fn member_count(&self, group_id: Uuid) -> TeamgateResult<u64> {
        self.groups.count_members(group_id).await
    }

    pub async fn team_count(&self, group_id: Uuid) -> TeamgateResult<u64> {
        self.groups.count_team_access(group_id).await
    }

    pub async fn is_group_admin(&self, group_id: Uuid, user_id: Uuid) -> TeamgateResult<bool> {
        Ok(self
            .groups
            .find_member(group_id, user_id)
            .await?
            .is_some_and(|m| m.is_admin))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn require_group(&self, group_id: Uuid) -> Result<UserGroup, GroupError> {
        match self.groups.get_by_id(group_id).await {
            Ok(group) => Ok(group),
            Err(TeamgateError::NotFound { .. }) => Err(GroupError::GroupNotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Best-effort, after commit.
    fn notify<P: Serialize>(&self, topic: String, payload: &P) {
        match serde_json::to_value(payload) {
            Ok(value) => self.notifier.publish(&topic, value),
            Err(e) => warn!(topic = %topic, error = %e, "failed to encode notification payload"),
        }
    }
}

/// The fields an update actually sets.
fn changes_of(input: &UpdateUserGroup) -> serde_json::Value {
    let mut changes = serde_json::Map::new();
    if let Some(name) = &input.name {
        changes.insert("name".into(), json!(name));
    }
    if let Some(description) = &input.description {
        changes.insert("description".into(), json!(description));
    }
    if let Some(role) = input.role {
        changes.insert("role".into(), json!(role));
    }
    serde_json::Value::Object(changes)
}

//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Audited mutations take the audit
//! entry alongside the domain input; implementations must persist both in
//! one transaction so that neither exists without the other.

use uuid::Uuid;

use crate::error::TeamgateResult;
use crate::models::{
    access::GroupAccessInfo,
    audit::{AuditLogEntry, AuditLogFilter, CreateAuditLogEntry},
    group::{
        CreateGroupMember, CreateGroupTeamAccess, CreateUserGroup, GroupMember, GroupTeamAccess,
        GroupTeamAccessWithTeam, UpdateUserGroup, UserGroup, UserGroupFilter,
    },
    role::TeamRole,
    team::{CreateTeam, CreateTeamMember, Team, TeamMember},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Teams & direct membership
// ---------------------------------------------------------------------------

pub trait TeamRepository: Send + Sync {
    fn create(&self, input: CreateTeam) -> impl Future<Output = TeamgateResult<Team>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TeamgateResult<Team>> + Send;
    /// Deletes the team together with its direct memberships and group grants.
    ///
    /// Every removed group grant is audited as `TEAM_ACCESS_REVOKED` in the
    /// same transaction. `revoke_audit` supplies the actor, provenance and
    /// details; group and target are taken from each grant.
    fn delete(
        &self,
        id: Uuid,
        revoke_audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TeamgateResult<PaginatedResult<Team>>> + Send;

    /// Fails with `AlreadyExists` when the user is already a direct member.
    fn add_member(
        &self,
        input: CreateTeamMember,
    ) -> impl Future<Output = TeamgateResult<TeamMember>> + Send;
    fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> impl Future<Output = TeamgateResult<TeamMember>> + Send;
    fn remove_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<()>> + Send;
    fn find_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Option<TeamMember>>> + Send;
    fn list_members(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = TeamgateResult<PaginatedResult<TeamMember>>> + Send;
}

// ---------------------------------------------------------------------------
// User groups
// ---------------------------------------------------------------------------

pub trait UserGroupRepository: Send + Sync {
    /// Inserts the group and its audit entry. The entry's `group_id` and
    /// `target_id` are set to the new group's id.
    fn create(
        &self,
        input: CreateUserGroup,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<UserGroup>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TeamgateResult<UserGroup>> + Send;
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = TeamgateResult<Option<UserGroup>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUserGroup,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<UserGroup>> + Send;
    /// Writes the audit entry, then deletes the group, its memberships and
    /// its team grants.
    fn delete(
        &self,
        id: Uuid,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<()>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: UserGroupFilter,
        pagination: Pagination,
    ) -> impl Future<Output = TeamgateResult<PaginatedResult<UserGroup>>> + Send;

    /// The audit entry's `target_id` is set to the new membership's id.
    fn add_member(
        &self,
        input: CreateGroupMember,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<GroupMember>> + Send;
    /// With `protect_last_admin`, demoting the only admin fails with
    /// `Forbidden` inside the transaction.
    fn set_member_admin(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
        protect_last_admin: bool,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<GroupMember>> + Send;
    /// With `protect_last_admin`, removing the only admin fails with
    /// `Forbidden` inside the transaction.
    fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        protect_last_admin: bool,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<()>> + Send;
    fn find_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Option<GroupMember>>> + Send;
    fn count_members(&self, group_id: Uuid) -> impl Future<Output = TeamgateResult<u64>> + Send;
    fn count_admins(&self, group_id: Uuid) -> impl Future<Output = TeamgateResult<u64>> + Send;
    fn list_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = TeamgateResult<PaginatedResult<GroupMember>>> + Send;
    fn get_user_groups(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Vec<UserGroup>>> + Send;

    /// The audit entry's `target_id` is set to the new grant's id.
    fn assign_team(
        &self,
        input: CreateGroupTeamAccess,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<GroupTeamAccess>> + Send;
    fn revoke_team(
        &self,
        group_id: Uuid,
        team_id: Uuid,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<()>> + Send;
    fn find_team_access(
        &self,
        group_id: Uuid,
        team_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Option<GroupTeamAccess>>> + Send;
    fn count_team_access(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<u64>> + Send;
    fn list_team_access(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Vec<GroupTeamAccessWithTeam>>> + Send;
    fn get_team_groups(
        &self,
        team_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Vec<UserGroup>>> + Send;
    /// Every grant reaching `user_id` on `team_id` through a group it
    /// belongs to.
    fn get_user_team_grants(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> impl Future<Output = TeamgateResult<Vec<GroupAccessInfo>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit log (append-only)
// ---------------------------------------------------------------------------

/// No update or delete operations are exposed.
pub trait AuditLogRepository: Send + Sync {
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = TeamgateResult<AuditLogEntry>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = TeamgateResult<PaginatedResult<AuditLogEntry>>> + Send;
}

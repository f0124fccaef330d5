//! Effective-role resolution across direct and group membership.
//!
//! Every query re-reads the membership store; nothing is cached. All
//! operations derive from one [`AccessFacts`] snapshot so the role answer
//! and the provenance breakdown cannot disagree.

use teamgate_core::error::TeamgateResult;
use teamgate_core::models::access::{
    DirectAccessInfo, GroupAccessInfo, TeamAccessInfo, TeamAccessType,
};
use teamgate_core::models::role::TeamRole;
use teamgate_core::repository::{TeamRepository, UserGroupRepository};
use tracing::debug;
use uuid::Uuid;

/// Raw grants reaching one user on one team.
#[derive(Debug, Default)]
struct AccessFacts {
    direct: Option<DirectAccessInfo>,
    groups: Vec<GroupAccessInfo>,
}

impl AccessFacts {
    fn effective_role(&self) -> Option<TeamRole> {
        TeamRole::highest(
            self.direct
                .iter()
                .map(|d| d.role)
                .chain(self.groups.iter().map(|g| g.role)),
        )
    }

    fn access_type(&self) -> Option<TeamAccessType> {
        match (self.direct.is_some(), !self.groups.is_empty()) {
            (true, true) => Some(TeamAccessType::Both),
            (true, false) => Some(TeamAccessType::Direct),
            (false, true) => Some(TeamAccessType::Group),
            (false, false) => None,
        }
    }
}

/// Read-only resolver over the membership store.
pub struct PermissionResolver<T: TeamRepository, G: UserGroupRepository> {
    teams: T,
    groups: G,
}

impl<T: TeamRepository, G: UserGroupRepository> PermissionResolver<T, G> {
    pub fn new(teams: T, groups: G) -> Self {
        Self { teams, groups }
    }

    pub(crate) fn groups(&self) -> &G {
        &self.groups
    }

    async fn facts(&self, user_id: Uuid, team_id: Uuid) -> TeamgateResult<AccessFacts> {
        let direct = self
            .teams
            .find_member(team_id, user_id)
            .await?
            .map(|m| DirectAccessInfo {
                role: m.role,
                granted_at: m.created_at,
            });
        let groups = self.groups.get_user_team_grants(user_id, team_id).await?;
        Ok(AccessFacts { direct, groups })
    }

    /// Highest role granted to `user_id` on `team_id` by any path, or
    /// `None` when the user has no access. Unknown users and teams resolve
    /// to `None`.
    pub async fn resolve_effective_role(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> TeamgateResult<Option<TeamRole>> {
        let role = self.facts(user_id, team_id).await?.effective_role();
        debug!(user_id = %user_id, team_id = %team_id, role = ?role, "resolved effective role");
        Ok(role)
    }

    pub async fn has_access(&self, user_id: Uuid, team_id: Uuid) -> TeamgateResult<bool> {
        Ok(self.resolve_effective_role(user_id, team_id).await?.is_some())
    }

    pub async fn has_minimum_role(
        &self,
        user_id: Uuid,
        team_id: Uuid,
        minimum: TeamRole,
    ) -> TeamgateResult<bool> {
        Ok(self
            .resolve_effective_role(user_id, team_id)
            .await?
            .is_some_and(|role| role.meets_minimum(minimum)))
    }

    /// Provenance breakdown, or `None` when the user has no access.
    pub async fn access_info(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> TeamgateResult<Option<TeamAccessInfo>> {
        let facts = self.facts(user_id, team_id).await?;
        let (Some(access_type), Some(effective_role)) = (facts.access_type(), facts.effective_role())
        else {
            return Ok(None);
        };
        Ok(Some(TeamAccessInfo {
            user_id,
            team_id,
            access_type,
            effective_role,
            direct_access: facts.direct,
            group_access: facts.groups,
        }))
    }
}

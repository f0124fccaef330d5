//! Authorization guards.
//!
//! Guards are stateless policy gates. Each call re-resolves membership, so a
//! change made between two calls is always observed by the second.

use teamgate_core::error::{TeamgateError, TeamgateResult};
use teamgate_core::models::actor::Actor;
use teamgate_core::models::role::TeamRole;
use teamgate_core::repository::{TeamRepository, UserGroupRepository};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::resolver::PermissionResolver;

/// What a guarded operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardContext {
    Team(Uuid),
    Group(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("no access to this team")]
    NoTeamAccess,

    #[error("role {0} is not permitted for this operation")]
    RoleNotPermitted(TeamRole),

    #[error("role {role} is below the required {minimum}")]
    BelowMinimum { role: TeamRole, minimum: TeamRole },

    #[error("not an admin of this group")]
    NotGroupAdmin,

    #[error("system administrator privileges required")]
    NotSystemAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts a denial into `AccessDenied` for callers that propagate with `?`.
    pub fn into_result(self) -> TeamgateResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(TeamgateError::AccessDenied {
                reason: reason.to_string(),
            }),
        }
    }
}

pub struct AccessGuard<T: TeamRepository, G: UserGroupRepository> {
    resolver: PermissionResolver<T, G>,
}

impl<T: TeamRepository, G: UserGroupRepository> AccessGuard<T, G> {
    pub fn new(resolver: PermissionResolver<T, G>) -> Self {
        Self { resolver }
    }

    /// Team contexts allow iff the actor's effective role is one of
    /// `required_roles`. Group contexts ignore the roles and apply the
    /// group-admin check.
    pub async fn check(
        &self,
        actor: &Actor,
        required_roles: &[TeamRole],
        context: GuardContext,
    ) -> TeamgateResult<Decision> {
        match context {
            GuardContext::Team(team_id) => self.check_team_role(actor, team_id, required_roles).await,
            GuardContext::Group(group_id) => self.check_group_admin(actor, group_id).await,
        }
    }

    pub async fn check_team_role(
        &self,
        actor: &Actor,
        team_id: Uuid,
        required_roles: &[TeamRole],
    ) -> TeamgateResult<Decision> {
        let decision = match self.resolver.resolve_effective_role(actor.id, team_id).await? {
            None => Decision::Deny(DenyReason::NoTeamAccess),
            Some(role) if required_roles.contains(&role) => Decision::Allow,
            Some(role) => Decision::Deny(DenyReason::RoleNotPermitted(role)),
        };
        debug!(actor = %actor.id, team_id = %team_id, ?decision, "team role check");
        Ok(decision)
    }

    /// Allows any effective role ranked at or above `minimum`.
    pub async fn check_team_minimum(
        &self,
        actor: &Actor,
        team_id: Uuid,
        minimum: TeamRole,
    ) -> TeamgateResult<Decision> {
        let decision = match self.resolver.resolve_effective_role(actor.id, team_id).await? {
            None => Decision::Deny(DenyReason::NoTeamAccess),
            Some(role) if role.meets_minimum(minimum) => Decision::Allow,
            Some(role) => Decision::Deny(DenyReason::BelowMinimum { role, minimum }),
        };
        debug!(actor = %actor.id, team_id = %team_id, ?decision, "team minimum role check");
        Ok(decision)
    }

    /// System administrators always pass; otherwise the actor must be an
    /// admin member of the group.
    pub async fn check_group_admin(&self, actor: &Actor, group_id: Uuid) -> TeamgateResult<Decision> {
        if actor.is_system_admin {
            return Ok(Decision::Allow);
        }
        let is_admin = self
            .resolver
            .groups()
            .find_member(group_id, actor.id)
            .await?
            .is_some_and(|m| m.is_admin);
        let decision = if is_admin {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::NotGroupAdmin)
        };
        debug!(actor = %actor.id, group_id = %group_id, ?decision, "group admin check");
        Ok(decision)
    }

    pub fn check_system_admin(&self, actor: &Actor) -> Decision {
        if actor.is_system_admin {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::NotSystemAdmin)
        }
    }
}

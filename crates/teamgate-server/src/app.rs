//! Service wiring over one SurrealDB handle.

use surrealdb::{Connection, Surreal};
use teamgate_access::{
    AccessConfig, AccessGuard, AuditLog, GroupService, MemoryNotifier, PermissionResolver,
};
use teamgate_db::repository::{
    SurrealAuditLogRepository, SurrealTeamRepository, SurrealUserGroupRepository,
};

pub type Groups<C> =
    GroupService<SurrealUserGroupRepository<C>, SurrealTeamRepository<C>, MemoryNotifier>;
pub type Resolver<C> = PermissionResolver<SurrealTeamRepository<C>, SurrealUserGroupRepository<C>>;
pub type Guard<C> = AccessGuard<SurrealTeamRepository<C>, SurrealUserGroupRepository<C>>;

/// Every component of the engine, sharing one store and one notifier.
pub struct Teamgate<C: Connection> {
    pub teams: SurrealTeamRepository<C>,
    pub groups: Groups<C>,
    pub resolver: Resolver<C>,
    pub guard: Guard<C>,
    pub audit: AuditLog<SurrealAuditLogRepository<C>>,
    pub notifier: MemoryNotifier,
}

impl<C: Connection> Teamgate<C> {
    pub fn new(db: Surreal<C>, config: &AccessConfig) -> Self {
        let teams = SurrealTeamRepository::new(db.clone());
        let groups = SurrealUserGroupRepository::new(db.clone());
        let notifier = MemoryNotifier::new(config.notification_channel_capacity);

        Self {
            groups: GroupService::new(
                groups.clone(),
                teams.clone(),
                notifier.clone(),
                config.clone(),
            ),
            resolver: PermissionResolver::new(teams.clone(), groups.clone()),
            guard: AccessGuard::new(PermissionResolver::new(teams.clone(), groups)),
            audit: AuditLog::new(SurrealAuditLogRepository::new(db), config.clone()),
            teams,
            notifier,
        }
    }
}

//! SurrealDB implementation of [`UserGroupRepository`].
//!
//! Every audited mutation is a single transaction that opens with a guard
//! statement. The guard re-verifies existence, uniqueness and the
//! last-admin rule against committed state, so a caller that lost a race
//! gets a rejection and no audit entry is written.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use teamgate_core::error::TeamgateResult;
use teamgate_core::models::access::GroupAccessInfo;
use teamgate_core::models::audit::CreateAuditLogEntry;
use teamgate_core::models::group::{
    CreateGroupMember, CreateGroupTeamAccess, CreateUserGroup, GroupMember, GroupTeamAccess,
    GroupTeamAccessWithTeam, UpdateUserGroup, UserGroup, UserGroupFilter,
};
use teamgate_core::repository::{PaginatedResult, Pagination, UserGroupRepository};
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, audit_content, parse_role, parse_uuid, total_of};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserGroupRow {
    record_id: String,
    name: String,
    description: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserGroupRow {
    fn try_into_group(self) -> Result<UserGroup, DbError> {
        Ok(UserGroup {
            id: parse_uuid("user_group", &self.record_id)?,
            name: self.name,
            description: self.description,
            role: parse_role("user_group", &self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct GroupMemberRow {
    record_id: String,
    group_id: String,
    user_id: String,
    is_admin: bool,
    added_by: String,
    added_at: DateTime<Utc>,
}

impl GroupMemberRow {
    fn try_into_member(self) -> Result<GroupMember, DbError> {
        Ok(GroupMember {
            id: parse_uuid("group_member", &self.record_id)?,
            group_id: parse_uuid("group_member", &self.group_id)?,
            user_id: parse_uuid("group_member", &self.user_id)?,
            is_admin: self.is_admin,
            added_by: parse_uuid("group_member", &self.added_by)?,
            added_at: self.added_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct GroupTeamAccessRow {
    record_id: String,
    group_id: String,
    team_id: String,
    role: String,
    assigned_by: String,
    assigned_at: DateTime<Utc>,
}

impl GroupTeamAccessRow {
    fn try_into_access(self) -> Result<GroupTeamAccess, DbError> {
        Ok(GroupTeamAccess {
            id: parse_uuid("group_team_access", &self.record_id)?,
            group_id: parse_uuid("group_team_access", &self.group_id)?,
            team_id: parse_uuid("group_team_access", &self.team_id)?,
            role: parse_role("group_team_access", &self.role)?,
            assigned_by: parse_uuid("group_team_access", &self.assigned_by)?,
            assigned_at: self.assigned_at,
        })
    }
}

/// `(id, name)` projection used to label joins.
#[derive(Debug, SurrealValue)]
struct NameRow {
    record_id: String,
    name: String,
}

const GROUP_MISSING: &str = "array::len((SELECT VALUE id FROM user_group \
     WHERE id = type::record('user_group', $group_id))) = 0";

const MEMBER_MISSING: &str = "array::len((SELECT VALUE id FROM group_member \
     WHERE group_id = $group_id AND user_id = $user_id)) = 0";

/// True when the target member is an admin and no other admin exists.
const LAST_ADMIN: &str = "array::len((SELECT VALUE id FROM group_member \
     WHERE group_id = $group_id AND user_id = $user_id AND is_admin = true)) > 0 \
     AND array::len((SELECT VALUE id FROM group_member \
     WHERE group_id = $group_id AND is_admin = true)) <= 1";

/// SurrealDB implementation of the user group repository.
pub struct SurrealUserGroupRepository<C: Connection> {
    db: Surreal<C>,
}

// `Surreal<C>` is cloneable for every connection; a derive would demand `C: Clone`.
impl<C: Connection> Clone for SurrealUserGroupRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealUserGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count_where(&self, sql: &'static str, group_id: Uuid) -> TeamgateResult<u64> {
        let mut result = self
            .db
            .query(sql)
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(total_of(&rows))
    }

    async fn select_groups(
        &self,
        sql: &'static str,
        bind: (&'static str, String),
    ) -> TeamgateResult<Vec<UserGroup>> {
        let mut result = self.db.query(sql).bind(bind).await.map_err(DbError::from)?;
        let rows: Vec<UserGroupRow> = result.take(0).map_err(DbError::from)?;
        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(groups)
    }
}

impl<C: Connection> UserGroupRepository for SurrealUserGroupRepository<C> {
    async fn create(
        &self,
        input: CreateUserGroup,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<UserGroup> {
        let id = Uuid::new_v4();
        let audit = audit.group(id).target(id);

        let errors = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 IF array::len((SELECT VALUE id FROM user_group WHERE name = $name)) > 0 { \
                     THROW 'teamgate:conflict:user_group'; \
                 }; \
                 CREATE type::record('user_group', $group_id) SET \
                     name = $name, description = $description, role = $role; \
                 CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
                 COMMIT TRANSACTION;",
            )
            .bind(("group_id", id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("role", input.role.as_str()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "user_group")?;

        debug!(group_id = %id, "user_group created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> TeamgateResult<UserGroup> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user_group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_group".into(),
            id: id_str,
        })?;
        Ok(row.try_into_group()?)
    }

    async fn find_by_name(&self, name: &str) -> TeamgateResult<Option<UserGroup>> {
        let mut groups = self
            .select_groups(
                "SELECT meta::id(id) AS record_id, * FROM user_group WHERE name = $name",
                ("name", name.to_string()),
            )
            .await?;
        Ok(groups.pop())
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateUserGroup,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<UserGroup> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        match input.description {
            Some(Some(_)) => sets.push("description = $description"),
            Some(None) => sets.push("description = NONE"),
            None => {}
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        sets.push("updated_at = time::now()");

        let name_guard = if input.name.is_some() {
            " ELSE IF array::len((SELECT VALUE id FROM user_group \
                 WHERE name = $name AND id != type::record('user_group', $group_id))) > 0 { \
                 THROW 'teamgate:conflict:user_group'; \
             }"
        } else {
            ""
        };

        let query = format!(
            "BEGIN TRANSACTION; \
             IF {GROUP_MISSING} {{ \
                 THROW 'teamgate:not_found:user_group:' + $group_id; \
             }}{name_guard}; \
             UPDATE type::record('user_group', $group_id) SET {}; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let audit = audit.group(id);
        let mut builder = self
            .db
            .query(&query)
            .bind(("group_id", id.to_string()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(Some(description)) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str()));
        }

        let errors = builder
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "user_group")?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid, audit: CreateAuditLogEntry) -> TeamgateResult<()> {
        let audit = audit.group(id);
        let query = format!(
            "BEGIN TRANSACTION; \
             IF {GROUP_MISSING} {{ \
                 THROW 'teamgate:not_found:user_group:' + $group_id; \
             }}; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             DELETE group_member WHERE group_id = $group_id; \
             DELETE group_team_access WHERE group_id = $group_id; \
             DELETE type::record('user_group', $group_id); \
             COMMIT TRANSACTION;"
        );

        let errors = self
            .db
            .query(&query)
            .bind(("group_id", id.to_string()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "user_group")?;

        Ok(())
    }

    async fn list(
        &self,
        filter: UserGroupFilter,
        pagination: Pagination,
    ) -> TeamgateResult<PaginatedResult<UserGroup>> {
        let search = filter
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let where_clause = if search.is_some() {
            "WHERE string::contains(string::lowercase(name), $search) \
             OR string::contains(string::lowercase(description ?? ''), $search)"
        } else {
            ""
        };

        let count_query = format!("SELECT count() AS total FROM user_group {where_clause} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        if let Some(search) = &search {
            count_builder = count_builder.bind(("search", search.clone()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user_group {where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut builder = self
            .db
            .query(&list_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(search) = search {
            builder = builder.bind(("search", search));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<UserGroupRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(
        &self,
        input: CreateGroupMember,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<GroupMember> {
        let member_id = Uuid::new_v4();
        let audit = audit.group(input.group_id).target(member_id);

        let query = format!(
            "BEGIN TRANSACTION; \
             IF {GROUP_MISSING} {{ \
                 THROW 'teamgate:not_found:user_group:' + $group_id; \
             }} ELSE IF !({MEMBER_MISSING}) {{ \
                 THROW 'teamgate:conflict:group_member'; \
             }}; \
             CREATE type::record('group_member', $member_id) SET \
                 group_id = $group_id, user_id = $user_id, \
                 is_admin = $is_admin, added_by = $added_by; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             COMMIT TRANSACTION;"
        );

        let errors = self
            .db
            .query(&query)
            .bind(("member_id", member_id.to_string()))
            .bind(("group_id", input.group_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("is_admin", input.is_admin))
            .bind(("added_by", input.added_by.to_string()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "group_member")?;

        self.find_member(input.group_id, input.user_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group_member".into(),
                id: member_id.to_string(),
            })
            .map_err(Into::into)
    }

    async fn set_member_admin(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
        protect_last_admin: bool,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<GroupMember> {
        let audit = audit.group(group_id);
        let query = format!(
            "BEGIN TRANSACTION; \
             IF {MEMBER_MISSING} {{ \
                 THROW 'teamgate:not_found:group_member:' + $user_id; \
             }} ELSE IF $protect AND $is_admin = false AND {LAST_ADMIN} {{ \
                 THROW 'teamgate:last_admin:' + $group_id; \
             }}; \
             UPDATE group_member SET is_admin = $is_admin \
                 WHERE group_id = $group_id AND user_id = $user_id; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             COMMIT TRANSACTION;"
        );

        let errors = self
            .db
            .query(&query)
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("is_admin", is_admin))
            .bind(("protect", protect_last_admin))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "group_member")?;

        self.find_member(group_id, user_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group_member".into(),
                id: user_id.to_string(),
            })
            .map_err(Into::into)
    }

    async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        protect_last_admin: bool,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<()> {
        let audit = audit.group(group_id);
        let query = format!(
            "BEGIN TRANSACTION; \
             IF {MEMBER_MISSING} {{ \
                 THROW 'teamgate:not_found:group_member:' + $user_id; \
             }} ELSE IF $protect AND {LAST_ADMIN} {{ \
                 THROW 'teamgate:last_admin:' + $group_id; \
             }}; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             DELETE group_member WHERE group_id = $group_id AND user_id = $user_id; \
             COMMIT TRANSACTION;"
        );

        let errors = self
            .db
            .query(&query)
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("protect", protect_last_admin))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "group_member")?;

        Ok(())
    }

    async fn find_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> TeamgateResult<Option<GroupMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 WHERE group_id = $group_id AND user_id = $user_id",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupMemberRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_member())
            .transpose()?)
    }

    async fn count_members(&self, group_id: Uuid) -> TeamgateResult<u64> {
        self.count_where(
            "SELECT count() AS total FROM group_member \
             WHERE group_id = $group_id GROUP ALL",
            group_id,
        )
        .await
    }

    async fn count_admins(&self, group_id: Uuid) -> TeamgateResult<u64> {
        self.count_where(
            "SELECT count() AS total FROM group_member \
             WHERE group_id = $group_id AND is_admin = true GROUP ALL",
            group_id,
        )
        .await
    }

    async fn list_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> TeamgateResult<PaginatedResult<GroupMember>> {
        let total = self.count_members(group_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 WHERE group_id = $group_id \
                 ORDER BY added_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupMemberRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_user_groups(&self, user_id: Uuid) -> TeamgateResult<Vec<UserGroup>> {
        self.select_groups(
            "SELECT meta::id(id) AS record_id, * FROM user_group \
             WHERE meta::id(id) IN (\
                 SELECT VALUE group_id FROM group_member WHERE user_id = $user_id\
             ) \
             ORDER BY name ASC",
            ("user_id", user_id.to_string()),
        )
        .await
    }

    async fn assign_team(
        &self,
        input: CreateGroupTeamAccess,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<GroupTeamAccess> {
        let access_id = Uuid::new_v4();
        let audit = audit.group(input.group_id).target(access_id);

        let query = format!(
            "BEGIN TRANSACTION; \
             IF {GROUP_MISSING} {{ \
                 THROW 'teamgate:not_found:user_group:' + $group_id; \
             }} ELSE IF array::len((SELECT VALUE id FROM team \
                 WHERE id = type::record('team', $team_id))) = 0 {{ \
                 THROW 'teamgate:not_found:team:' + $team_id; \
             }} ELSE IF array::len((SELECT VALUE id FROM group_team_access \
                 WHERE group_id = $group_id AND team_id = $team_id)) > 0 {{ \
                 THROW 'teamgate:conflict:group_team_access'; \
             }}; \
             CREATE type::record('group_team_access', $access_id) SET \
                 group_id = $group_id, team_id = $team_id, \
                 role = $role, assigned_by = $assigned_by; \
             CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
             COMMIT TRANSACTION;"
        );

        let errors = self
            .db
            .query(&query)
            .bind(("access_id", access_id.to_string()))
            .bind(("group_id", input.group_id.to_string()))
            .bind(("team_id", input.team_id.to_string()))
            .bind(("role", input.role.as_str()))
            .bind(("assigned_by", input.assigned_by.to_string()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "group_team_access")?;

        self.find_team_access(input.group_id, input.team_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group_team_access".into(),
                id: access_id.to_string(),
            })
            .map_err(Into::into)
    }

    async fn revoke_team(
        &self,
        group_id: Uuid,
        team_id: Uuid,
        audit: CreateAuditLogEntry,
    ) -> TeamgateResult<()> {
        let audit = audit.group(group_id);

        let errors = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 IF array::len((SELECT VALUE id FROM group_team_access \
                     WHERE group_id = $group_id AND team_id = $team_id)) = 0 { \
                     THROW 'teamgate:not_found:group_team_access:' + $team_id; \
                 }; \
                 CREATE type::record('audit_log', $audit_id) CONTENT $audit; \
                 DELETE group_team_access WHERE group_id = $group_id AND team_id = $team_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("team_id", team_id.to_string()))
            .bind(("audit_id", Uuid::new_v4().to_string()))
            .bind(("audit", audit_content(&audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "group_team_access")?;

        Ok(())
    }

    async fn find_team_access(
        &self,
        group_id: Uuid,
        team_id: Uuid,
    ) -> TeamgateResult<Option<GroupTeamAccess>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_team_access \
                 WHERE group_id = $group_id AND team_id = $team_id",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupTeamAccessRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_access())
            .transpose()?)
    }

    async fn count_team_access(&self, group_id: Uuid) -> TeamgateResult<u64> {
        self.count_where(
            "SELECT count() AS total FROM group_team_access \
             WHERE group_id = $group_id GROUP ALL",
            group_id,
        )
        .await
    }

    async fn list_team_access(&self, group_id: Uuid) -> TeamgateResult<Vec<GroupTeamAccessWithTeam>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_team_access \
                 WHERE group_id = $group_id \
                 ORDER BY assigned_at DESC; \
                 SELECT meta::id(id) AS record_id, name FROM team \
                 WHERE meta::id(id) IN (\
                     SELECT VALUE team_id FROM group_team_access WHERE group_id = $group_id\
                 );",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupTeamAccessRow> = result.take(0).map_err(DbError::from)?;
        let names: Vec<NameRow> = result.take(1).map_err(DbError::from)?;
        let names: HashMap<String, String> =
            names.into_iter().map(|n| (n.record_id, n.name)).collect();

        rows.into_iter()
            .map(|row| {
                let team_name = names.get(&row.team_id).cloned().unwrap_or_default();
                Ok(GroupTeamAccessWithTeam {
                    access: row.try_into_access()?,
                    team_name,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn get_team_groups(&self, team_id: Uuid) -> TeamgateResult<Vec<UserGroup>> {
        self.select_groups(
            "SELECT meta::id(id) AS record_id, * FROM user_group \
             WHERE meta::id(id) IN (\
                 SELECT VALUE group_id FROM group_team_access WHERE team_id = $team_id\
             ) \
             ORDER BY name ASC",
            ("team_id", team_id.to_string()),
        )
        .await
    }

    async fn get_user_team_grants(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> TeamgateResult<Vec<GroupAccessInfo>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_team_access \
                 WHERE team_id = $team_id AND group_id IN (\
                     SELECT VALUE group_id FROM group_member WHERE user_id = $user_id\
                 ) \
                 ORDER BY assigned_at ASC; \
                 SELECT meta::id(id) AS record_id, name FROM user_group \
                 WHERE meta::id(id) IN (\
                     SELECT VALUE group_id FROM group_member WHERE user_id = $user_id\
                 );",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupTeamAccessRow> = result.take(0).map_err(DbError::from)?;
        let names: Vec<NameRow> = result.take(1).map_err(DbError::from)?;
        let names: HashMap<String, String> =
            names.into_iter().map(|n| (n.record_id, n.name)).collect();

        rows.into_iter()
            .map(|row| {
                let group_name = names.get(&row.group_id).cloned().unwrap_or_default();
                let access = row.try_into_access()?;
                Ok(GroupAccessInfo {
                    group_id: access.group_id,
                    group_name,
                    role: access.role,
                    assigned_at: access.assigned_at,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}

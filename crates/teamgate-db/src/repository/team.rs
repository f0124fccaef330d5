//! SurrealDB implementation of [`TeamRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use teamgate_core::error::TeamgateResult;
use teamgate_core::models::audit::CreateAuditLogEntry;
use teamgate_core::models::role::TeamRole;
use teamgate_core::models::team::{CreateTeam, CreateTeamMember, Team, TeamMember};
use teamgate_core::repository::{PaginatedResult, Pagination, TeamRepository};
use uuid::Uuid;

use super::{CountRow, audit_content, parse_role, parse_uuid, total_of};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TeamRow {
    record_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn try_into_team(self) -> Result<Team, DbError> {
        Ok(Team {
            id: parse_uuid("team", &self.record_id)?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TeamMemberRow {
    record_id: String,
    team_id: String,
    user_id: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamMemberRow {
    fn try_into_member(self) -> Result<TeamMember, DbError> {
        Ok(TeamMember {
            id: parse_uuid("team_member", &self.record_id)?,
            team_id: parse_uuid("team_member", &self.team_id)?,
            user_id: parse_uuid("team_member", &self.user_id)?,
            role: parse_role("team_member", &self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Team repository.
pub struct SurrealTeamRepository<C: Connection> {
    db: Surreal<C>,
}

// `Surreal<C>` is cloneable for every connection; a derive would demand `C: Clone`.
impl<C: Connection> Clone for SurrealTeamRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealTeamRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamRepository for SurrealTeamRepository<C> {
    async fn create(&self, input: CreateTeam) -> TeamgateResult<Team> {
        let id_str = Uuid::new_v4().to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('team', $id) SET name = $name; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('team', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        DbError::check_transaction(result.take_errors(), "team")?;

        let rows: Vec<TeamRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "team".into(),
            id: id_str,
        })?;
        Ok(row.try_into_team()?)
    }

    async fn get_by_id(&self, id: Uuid) -> TeamgateResult<Team> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('team', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "team".into(),
            id: id_str,
        })?;
        Ok(row.try_into_team()?)
    }

    async fn delete(&self, id: Uuid, revoke_audit: CreateAuditLogEntry) -> TeamgateResult<()> {
        let errors = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 IF array::len((SELECT VALUE id FROM team \
                     WHERE id = type::record('team', $id))) = 0 { \
                     THROW 'teamgate:not_found:team:' + $id; \
                 }; \
                 FOR $grant IN (SELECT meta::id(id) AS access_id, group_id \
                     FROM group_team_access WHERE team_id = $id) { \
                     CREATE type::record('audit_log', <string> rand::uuid::v4()) SET \
                         group_id = $grant.group_id, \
                         action = 'TEAM_ACCESS_REVOKED', \
                         target_type = 'team_access', \
                         target_id = $grant.access_id, \
                         details = $audit.details, \
                         performed_by = $audit.performed_by, \
                         ip_address = $audit.ip_address, \
                         user_agent = $audit.user_agent; \
                 }; \
                 DELETE team_member WHERE team_id = $id; \
                 DELETE group_team_access WHERE team_id = $id; \
                 DELETE type::record('team', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("audit", audit_content(&revoke_audit)))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "team")?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> TeamgateResult<PaginatedResult<Team>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM team GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_team())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(&self, input: CreateTeamMember) -> TeamgateResult<TeamMember> {
        let id = Uuid::new_v4();

        let errors = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 IF array::len((SELECT VALUE id FROM team \
                     WHERE id = type::record('team', $team_id))) = 0 { \
                     THROW 'teamgate:not_found:team:' + $team_id; \
                 } ELSE IF array::len((SELECT VALUE id FROM team_member \
                     WHERE team_id = $team_id AND user_id = $user_id)) > 0 { \
                     THROW 'teamgate:conflict:team_member'; \
                 }; \
                 CREATE type::record('team_member', $id) SET \
                     team_id = $team_id, user_id = $user_id, role = $role; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("team_id", input.team_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("role", input.role.as_str()))
            .await
            .map_err(DbError::from)?
            .take_errors();
        DbError::check_transaction(errors, "team_member")?;

        self.find_member(input.team_id, input.user_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "team_member".into(),
                id: id.to_string(),
            })
            .map_err(Into::into)
    }

    async fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> TeamgateResult<TeamMember> {
        let mut result = self
            .db
            .query(
                "UPDATE team_member SET role = $role, updated_at = time::now() \
                 WHERE team_id = $team_id AND user_id = $user_id; \
                 SELECT meta::id(id) AS record_id, * FROM team_member \
                 WHERE team_id = $team_id AND user_id = $user_id;",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamMemberRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "team_member".into(),
            id: format!("{team_id}/{user_id}"),
        })?;
        Ok(row.try_into_member()?)
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> TeamgateResult<()> {
        let mut result = self
            .db
            .query(
                "DELETE team_member WHERE team_id = $team_id AND user_id = $user_id \
                 RETURN BEFORE",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let deleted: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: "team_member".into(),
                id: format!("{team_id}/{user_id}"),
            }
            .into());
        }
        Ok(())
    }

    async fn find_member(&self, team_id: Uuid, user_id: Uuid) -> TeamgateResult<Option<TeamMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team_member \
                 WHERE team_id = $team_id AND user_id = $user_id",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamMemberRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_member())
            .transpose()?)
    }

    async fn list_members(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> TeamgateResult<PaginatedResult<TeamMember>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM team_member \
                 WHERE team_id = $team_id GROUP ALL",
            )
            .bind(("team_id", team_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team_member \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamMemberRow> = result.take(0).map_err(DbError::from)?;
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
}

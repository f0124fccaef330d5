//! Integration tests for the Team repository using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use teamgate_core::error::TeamgateError;
use teamgate_core::models::actor::Actor;
use teamgate_core::models::audit::{AuditAction, AuditTargetType, CreateAuditLogEntry};
use teamgate_core::models::role::TeamRole;
use teamgate_core::models::team::{CreateTeam, CreateTeamMember};
use teamgate_core::repository::{Pagination, TeamRepository};
use teamgate_db::repository::SurrealTeamRepository;
use uuid::Uuid;

fn revoke_entry() -> CreateAuditLogEntry {
    CreateAuditLogEntry::by(
        &Actor::new(Uuid::new_v4()),
        AuditAction::TeamAccessRevoked,
        AuditTargetType::TeamAccess,
    )
}

async fn setup() -> SurrealTeamRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    teamgate_db::run_migrations(&db).await.unwrap();
    SurrealTeamRepository::new(db)
}

#[tokio::test]
async fn create_and_get_team() {
    let repo = setup().await;

    let team = repo.create(CreateTeam { name: "T1".into() }).await.unwrap();
    assert_eq!(team.name, "T1");

    let fetched = repo.get_by_id(team.id).await.unwrap();
    assert_eq!(fetched.id, team.id);
    assert_eq!(fetched.name, "T1");
}

#[tokio::test]
async fn get_missing_team_is_not_found() {
    let repo = setup().await;
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
}

#[tokio::test]
async fn list_teams_paginates() {
    let repo = setup().await;
    for name in ["a", "b", "c"] {
        repo.create(CreateTeam { name: name.into() }).await.unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn direct_member_lifecycle() {
    let repo = setup().await;
    let team = repo.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let user = Uuid::new_v4();

    let member = repo
        .add_member(CreateTeamMember {
            team_id: team.id,
            user_id: user,
            role: TeamRole::Viewer,
        })
        .await
        .unwrap();
    assert_eq!(member.role, TeamRole::Viewer);
    assert_eq!(member.team_id, team.id);

    let updated = repo
        .update_member_role(team.id, user, TeamRole::Owner)
        .await
        .unwrap();
    assert_eq!(updated.role, TeamRole::Owner);
    assert_eq!(updated.id, member.id);

    let found = repo.find_member(team.id, user).await.unwrap().unwrap();
    assert_eq!(found.role, TeamRole::Owner);

    let page = repo
        .list_members(team.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    repo.remove_member(team.id, user).await.unwrap();
    assert!(repo.find_member(team.id, user).await.unwrap().is_none());

    let err = repo.remove_member(team.id, user).await.unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_direct_member_is_rejected() {
    let repo = setup().await;
    let team = repo.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let user = Uuid::new_v4();
    let input = CreateTeamMember {
        team_id: team.id,
        user_id: user,
        role: TeamRole::Editor,
    };

    repo.add_member(input.clone()).await.unwrap();
    let err = repo.add_member(input).await.unwrap_err();
    assert!(matches!(err, TeamgateError::AlreadyExists { .. }));
}

#[tokio::test]
async fn adding_member_to_missing_team_is_not_found() {
    let repo = setup().await;
    let err = repo
        .add_member(CreateTeamMember {
            team_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: TeamRole::Viewer,
        })
        .await
        .unwrap_err();
    match err {
        TeamgateError::NotFound { entity, .. } => assert_eq!(entity, "team"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_role_of_non_member_is_not_found() {
    let repo = setup().await;
    let team = repo.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let err = repo
        .update_member_role(team.id, Uuid::new_v4(), TeamRole::Editor)
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
}

#[tokio::test]
async fn deleting_team_cascades_direct_members() {
    let repo = setup().await;
    let team = repo.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let user = Uuid::new_v4();
    repo.add_member(CreateTeamMember {
        team_id: team.id,
        user_id: user,
        role: TeamRole::Viewer,
    })
    .await
    .unwrap();

    repo.delete(team.id, revoke_entry()).await.unwrap();

    assert!(repo.find_member(team.id, user).await.unwrap().is_none());
    let err = repo.delete(team.id, revoke_entry()).await.unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
}

//! Integration tests for the user group repository using in-memory SurrealDB.

use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use teamgate_core::error::TeamgateError;
use teamgate_core::models::actor::Actor;
use teamgate_core::models::audit::{
    AuditAction, AuditLogFilter, AuditTargetType, CreateAuditLogEntry,
};
use teamgate_core::models::group::{
    CreateGroupMember, CreateGroupTeamAccess, CreateUserGroup, UpdateUserGroup, UserGroupFilter,
};
use teamgate_core::models::role::TeamRole;
use teamgate_core::models::team::{CreateTeam, CreateTeamMember};
use teamgate_core::repository::{
    AuditLogRepository, Pagination, TeamRepository, UserGroupRepository,
};
use teamgate_db::repository::{
    SurrealAuditLogRepository, SurrealTeamRepository, SurrealUserGroupRepository,
};
use uuid::Uuid;

struct Fixture {
    groups: SurrealUserGroupRepository<Db>,
    teams: SurrealTeamRepository<Db>,
    audit: SurrealAuditLogRepository<Db>,
    actor: Actor,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    teamgate_db::run_migrations(&db).await.unwrap();

    Fixture {
        groups: SurrealUserGroupRepository::new(db.clone()),
        teams: SurrealTeamRepository::new(db.clone()),
        audit: SurrealAuditLogRepository::new(db),
        actor: Actor::new(Uuid::new_v4()),
    }
}

impl Fixture {
    fn entry(&self, action: AuditAction, target: AuditTargetType) -> CreateAuditLogEntry {
        CreateAuditLogEntry::by(&self.actor, action, target)
    }

    async fn create_group(&self, name: &str, role: TeamRole) -> Uuid {
        self.groups
            .create(
                CreateUserGroup {
                    name: name.into(),
                    description: None,
                    role,
                },
                self.entry(AuditAction::GroupCreated, AuditTargetType::Group),
            )
            .await
            .unwrap()
            .id
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) {
        self.groups
            .add_member(
                CreateGroupMember {
                    group_id,
                    user_id,
                    is_admin,
                    added_by: self.actor.id,
                },
                self.entry(AuditAction::MemberAdded, AuditTargetType::Member),
            )
            .await
            .unwrap();
    }

    async fn audit_count(&self, action: AuditAction) -> u64 {
        self.audit
            .list(
                AuditLogFilter {
                    action: Some(action),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap()
            .total
    }
}

#[tokio::test]
async fn create_writes_group_and_audit_together() {
    let f = setup().await;

    let group = f
        .groups
        .create(
            CreateUserGroup {
                name: "QA".into(),
                description: Some("Quality".into()),
                role: TeamRole::Editor,
            },
            f.entry(AuditAction::GroupCreated, AuditTargetType::Group)
                .details(json!({ "name": "QA" })),
        )
        .await
        .unwrap();

    assert_eq!(group.name, "QA");
    assert_eq!(group.description.as_deref(), Some("Quality"));
    assert_eq!(group.role, TeamRole::Editor);

    let entries = f
        .audit
        .list(
            AuditLogFilter {
                group_id: Some(group.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(entries.total, 1);
    let entry = &entries.items[0];
    assert_eq!(entry.action, AuditAction::GroupCreated);
    assert_eq!(entry.target_id, Some(group.id));
    assert_eq!(entry.performed_by, f.actor.id);
    assert_eq!(entry.details["name"], "QA");
}

#[tokio::test]
async fn duplicate_name_rolls_back_audit() {
    let f = setup().await;
    f.create_group("QA", TeamRole::Editor).await;

    let err = f
        .groups
        .create(
            CreateUserGroup {
                name: "QA".into(),
                description: None,
                role: TeamRole::Viewer,
            },
            f.entry(AuditAction::GroupCreated, AuditTargetType::Group),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TeamgateError::AlreadyExists { .. }));
    assert_eq!(f.audit_count(AuditAction::GroupCreated).await, 1);
}

#[tokio::test]
async fn update_changes_only_given_fields() {
    let f = setup().await;
    let id = f.create_group("QA", TeamRole::Editor).await;

    let updated = f
        .groups
        .update(
            id,
            UpdateUserGroup {
                description: Some(Some("Testers".into())),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "QA");
    assert_eq!(updated.description.as_deref(), Some("Testers"));
    assert_eq!(updated.role, TeamRole::Editor);
    assert_eq!(f.audit_count(AuditAction::GroupUpdated).await, 1);
}

#[tokio::test]
async fn update_can_clear_description() {
    let f = setup().await;
    let id = f
        .groups
        .create(
            CreateUserGroup {
                name: "QA".into(),
                description: Some("Testers".into()),
                role: TeamRole::Editor,
            },
            f.entry(AuditAction::GroupCreated, AuditTargetType::Group),
        )
        .await
        .unwrap()
        .id;

    let renamed = f
        .groups
        .update(
            id,
            UpdateUserGroup {
                name: Some("Quality".into()),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap();
    assert_eq!(renamed.description.as_deref(), Some("Testers"));

    let cleared = f
        .groups
        .update(
            id,
            UpdateUserGroup {
                description: Some(None),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap();
    assert_eq!(cleared.name, "Quality");
    assert_eq!(cleared.description, None);
    assert_eq!(f.groups.get_by_id(id).await.unwrap().description, None);
}

#[tokio::test]
async fn update_to_taken_name_is_conflict() {
    let f = setup().await;
    f.create_group("QA", TeamRole::Editor).await;
    let ops = f.create_group("Ops", TeamRole::Viewer).await;

    let err = f
        .groups
        .update(
            ops,
            UpdateUserGroup {
                name: Some("QA".into()),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::AlreadyExists { .. }));
    assert_eq!(f.audit_count(AuditAction::GroupUpdated).await, 0);

    // Keeping its own name is not a conflict.
    f.groups
        .update(
            ops,
            UpdateUserGroup {
                name: Some("Ops".into()),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn update_missing_group_is_not_found() {
    let f = setup().await;
    let err = f
        .groups
        .update(
            Uuid::new_v4(),
            UpdateUserGroup {
                role: Some(TeamRole::Owner),
                ..Default::default()
            },
            f.entry(AuditAction::GroupUpdated, AuditTargetType::Group),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
    assert_eq!(f.audit_count(AuditAction::GroupUpdated).await, 0);
}

#[tokio::test]
async fn list_searches_name_and_description_case_insensitively() {
    let f = setup().await;
    f.create_group("QA", TeamRole::Editor).await;
    f.groups
        .create(
            CreateUserGroup {
                name: "Platform".into(),
                description: Some("Runs the qa cluster".into()),
                role: TeamRole::Viewer,
            },
            f.entry(AuditAction::GroupCreated, AuditTargetType::Group),
        )
        .await
        .unwrap();
    f.create_group("Design", TeamRole::Viewer).await;

    let all = f
        .groups
        .list(UserGroupFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    // Newest first.
    assert_eq!(all.items[0].name, "Design");

    let hits = f
        .groups
        .list(
            UserGroupFilter {
                search: Some("Qa".into()),
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(hits.total, 2);
    let mut names: Vec<_> = hits.items.iter().map(|g| g.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Platform", "QA"]);
}

#[tokio::test]
async fn duplicate_member_is_conflict() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let user = Uuid::new_v4();
    f.add_member(group, user, false).await;

    let err = f
        .groups
        .add_member(
            CreateGroupMember {
                group_id: group,
                user_id: user,
                is_admin: true,
                added_by: f.actor.id,
            },
            f.entry(AuditAction::MemberAdded, AuditTargetType::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::AlreadyExists { .. }));
    assert_eq!(f.groups.count_members(group).await.unwrap(), 1);
    assert_eq!(f.audit_count(AuditAction::MemberAdded).await, 1);
}

#[tokio::test]
async fn member_in_missing_group_is_not_found() {
    let f = setup().await;
    let err = f
        .groups
        .add_member(
            CreateGroupMember {
                group_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                is_admin: false,
                added_by: f.actor.id,
            },
            f.entry(AuditAction::MemberAdded, AuditTargetType::Member),
        )
        .await
        .unwrap_err();
    match err {
        TeamgateError::NotFound { entity, .. } => assert_eq!(entity, "user_group"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn store_refuses_to_remove_last_admin_when_protected() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    f.add_member(group, alice, true).await;
    f.add_member(group, bob, false).await;

    let err = f
        .groups
        .remove_member(
            group,
            alice,
            true,
            f.entry(AuditAction::MemberRemoved, AuditTargetType::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::Forbidden { .. }));
    assert_eq!(f.groups.count_admins(group).await.unwrap(), 1);
    assert_eq!(f.audit_count(AuditAction::MemberRemoved).await, 0);

    // Non-admins are never protected.
    f.groups
        .remove_member(
            group,
            bob,
            true,
            f.entry(AuditAction::MemberRemoved, AuditTargetType::Member),
        )
        .await
        .unwrap();

    // Unprotected removal drops the last admin.
    f.groups
        .remove_member(
            group,
            alice,
            false,
            f.entry(AuditAction::MemberRemoved, AuditTargetType::Member),
        )
        .await
        .unwrap();
    assert_eq!(f.groups.count_members(group).await.unwrap(), 0);
    assert_eq!(f.audit_count(AuditAction::MemberRemoved).await, 2);
}

#[tokio::test]
async fn removing_unknown_member_is_not_found() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let err = f
        .groups
        .remove_member(
            group,
            Uuid::new_v4(),
            true,
            f.entry(AuditAction::MemberRemoved, AuditTargetType::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
}

#[tokio::test]
async fn admin_flag_respects_last_admin_guard() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    f.add_member(group, alice, true).await;
    f.add_member(group, bob, false).await;

    let err = f
        .groups
        .set_member_admin(
            group,
            alice,
            false,
            true,
            f.entry(AuditAction::MemberAdminRevoked, AuditTargetType::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::Forbidden { .. }));

    let promoted = f
        .groups
        .set_member_admin(
            group,
            bob,
            true,
            true,
            f.entry(AuditAction::MemberAdminGranted, AuditTargetType::Member),
        )
        .await
        .unwrap();
    assert!(promoted.is_admin);
    assert_eq!(f.groups.count_admins(group).await.unwrap(), 2);

    let demoted = f
        .groups
        .set_member_admin(
            group,
            alice,
            false,
            true,
            f.entry(AuditAction::MemberAdminRevoked, AuditTargetType::Member),
        )
        .await
        .unwrap();
    assert!(!demoted.is_admin);
    assert_eq!(f.groups.count_admins(group).await.unwrap(), 1);
}

#[tokio::test]
async fn team_grants_and_lookups() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let team = f.teams.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let bob = Uuid::new_v4();
    f.add_member(group, bob, false).await;

    let access = f
        .groups
        .assign_team(
            CreateGroupTeamAccess {
                group_id: group,
                team_id: team.id,
                role: TeamRole::Editor,
                assigned_by: f.actor.id,
            },
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();
    assert_eq!(access.role, TeamRole::Editor);

    let listed = f.groups.list_team_access(group).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].team_name, "T1");
    assert_eq!(listed[0].access.id, access.id);
    assert_eq!(f.groups.count_team_access(group).await.unwrap(), 1);

    let team_groups = f.groups.get_team_groups(team.id).await.unwrap();
    assert_eq!(team_groups.len(), 1);
    assert_eq!(team_groups[0].id, group);

    let user_groups = f.groups.get_user_groups(bob).await.unwrap();
    assert_eq!(user_groups.len(), 1);

    let grants = f.groups.get_user_team_grants(bob, team.id).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].group_name, "QA");
    assert_eq!(grants[0].role, TeamRole::Editor);

    let outsider = f
        .groups
        .get_user_team_grants(Uuid::new_v4(), team.id)
        .await
        .unwrap();
    assert!(outsider.is_empty());
}

#[tokio::test]
async fn duplicate_grant_is_conflict_and_revoke_is_not_repeatable() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let team = f.teams.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let grant = CreateGroupTeamAccess {
        group_id: group,
        team_id: team.id,
        role: TeamRole::Editor,
        assigned_by: f.actor.id,
    };

    f.groups
        .assign_team(
            grant.clone(),
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();
    let err = f
        .groups
        .assign_team(
            grant,
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::AlreadyExists { .. }));

    f.groups
        .revoke_team(
            group,
            team.id,
            f.entry(AuditAction::TeamAccessRevoked, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();
    let err = f
        .groups
        .revoke_team(
            group,
            team.id,
            f.entry(AuditAction::TeamAccessRevoked, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TeamgateError::NotFound { .. }));
    assert_eq!(f.audit_count(AuditAction::TeamAccessRevoked).await, 1);
}

#[tokio::test]
async fn grant_to_missing_team_is_not_found() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let err = f
        .groups
        .assign_team(
            CreateGroupTeamAccess {
                group_id: group,
                team_id: Uuid::new_v4(),
                role: TeamRole::Editor,
                assigned_by: f.actor.id,
            },
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap_err();
    match err {
        TeamgateError::NotFound { entity, .. } => assert_eq!(entity, "team"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_cascades_and_keeps_audit_trail() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let team = f.teams.create(CreateTeam { name: "T1".into() }).await.unwrap();
    let bob = Uuid::new_v4();
    f.add_member(group, bob, true).await;
    f.groups
        .assign_team(
            CreateGroupTeamAccess {
                group_id: group,
                team_id: team.id,
                role: TeamRole::Editor,
                assigned_by: f.actor.id,
            },
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();

    f.groups
        .delete(
            group,
            f.entry(AuditAction::GroupDeleted, AuditTargetType::Group)
                .target(group)
                .details(json!({ "name": "QA", "memberCount": 1 })),
        )
        .await
        .unwrap();

    assert!(matches!(
        f.groups.get_by_id(group).await.unwrap_err(),
        TeamgateError::NotFound { .. }
    ));
    assert!(f.groups.find_member(group, bob).await.unwrap().is_none());
    assert!(f.groups.find_team_access(group, team.id).await.unwrap().is_none());
    assert!(f.groups.get_user_team_grants(bob, team.id).await.unwrap().is_empty());

    let history = f
        .audit
        .list(
            AuditLogFilter {
                group_id: Some(group),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(history.total, 4);
    assert_eq!(history.items[0].action, AuditAction::GroupDeleted);
    assert_eq!(history.items[0].details["memberCount"], 1);
}

#[tokio::test]
async fn deleting_team_removes_group_grants() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    let team = f.teams.create(CreateTeam { name: "T1".into() }).await.unwrap();
    f.teams
        .add_member(CreateTeamMember {
            team_id: team.id,
            user_id: Uuid::new_v4(),
            role: TeamRole::Owner,
        })
        .await
        .unwrap();
    f.groups
        .assign_team(
            CreateGroupTeamAccess {
                group_id: group,
                team_id: team.id,
                role: TeamRole::Editor,
                assigned_by: f.actor.id,
            },
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();

    let ops = f.create_group("Ops", TeamRole::Viewer).await;
    f.groups
        .assign_team(
            CreateGroupTeamAccess {
                group_id: ops,
                team_id: team.id,
                role: TeamRole::Viewer,
                assigned_by: f.actor.id,
            },
            f.entry(AuditAction::TeamAccessGranted, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();

    f.teams
        .delete(
            team.id,
            f.entry(AuditAction::TeamAccessRevoked, AuditTargetType::TeamAccess)
                .details(json!({ "teamId": team.id, "reason": "team_deleted" })),
        )
        .await
        .unwrap();

    assert_eq!(f.groups.count_team_access(group).await.unwrap(), 0);
    assert_eq!(f.groups.count_team_access(ops).await.unwrap(), 0);

    let revoked = f
        .audit
        .list(
            AuditLogFilter {
                action: Some(AuditAction::TeamAccessRevoked),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(revoked.total, 2);
    let mut groups: Vec<_> = revoked.items.iter().filter_map(|e| e.group_id).collect();
    groups.sort();
    let mut expected = vec![group, ops];
    expected.sort();
    assert_eq!(groups, expected);
    assert!(revoked.items.iter().all(|e| e.target_id.is_some()));
    assert!(revoked.items.iter().all(|e| e.performed_by == f.actor.id));
    assert_eq!(revoked.items[0].details["reason"], "team_deleted");
}

#[tokio::test]
async fn deleting_team_without_grants_writes_no_audit() {
    let f = setup().await;
    let team = f.teams.create(CreateTeam { name: "T1".into() }).await.unwrap();

    f.teams
        .delete(
            team.id,
            f.entry(AuditAction::TeamAccessRevoked, AuditTargetType::TeamAccess),
        )
        .await
        .unwrap();

    assert_eq!(f.audit_count(AuditAction::TeamAccessRevoked).await, 0);
}

#[tokio::test]
async fn audit_entries_from_mutations_are_listable() {
    let f = setup().await;
    let group = f.create_group("QA", TeamRole::Editor).await;
    f.add_member(group, Uuid::new_v4(), true).await;

    let history = f
        .audit
        .list(
            AuditLogFilter {
                group_id: Some(group),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    assert_eq!(history.items.len(), 2);
    assert_ne!(history.items[0].id, history.items[1].id);
}

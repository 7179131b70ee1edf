//! Registration, invite codes and team membership

mod common;

use chrono::Utc;
use common::setup;
use devlog_core::{Error, RegisterInput};
use devlog_db::entities::{notification::NotificationKind, team, user};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

#[tokio::test]
async fn test_manager_registration_creates_team() {
    let app = setup().await;
    let (manager, team) = app.manager("lead@example.com", "Robin Lead").await;

    assert_eq!(team.name, "Robin Lead's Team");
    assert_eq!(team.manager_id, manager.id);
    assert_eq!(manager.team_id, Some(team.id));
    assert!(team.code.starts_with("TEAM-"));
    assert_eq!(team.code.len(), 11);

    let code = app.devlog.teams.get_team_code(&manager).await.unwrap();
    assert_eq!(code, team.code);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = setup().await;
    app.developer("dup@example.com", "First", None).await;

    let registration = RegisterInput {
        email: "DUP@example.com".to_string(),
        password: "password1".to_string(),
        confirm_password: "password1".to_string(),
        full_name: "Second".to_string(),
        role: "developer".to_string(),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let result = app.devlog.users.register(registration).await;
    assert!(matches!(
        result,
        Err(Error::Validation { field: "email", .. })
    ));
}

#[tokio::test]
async fn test_concurrent_duplicate_registration() {
    let app = setup().await;
    let registration = || {
        RegisterInput {
            email: "race@example.com".to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
            full_name: "Racer".to_string(),
            role: "developer".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    };

    let (first, second) = tokio::join!(
        app.devlog.users.register(registration()),
        app.devlog.users.register(registration())
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::Validation { field: "email", .. }))));

    let stored = user::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_bad_code_at_registration_leaves_no_user() {
    let app = setup().await;
    let registration = RegisterInput {
        email: "ghost@example.com".to_string(),
        password: "password1".to_string(),
        confirm_password: "password1".to_string(),
        full_name: "Ghost".to_string(),
        role: "developer".to_string(),
        team_code: Some("TEAM-NOPE00".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let result = app.devlog.users.register(registration).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let users = user::Entity::find().all(&app.db).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_authenticate() {
    let app = setup().await;
    let dev = app.developer("login@example.com", "Lou", None).await;

    let found = app
        .devlog
        .users
        .authenticate(" Login@Example.com ", "password1")
        .await
        .unwrap();
    assert_eq!(found.id, dev.id);

    let wrong_password = app
        .devlog
        .users
        .authenticate("login@example.com", "nope")
        .await
        .unwrap_err();
    let unknown_user = app
        .devlog
        .users
        .authenticate("nobody@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert!(matches!(wrong_password, Error::Unauthenticated(_)));
}

#[tokio::test]
async fn test_resolve_unknown_caller() {
    let app = setup().await;
    let result = app.devlog.users.resolve_caller(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::Unauthenticated(_))));
}

#[tokio::test]
async fn test_code_lookup_ignores_case_and_whitespace() {
    let app = setup().await;
    let (manager, _) = app.manager("m@example.com", "Morgan").await;

    let fixed = team::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Fixed".to_string()),
        code: Set("TEAM-000001".to_string()),
        manager_id: Set(manager.id),
        created_at: Set(Utc::now()),
    }
    .insert(&app.db)
    .await
    .unwrap();

    let first = app.developer("a@example.com", "A", None).await;
    let second = app.developer("b@example.com", "B", None).await;

    let joined_a = app
        .devlog
        .teams
        .join_team_by_code(&first, "team-000001")
        .await
        .unwrap();
    let joined_b = app
        .devlog
        .teams
        .join_team_by_code(&second, " TEAM-000001 ")
        .await
        .unwrap();

    assert_eq!(joined_a.id, fixed.id);
    assert_eq!(joined_b.id, fixed.id);
    assert_eq!(app.refresh(&first).await.team_id, Some(fixed.id));
}

#[tokio::test]
async fn test_join_errors() {
    let app = setup().await;
    let (manager, _) = app.manager("m@example.com", "Morgan").await;
    let (_, other_team) = app.manager("n@example.com", "Nia").await;
    let dev = app.developer("d@example.com", "Dana", None).await;

    assert!(matches!(
        app.devlog.teams.join_team_by_code(&dev, "TEAM-ZZZZZZ").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        app.devlog.teams.join_team_by_code(&dev, "   ").await,
        Err(Error::Validation { field: "code", .. })
    ));
    assert!(matches!(
        app.devlog
            .teams
            .join_team_by_code(&manager, &other_team.code)
            .await,
        Err(Error::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_join_overwrites_previous_team() {
    let app = setup().await;
    let (_, first) = app.manager("m1@example.com", "Morgan").await;
    let (_, second) = app.manager("m2@example.com", "Nia").await;
    let dev = app
        .developer("d@example.com", "Dana", Some(&first.code))
        .await;

    app.devlog
        .teams
        .join_team_by_code(&dev, &second.code)
        .await
        .unwrap();

    let dev = app.refresh(&dev).await;
    assert_eq!(dev.team_id, Some(second.id));
    let first_members = app.devlog.teams.get_team_members(first.id).await.unwrap();
    assert!(first_members.iter().all(|m| m.id != dev.id));
}

#[tokio::test]
async fn test_leave_team() {
    let app = setup().await;
    let (manager, team) = app.manager("m@example.com", "Morgan").await;
    let dev = app
        .developer("d@example.com", "Dana", Some(&team.code))
        .await;

    app.devlog.teams.leave_team(&dev).await.unwrap();
    let dev = app.refresh(&dev).await;
    assert_eq!(dev.team_id, None);

    assert!(matches!(
        app.devlog.teams.leave_team(&dev).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        app.devlog.teams.leave_team(&manager).await,
        Err(Error::Validation { .. })
    ));
}

#[tokio::test]
async fn test_members_and_team_views() {
    let app = setup().await;
    let (manager, team) = app.manager("m@example.com", "Morgan").await;
    let (other_manager, other_team) = app.manager("n@example.com", "Nia").await;
    let dev = app
        .developer("d@example.com", "Dana", Some(&team.code))
        .await;
    let loner = app.developer("l@example.com", "Lee", None).await;

    let members = app.devlog.teams.members_of(&manager, team.id).await.unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.full_name.as_str()).collect();
    assert_eq!(names, vec!["Dana", "Morgan"]);

    assert_eq!(
        app.devlog.teams.own_team_members(&dev).await.unwrap().len(),
        2
    );
    assert!(matches!(
        app.devlog.teams.members_of(&other_manager, team.id).await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        app.devlog.teams.members_of(&dev, team.id).await,
        Err(Error::Forbidden(_))
    ));

    assert_eq!(
        app.devlog.teams.get_own_team(&dev).await.unwrap().id,
        team.id
    );
    assert!(matches!(
        app.devlog.teams.get_own_team(&loner).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        app.devlog.teams.get_team_code(&dev).await,
        Err(Error::Forbidden(_))
    ));

    let available = app.devlog.teams.list_available_teams().await.unwrap();
    let ids: Vec<Uuid> = available.iter().map(|t| t.id).collect();
    assert!(ids.contains(&team.id));
    assert!(ids.contains(&other_team.id));
}

#[tokio::test]
async fn test_remove_member() {
    let app = setup().await;
    let (manager, team) = app.manager("m@example.com", "Morgan").await;
    let (_, other_team) = app.manager("n@example.com", "Nia").await;
    let dev = app
        .developer("d@example.com", "Dana", Some(&team.code))
        .await;
    let stranger = app
        .developer("s@example.com", "Sam", Some(&other_team.code))
        .await;

    assert!(matches!(
        app.devlog.teams.remove_member(&manager, manager.id).await,
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        app.devlog.teams.remove_member(&manager, stranger.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        app.devlog.teams.remove_member(&dev, manager.id).await,
        Err(Error::Forbidden(_))
    ));

    let removed = app.devlog.teams.remove_member(&manager, dev.id).await.unwrap();
    assert_eq!(removed.team_id, None);

    // Account survives removal
    let still_there = user::Entity::find_by_id(dev.id).one(&app.db).await.unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn test_remind_member() {
    let app = setup().await;
    let (manager, team) = app.manager("m@example.com", "Morgan").await;
    let dev = app
        .developer("d@example.com", "Dana", Some(&team.code))
        .await;
    let loner = app.developer("l@example.com", "Lee", None).await;

    let sent = app
        .devlog
        .teams
        .remind_member(&manager, dev.id)
        .await
        .unwrap();
    assert_eq!(sent.user_id, dev.id);
    assert_eq!(sent.kind, NotificationKind::LogReminder);
    assert_eq!(app.mailer.sent().len(), 1);

    assert!(matches!(
        app.devlog.teams.remind_member(&manager, loner.id).await,
        Err(Error::NotFound(_))
    ));
}

//! Integration tests for the HTTP API

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use devlog_api::{models::*, ApiServer, ApiServerConfig};
use devlog_core::{DevLog, DisabledMailer};
use devlog_db::sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const CRON_SECRET: &str = "cron-test-secret";

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = devlog_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    devlog_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    db
}

/// Helper to create a test router
fn create_test_app(db: DatabaseConnection, cron_secret: Option<&str>) -> Router {
    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        jwt_secret: "test-secret".to_string(),
        cron_secret: cron_secret.map(str::to_string),
        ..Default::default()
    };

    let devlog = DevLog::new(db, Arc::new(DisabledMailer), "http://localhost:3000");
    ApiServer::new(config, devlog).build_router()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, headers, value)
}

async fn register(app: &Router, body: Value) -> AuthResponse {
    let (status, _, value) = send(app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", value);
    serde_json::from_value(value).unwrap()
}

async fn register_manager(app: &Router, email: &str, name: &str) -> AuthResponse {
    register(
        app,
        json!({
            "email": email,
            "password": "password1",
            "confirm_password": "password1",
            "full_name": name,
            "role": "manager",
            "team_name": format!("{} Squad", name)
        }),
    )
    .await
}

async fn register_developer(app: &Router, email: &str, name: &str, code: &str) -> AuthResponse {
    register(
        app,
        json!({
            "email": email,
            "password": "password1",
            "confirm_password": "password1",
            "full_name": name,
            "role": "developer",
            "team_code": code
        }),
    )
    .await
}

fn log_body(date: &str) -> Value {
    json!({
        "date": date,
        "tasks": "Shipped the reports page",
        "hours": 7,
        "minutes": 45,
        "mood": 4,
        "blockers": "Waiting on design, Flaky CI"
    })
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = create_test_app(create_test_db().await, None);

    let (status, _, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = send(&app, "GET", "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/daily-logs"].is_object());
}

#[tokio::test]
async fn test_registration_sets_session_cookie() {
    let app = create_test_app(create_test_db().await, None);

    let request = Request::builder()
        .uri("/api/auth/register")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "lead@example.com",
                "password": "password1",
                "confirm_password": "password1",
                "full_name": "Robin",
                "role": "manager"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let auth: AuthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(auth.user.role, UserRole::Manager);
    assert_eq!(
        auth.team.as_ref().map(|t| t.name.as_str()),
        Some("Robin's Team")
    );

    // The cookie alone authenticates
    let token_pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header("Cookie", token_pair)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_registration_validation_errors() {
    let app = create_test_app(create_test_db().await, None);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "dev@example.com",
            "password": "password1",
            "confirm_password": "password2",
            "full_name": "Dana",
            "role": "developer"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
    assert_eq!(error.field.as_deref(), Some("confirm_password"));

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "dev@example.com",
            "password": "password1",
            "confirm_password": "password1",
            "full_name": "Dana",
            "role": "developer",
            "team_code": "TEAM-NOPE00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = create_test_app(create_test_db().await, None);
    register_manager(&app, "m@example.com", "Morgan").await;

    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "M@example.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::SET_COOKIE).is_some());
    let auth: AuthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(auth.user.email, "m@example.com");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "m@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, headers, _) = send(&app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = create_test_app(create_test_db().await, None);

    for uri in ["/api/daily-logs", "/api/team-logs", "/api/notifications", "/api/auth/me"] {
        let (status, _, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["code"], "MISSING_AUTH");
    }
}

#[tokio::test]
async fn test_log_review_flow_over_http() {
    let app = create_test_app(create_test_db().await, None);
    let manager = register_manager(&app, "m@example.com", "Morgan").await;
    let code = manager.team.as_ref().unwrap().code.to_lowercase();
    let dev = register_developer(&app, "d@example.com", "Dana", &code).await;
    assert_eq!(dev.user.team_id, manager.user.team_id);

    // Submit
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/daily-logs",
        Some(&dev.token),
        Some(log_body("2024-01-10")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let log: DailyLog = serde_json::from_value(body).unwrap();
    assert_eq!(log.review_status, ReviewStatus::Pending);

    // Manager sees it and was notified
    let (_, _, body) = send(&app, "GET", "/api/team-logs", Some(&manager.token), None).await;
    let team_logs: TeamLogList = serde_json::from_value(body).unwrap();
    assert_eq!(team_logs.total, 1);
    assert_eq!(team_logs.logs[0].author.full_name, "Dana");

    let (_, _, body) = send(
        &app,
        "GET",
        "/api/notifications/unread-count",
        Some(&manager.token),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);

    // Developer cannot review
    let review_uri = format!("/api/daily-logs/{}/review", log.id);
    let (status, _, _) = send(
        &app,
        "POST",
        &review_uri,
        Some(&dev.token),
        Some(json!({ "feedback": "Self-approved", "mark_reviewed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Manager reviews
    let (status, _, body) = send(
        &app,
        "POST",
        &review_uri,
        Some(&manager.token),
        Some(json!({ "feedback": "Good work", "mark_reviewed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reviewed: DailyLog = serde_json::from_value(body).unwrap();
    assert_eq!(reviewed.review_status, ReviewStatus::Reviewed);
    assert_eq!(reviewed.reviewed_by, Some(manager.user.id));

    let (_, _, body) = send(&app, "GET", "/api/notifications", Some(&dev.token), None).await;
    let inbox: NotificationList = serde_json::from_value(body).unwrap();
    assert_eq!(inbox.total, 1);
    assert_eq!(inbox.notifications[0].kind, NotificationKind::LogReviewed);

    // Mark it read
    let read_uri = format!("/api/notifications/{}/read", inbox.notifications[0].id);
    let (status, _, _) = send(&app, "PUT", &read_uri, Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, body) = send(&app, "PUT", &read_uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["read"], true);

    // Edit sends it back to pending
    let log_uri = format!("/api/daily-logs/{}", log.id);
    let (status, _, body) = send(
        &app,
        "PUT",
        &log_uri,
        Some(&dev.token),
        Some(log_body("2024-01-10")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let edited: DailyLog = serde_json::from_value(body).unwrap();
    assert_eq!(edited.review_status, ReviewStatus::Pending);
    assert!(edited.manager_feedback.is_none());
    assert!(edited.reviewed_at.is_none());

    // Delete
    let (status, _, _) = send(&app, "DELETE", &log_uri, Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&app, "DELETE", &log_uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, "GET", &log_uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_log_reports_field() {
    let app = create_test_app(create_test_db().await, None);
    let manager = register_manager(&app, "m@example.com", "Morgan").await;

    let mut body = log_body("2024-01-10");
    body["mood"] = json!(6);
    let (status, _, body) = send(&app, "POST", "/api/daily-logs", Some(&manager.token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "mood");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/daily-logs",
        Some(&manager.token),
        Some(log_body("2024-02-30")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "date");
}

#[tokio::test]
async fn test_team_routes() {
    let app = create_test_app(create_test_db().await, None);
    let manager = register_manager(&app, "m@example.com", "Morgan").await;
    let team = manager.team.clone().unwrap();
    let dev = register_developer(&app, "d@example.com", "Dana", &team.code).await;

    let (status, _, body) = send(&app, "GET", "/api/team/code", Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], team.code.as_str());
    let (status, _, _) = send(&app, "GET", "/api/team/code", Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, _, body) = send(&app, "GET", "/api/team", Some(&dev.token), None).await;
    let members: TeamMemberList = serde_json::from_value(body).unwrap();
    assert_eq!(members.total, 2);

    let members_uri = format!("/api/teams/{}/members", team.id);
    let (status, _, _) = send(&app, "GET", &members_uri, Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, "GET", &members_uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, _, body) = send(&app, "GET", "/api/available-teams", Some(&dev.token), None).await;
    let teams: TeamList = serde_json::from_value(body).unwrap();
    assert_eq!(teams.total, 1);

    let remind_uri = format!("/api/team/members/{}/remind", dev.user.id);
    let (status, _, body) = send(&app, "POST", &remind_uri, Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "log_reminder");

    let remove_uri = format!("/api/team/members/{}", dev.user.id);
    let (status, _, body) = send(&app, "DELETE", &remove_uri, Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], dev.user.id.to_string());

    let (status, _, _) = send(&app, "GET", "/api/user-team", Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Rejoin with a sloppy code, then leave
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/team/join",
        Some(&dev.token),
        Some(json!({ "code": format!("  {}  ", team.code.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, "POST", "/api/team/leave", Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, "POST", "/api/team/leave", Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_productivity_routes() {
    let app = create_test_app(create_test_db().await, None);
    let manager = register_manager(&app, "m@example.com", "Morgan").await;

    for date in ["2024-03-01", "2024-03-03", "2024-04-01"] {
        let (status, _, _) = send(
            &app,
            "POST",
            "/api/daily-logs",
            Some(&manager.token),
            Some(log_body(date)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/productivity?start_date=2024-03-01&end_date=2024-03-31",
        Some(&manager.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let logs: DailyLogList = serde_json::from_value(body).unwrap();
    let dates: Vec<&str> = logs.logs.iter().map(|l| l.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-03-03"]);

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/productivity/summary?start_date=2024-03-01&end_date=2024-03-31",
        Some(&manager.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary: ProductivitySummary = serde_json::from_value(body).unwrap();
    assert_eq!(summary.days_logged, 2);
    assert_eq!(summary.calendar_days, 31);
    assert_eq!(summary.blockers.len(), 2);

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/productivity?start_date=yesterday&end_date=2024-03-31",
        Some(&manager.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "start_date");

    let (status, _, body) = send(&app, "GET", "/api/stats/streak", Some(&manager.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["streak"], 0);
}

#[tokio::test]
async fn test_cron_trigger() {
    let db = create_test_db().await;

    let disabled = create_test_app(db.clone(), None);
    let (status, _, _) = send(&disabled, "POST", "/api/cron/daily-reminders", Some(CRON_SECRET), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let app = create_test_app(db, Some(CRON_SECRET));
    let manager = register_manager(&app, "m@example.com", "Morgan").await;
    let code = manager.team.unwrap().code;
    register_developer(&app, "d1@example.com", "Dana", &code).await;
    register_developer(&app, "d2@example.com", "Drew", &code).await;

    let (status, _, _) = send(&app, "POST", "/api/cron/daily-reminders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app, "POST", "/api/cron/daily-reminders", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(&app, "POST", "/api/cron/daily-reminders", Some(CRON_SECRET), None).await;
    assert_eq!(status, StatusCode::OK);
    let report: ReminderRunResponse = serde_json::from_value(body).unwrap();
    assert_eq!(report.reminded, 2);
}

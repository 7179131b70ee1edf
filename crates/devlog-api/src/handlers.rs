use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use devlog_auth::SessionClaims;
use devlog_core::{calendar, Caller, Error, LogInput, RegisterInput, ReviewInput};
use devlog_db::entities::user;

use crate::error::ApiError;
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::*;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Current user record behind the session
async fn caller(state: &AppState, auth: &AuthUser) -> ApiResult<Caller> {
    Ok(state.devlog.users.resolve_caller(auth.user_id).await?)
}

fn issue_session(state: &AppState, user: &user::Model) -> ApiResult<(String, DateTime<Utc>)> {
    let claims = SessionClaims::new(user.id.to_string(), Duration::hours(state.session_hours))
        .with_user_role(user.role.as_str().to_string());

    let token = state
        .jwt
        .issue(&claims)
        .map_err(|e| Error::Internal(format!("Failed to issue session token: {}", e)))?;

    Ok((token, claims.expires_at()))
}

/// Compare SHA-256 digests of both values in constant time
fn secret_matches(provided: &str, expected: &str) -> bool {
    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.ct_eq(&expected).into()
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

// ============================================================================
// System
// ============================================================================

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Auth
// ============================================================================

/// Register a new account
///
/// Managers get a new team; developers may join one with `team_code`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session started", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 404, description = "Unknown team code", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    debug!("Registering {}", req.email);

    let registration = RegisterInput {
        email: req.email,
        password: req.password,
        confirm_password: req.confirm_password,
        full_name: req.full_name,
        role: req.role,
        team_name: req.team_name,
        team_code: req.team_code,
    }
    .validate()?;

    let (user, team) = state.devlog.users.register(registration).await?;
    let (token, expires_at) = issue_session(&state, &user)?;
    let cookie = session_cookie(&token, state.session_hours * 3600, state.secure_cookies);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: user.into(),
            team: team.map(Team::from),
            token,
            expires_at,
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session started", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .devlog
        .users
        .authenticate(&req.email, &req.password)
        .await?;
    let (token, expires_at) = issue_session(&state, &user)?;
    let cookie = session_cookie(&token, state.session_hours * 3600, state.secure_cookies);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: user.into(),
            team: None,
            token,
            expires_at,
        }),
    ))
}

/// End the session by clearing the cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, session_cookie("", 0, state.secure_cookies))],
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// The logged-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = match state.devlog.users.get(auth.user_id).await {
        Err(Error::NotFound(_)) => {
            return Err(Error::Unauthenticated("User no longer exists".to_string()).into())
        }
        other => other?,
    };
    Ok(Json(user.into()))
}

// ============================================================================
// Daily logs
// ============================================================================

/// Submit a daily log
#[utoipa::path(
    post,
    path = "/api/daily-logs",
    request_body = DailyLogRequest,
    responses(
        (status = 201, description = "Log created", body = DailyLog),
        (status = 400, description = "Invalid log", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn create_daily_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DailyLogRequest>,
) -> ApiResult<(StatusCode, Json<DailyLog>)> {
    let author = caller(&state, &auth).await?;
    let fields = LogInput::from(req).validate()?;

    let log = state.devlog.logs.create(&author, fields).await?;
    Ok((StatusCode::CREATED, Json(log.into())))
}

/// The caller's logs, newest first
#[utoipa::path(
    get,
    path = "/api/daily-logs",
    responses(
        (status = 200, description = "Own logs", body = DailyLogList),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn list_daily_logs(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<DailyLogList>> {
    let author = caller(&state, &auth).await?;
    let logs: Vec<DailyLog> = state
        .devlog
        .logs
        .list_own(&author)
        .await?
        .into_iter()
        .map(DailyLog::from)
        .collect();

    let total = logs.len();
    Ok(Json(DailyLogList { logs, total }))
}

/// A single log
#[utoipa::path(
    get,
    path = "/api/daily-logs/{id}",
    params(
        ("id" = Uuid, Path, description = "Log ID")
    ),
    responses(
        (status = 200, description = "The log", body = DailyLog),
        (status = 403, description = "Not the author or their manager", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn get_daily_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DailyLog>> {
    let caller = caller(&state, &auth).await?;
    let log = state.devlog.logs.get(&caller, id).await?;
    Ok(Json(log.into()))
}

/// Replace a log's content
///
/// A reviewed log goes back to pending and its manager is told.
#[utoipa::path(
    put,
    path = "/api/daily-logs/{id}",
    params(
        ("id" = Uuid, Path, description = "Log ID")
    ),
    request_body = DailyLogRequest,
    responses(
        (status = 200, description = "Log updated", body = DailyLog),
        (status = 400, description = "Invalid log", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn update_daily_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<DailyLogRequest>,
) -> ApiResult<Json<DailyLog>> {
    let author = caller(&state, &auth).await?;
    let fields = LogInput::from(req).validate()?;

    let log = state.devlog.logs.update(&author, id, fields).await?;
    Ok(Json(log.into()))
}

/// Delete a log
#[utoipa::path(
    delete,
    path = "/api/daily-logs/{id}",
    params(
        ("id" = Uuid, Path, description = "Log ID")
    ),
    responses(
        (status = 204, description = "Log deleted"),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn delete_daily_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let author = caller(&state, &auth).await?;
    state.devlog.logs.delete(&author, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Review a team member's log
#[utoipa::path(
    post,
    path = "/api/daily-logs/{id}/review",
    params(
        ("id" = Uuid, Path, description = "Log ID")
    ),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review saved", body = DailyLog),
        (status = 400, description = "Invalid review", body = ErrorResponse),
        (status = 403, description = "Not the author's manager", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn review_daily_log(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<DailyLog>> {
    let manager = caller(&state, &auth).await?;
    let command = ReviewInput::from(req).validate()?;

    let log = state.devlog.reviews.review(&manager, id, command).await?;
    Ok(Json(log.into()))
}

/// All logs of the manager's team
#[utoipa::path(
    get,
    path = "/api/team-logs",
    responses(
        (status = 200, description = "Team logs, newest first", body = TeamLogList),
        (status = 403, description = "Not a manager", body = ErrorResponse),
        (status = 404, description = "No team", body = ErrorResponse)
    ),
    tag = "daily-logs"
)]
pub async fn list_team_logs(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<TeamLogList>> {
    let manager = caller(&state, &auth).await?;
    let logs: Vec<TeamLog> = state
        .devlog
        .logs
        .list_team(&manager)
        .await?
        .into_iter()
        .map(|(log, author)| TeamLog {
            log: log.into(),
            author: author.into(),
        })
        .collect();

    let total = logs.len();
    Ok(Json(TeamLogList { logs, total }))
}

// ============================================================================
// Teams
// ============================================================================

/// Join a team by invite code
#[utoipa::path(
    post,
    path = "/api/team/join",
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Joined", body = Team),
        (status = 403, description = "Managers cannot join another team", body = ErrorResponse),
        (status = 404, description = "Invalid team code", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn join_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<JoinTeamRequest>,
) -> ApiResult<Json<Team>> {
    let caller = caller(&state, &auth).await?;
    let team = state.devlog.teams.join_team_by_code(&caller, &req.code).await?;
    Ok(Json(team.into()))
}

/// Leave the current team
#[utoipa::path(
    post,
    path = "/api/team/leave",
    responses(
        (status = 200, description = "Left the team", body = MessageResponse),
        (status = 400, description = "Managers cannot leave their team", body = ErrorResponse),
        (status = 404, description = "No team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn leave_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller(&state, &auth).await?;
    state.devlog.teams.leave_team(&caller).await?;
    Ok(Json(MessageResponse {
        message: "Left team".to_string(),
    }))
}

/// Every team with its invite code
#[utoipa::path(
    get,
    path = "/api/available-teams",
    responses(
        (status = 200, description = "All teams", body = TeamList)
    ),
    tag = "teams"
)]
pub async fn list_available_teams(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TeamList>> {
    let teams: Vec<Team> = state
        .devlog
        .teams
        .list_available_teams()
        .await?
        .into_iter()
        .map(Team::from)
        .collect();

    let total = teams.len();
    Ok(Json(TeamList { teams, total }))
}

/// The caller's team
#[utoipa::path(
    get,
    path = "/api/user-team",
    responses(
        (status = 200, description = "Own team", body = Team),
        (status = 404, description = "No team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn get_user_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Team>> {
    let caller = caller(&state, &auth).await?;
    let team = state.devlog.teams.get_own_team(&caller).await?;
    Ok(Json(team.into()))
}

/// Members of the caller's team
#[utoipa::path(
    get,
    path = "/api/team",
    responses(
        (status = 200, description = "Own team members", body = TeamMemberList),
        (status = 404, description = "No team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn list_own_team_members(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<TeamMemberList>> {
    let caller = caller(&state, &auth).await?;
    let members: Vec<TeamMember> = state
        .devlog
        .teams
        .own_team_members(&caller)
        .await?
        .into_iter()
        .map(TeamMember::from)
        .collect();

    let total = members.len();
    Ok(Json(TeamMemberList { members, total }))
}

/// Members of a team, for its manager
#[utoipa::path(
    get,
    path = "/api/teams/{id}/members",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team members", body = TeamMemberList),
        (status = 403, description = "Not this team's manager", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn list_team_members(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamMemberList>> {
    let caller = caller(&state, &auth).await?;
    let members: Vec<TeamMember> = state
        .devlog
        .teams
        .members_of(&caller, id)
        .await?
        .into_iter()
        .map(TeamMember::from)
        .collect();

    let total = members.len();
    Ok(Json(TeamMemberList { members, total }))
}

/// The manager's invite code
#[utoipa::path(
    get,
    path = "/api/team/code",
    responses(
        (status = 200, description = "Invite code", body = TeamCodeResponse),
        (status = 403, description = "Not a manager", body = ErrorResponse),
        (status = 404, description = "No team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn get_team_code(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<TeamCodeResponse>> {
    let caller = caller(&state, &auth).await?;
    let code = state.devlog.teams.get_team_code(&caller).await?;
    Ok(Json(TeamCodeResponse { code }))
}

/// Remove a member from the manager's team
#[utoipa::path(
    delete,
    path = "/api/team/members/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Member's user ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = TeamMember),
        (status = 400, description = "Cannot remove yourself", body = ErrorResponse),
        (status = 403, description = "Not a manager", body = ErrorResponse),
        (status = 404, description = "Not a member of your team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn remove_team_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<TeamMember>> {
    let manager = caller(&state, &auth).await?;
    let member = state.devlog.teams.remove_member(&manager, user_id).await?;
    Ok(Json(member.into()))
}

/// Send a member a reminder about today's log
#[utoipa::path(
    post,
    path = "/api/team/members/{user_id}/remind",
    params(
        ("user_id" = Uuid, Path, description = "Member's user ID")
    ),
    responses(
        (status = 200, description = "Reminder sent", body = Notification),
        (status = 403, description = "Not a manager", body = ErrorResponse),
        (status = 404, description = "Not a member of your team", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn remind_team_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let manager = caller(&state, &auth).await?;
    let sent = state.devlog.teams.remind_member(&manager, user_id).await?;
    Ok(Json(sent.into()))
}

// ============================================================================
// Reports
// ============================================================================

/// The caller's logs within a date range, oldest first
#[utoipa::path(
    get,
    path = "/api/productivity",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Logs in range", body = DailyLogList),
        (status = 400, description = "Invalid dates", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn get_productivity(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<DailyLogList>> {
    let caller = caller(&state, &auth).await?;
    let logs: Vec<DailyLog> = state
        .devlog
        .reports
        .productivity_in_range(caller.id, &range.start_date, &range.end_date)
        .await?
        .into_iter()
        .map(DailyLog::from)
        .collect();

    let total = logs.len();
    Ok(Json(DailyLogList { logs, total }))
}

/// Totals, averages and blockers for a date range
#[utoipa::path(
    get,
    path = "/api/productivity/summary",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Summary", body = ProductivitySummary),
        (status = 400, description = "Invalid dates", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn get_productivity_summary(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<ProductivitySummary>> {
    let caller = caller(&state, &auth).await?;
    let summary = state
        .devlog
        .reports
        .summary(caller.id, &range.start_date, &range.end_date)
        .await?;
    Ok(Json(summary.into()))
}

/// Consecutive days with a log, ending today (UTC)
#[utoipa::path(
    get,
    path = "/api/stats/streak",
    responses(
        (status = 200, description = "Current streak", body = StreakResponse)
    ),
    tag = "reports"
)]
pub async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<StreakResponse>> {
    let caller = caller(&state, &auth).await?;
    let today = calendar::today();
    let streak = state
        .devlog
        .reports
        .current_streak(caller.id, &today)
        .await?;
    Ok(Json(StreakResponse { streak, today }))
}

// ============================================================================
// Notifications
// ============================================================================

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Notifications", body = NotificationList)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<NotificationList>> {
    let caller = caller(&state, &auth).await?;
    let notifications: Vec<Notification> = state
        .devlog
        .notifications
        .list(&caller)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    let total = notifications.len();
    Ok(Json(NotificationList {
        notifications,
        total,
    }))
}

/// Number of unread notifications
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread count", body = UnreadCount)
    ),
    tag = "notifications"
)]
pub async fn unread_notification_count(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UnreadCount>> {
    let caller = caller(&state, &auth).await?;
    let count = state.devlog.notifications.unread_count(&caller).await?;
    Ok(Json(UnreadCount { count }))
}

/// Mark a notification as read
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let caller = caller(&state, &auth).await?;
    let row = state.devlog.notifications.mark_read(&caller, id).await?;
    Ok(Json(row.into()))
}

// ============================================================================
// Cron
// ============================================================================

/// Run the daily reminder sweep now
///
/// Guarded by `Authorization: Bearer <cron secret>`; unavailable when no
/// secret is configured.
#[utoipa::path(
    post,
    path = "/api/cron/daily-reminders",
    responses(
        (status = 200, description = "Sweep finished", body = ReminderRunResponse),
        (status = 401, description = "Missing or wrong cron secret", body = ErrorResponse),
        (status = 404, description = "Cron trigger disabled", body = ErrorResponse)
    ),
    tag = "system"
)]
pub async fn run_daily_reminders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ReminderRunResponse>> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Err(Error::not_found("Not found").into());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if !presented.is_some_and(|p| secret_matches(p, secret)) {
        warn!("Rejected reminder trigger with missing or wrong secret");
        return Err(Error::Unauthenticated("Unauthorized".to_string()).into());
    }

    let today = calendar::today();
    let report = state.devlog.reminders.run_daily_reminder(&today).await?;
    info!(
        "Reminder sweep for {} triggered over HTTP: {} reminded",
        report.date, report.reminded
    );

    Ok(Json(ReminderRunResponse {
        date: report.date,
        reminded: report.reminded,
    }))
}

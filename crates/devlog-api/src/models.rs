use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use devlog_db::entities::{daily_log, notification, team, user};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Offending field for validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Users and sessions
// ============================================================================

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Submits daily logs
    Developer,
    /// Owns a team and reviews its logs
    Manager,
}

impl From<user::UserRole> for UserRole {
    fn from(role: user::UserRole) -> Self {
        match role {
            user::UserRole::Developer => UserRole::Developer,
            user::UserRole::Manager => UserRole::Manager,
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    /// Current team, if any
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.into(),
            team_id: user.team_id,
            created_at: user.created_at,
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (must be unique)
    pub email: String,
    /// Password (minimum 6 characters)
    pub password: String,
    /// Must equal `password`
    pub confirm_password: String,
    pub full_name: String,
    /// "developer" or "manager"
    pub role: String,
    /// Managers only: name of the team to create
    #[serde(default)]
    pub team_name: Option<String>,
    /// Developers only: invite code of a team to join
    #[serde(default)]
    pub team_code: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful registration or login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    /// Team created or joined at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    /// Session token (also set as the `session_token` cookie)
    pub token: String,
    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Teams
// ============================================================================

/// Team
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    /// Invite code
    pub code: String,
    pub manager_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<team::Model> for Team {
    fn from(team: team::Model) -> Self {
        Self {
            id: team.id,
            name: team.name,
            code: team.code,
            manager_id: team.manager_id,
            created_at: team.created_at,
        }
    }
}

/// List of teams
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamList {
    pub teams: Vec<Team>,
    pub total: usize,
}

/// Team member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMember {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

impl From<user::Model> for TeamMember {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.into(),
        }
    }
}

/// Members of a team
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMemberList {
    pub members: Vec<TeamMember>,
    pub total: usize,
}

/// Join a team by invite code
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinTeamRequest {
    /// Invite code, case-insensitive
    pub code: String,
}

/// A team's invite code
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamCodeResponse {
    pub code: String,
}

// ============================================================================
// Daily logs
// ============================================================================

/// Review state of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
}

impl From<daily_log::ReviewStatus> for ReviewStatus {
    fn from(status: daily_log::ReviewStatus) -> Self {
        match status {
            daily_log::ReviewStatus::Pending => ReviewStatus::Pending,
            daily_log::ReviewStatus::Reviewed => ReviewStatus::Reviewed,
        }
    }
}

/// Create or replace a daily log
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyLogRequest {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub tasks: String,
    /// 0..=24
    pub hours: i64,
    /// 0..=59
    pub minutes: i64,
    /// 1..=5
    pub mood: i64,
    /// Comma separated
    #[serde(default)]
    pub blockers: Option<String>,
}

impl From<DailyLogRequest> for devlog_core::LogInput {
    fn from(req: DailyLogRequest) -> Self {
        Self {
            date: req.date,
            tasks: req.tasks,
            hours: req.hours,
            minutes: req.minutes,
            mood: req.mood,
            blockers: req.blockers,
        }
    }
}

/// Daily log
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub tasks: String,
    pub hours: i32,
    pub minutes: i32,
    pub mood: i32,
    pub blockers: Option<String>,
    pub review_status: ReviewStatus,
    pub manager_feedback: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<daily_log::Model> for DailyLog {
    fn from(log: daily_log::Model) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            date: log.date,
            tasks: log.tasks,
            hours: log.hours,
            minutes: log.minutes,
            mood: log.mood,
            blockers: log.blockers,
            review_status: log.review_status.into(),
            manager_feedback: log.manager_feedback,
            reviewed_by: log.reviewed_by,
            reviewed_at: log.reviewed_at,
            created_at: log.created_at,
            updated_at: log.updated_at,
        }
    }
}

/// List of daily logs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyLogList {
    pub logs: Vec<DailyLog>,
    pub total: usize,
}

/// A team log with its author
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamLog {
    pub log: DailyLog,
    pub author: TeamMember,
}

/// Logs of a manager's team
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamLogList {
    pub logs: Vec<TeamLog>,
    pub total: usize,
}

/// Manager review of a log
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub feedback: String,
    /// Finalize the review; `false` saves the feedback as a draft
    #[serde(alias = "is_reviewed")]
    pub mark_reviewed: bool,
}

impl From<ReviewRequest> for devlog_core::ReviewInput {
    fn from(req: ReviewRequest) -> Self {
        Self {
            feedback: req.feedback,
            mark_reviewed: req.mark_reviewed,
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Inclusive date range
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
pub struct DateRangeQuery {
    /// First day, `YYYY-MM-DD`
    pub start_date: String,
    /// Last day, `YYYY-MM-DD`
    pub end_date: String,
}

/// How often a blocker was reported
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlockerCount {
    pub blocker: String,
    pub count: u32,
}

/// Totals and averages for a date range
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductivitySummary {
    pub start_date: String,
    pub end_date: String,
    pub total_logs: usize,
    /// Distinct days with at least one log
    pub days_logged: usize,
    pub calendar_days: i64,
    pub total_hours: f64,
    pub average_hours: f64,
    pub average_mood: f64,
    /// Percentage of calendar days with a log
    pub completion_rate: f64,
    pub blockers: Vec<BlockerCount>,
}

impl From<devlog_core::ProductivitySummary> for ProductivitySummary {
    fn from(summary: devlog_core::ProductivitySummary) -> Self {
        Self {
            start_date: summary.start_date,
            end_date: summary.end_date,
            total_logs: summary.total_logs,
            days_logged: summary.days_logged,
            calendar_days: summary.calendar_days,
            total_hours: summary.total_hours,
            average_hours: summary.average_hours,
            average_mood: summary.average_mood,
            completion_rate: summary.completion_rate,
            blockers: summary
                .blockers
                .into_iter()
                .map(|b| BlockerCount {
                    blocker: b.blocker,
                    count: b.count,
                })
                .collect(),
        }
    }
}

/// Current logging streak
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreakResponse {
    /// Consecutive days with a log, ending today
    pub streak: u32,
    pub today: String,
}

// ============================================================================
// Notifications
// ============================================================================

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LogSubmitted,
    LogReviewed,
    LogReEdited,
    LogReminder,
}

impl From<notification::NotificationKind> for NotificationKind {
    fn from(kind: notification::NotificationKind) -> Self {
        match kind {
            notification::NotificationKind::LogSubmitted => NotificationKind::LogSubmitted,
            notification::NotificationKind::LogReviewed => NotificationKind::LogReviewed,
            notification::NotificationKind::LogReEdited => NotificationKind::LogReEdited,
            notification::NotificationKind::LogReminder => NotificationKind::LogReminder,
        }
    }
}

/// In-app notification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for Notification {
    fn from(row: notification::Model) -> Self {
        Self {
            id: row.id,
            kind: row.kind.into(),
            title: row.title,
            message: row.message,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// The caller's notifications, newest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub total: usize,
}

/// Number of unread notifications
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    pub count: u64,
}

/// Result of a reminder sweep
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReminderRunResponse {
    pub date: String,
    /// Developers reminded
    pub reminded: usize,
}

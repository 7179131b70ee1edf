//! DevLog REST API
//!
//! axum router over the `devlog-core` services, with session authentication,
//! an OpenAPI document and Swagger UI.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use devlog_auth::JwtValidator;
use devlog_core::DevLog;

/// Application state shared across handlers
pub struct AppState {
    pub devlog: DevLog,
    pub jwt: Arc<JwtValidator>,
    /// Session lifetime in hours
    pub session_hours: i64,
    /// Bearer secret for the reminder trigger; the route is disabled without it
    pub cron_secret: Option<String>,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DevLog API",
        version = "0.1.0",
        description = "Daily work logs, manager reviews and team productivity reports",
        contact(
            name = "DevLog Team",
            email = "team@devlog.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::register,
        handlers::login,
        handlers::logout,
        handlers::get_current_user,
        handlers::create_daily_log,
        handlers::list_daily_logs,
        handlers::get_daily_log,
        handlers::update_daily_log,
        handlers::delete_daily_log,
        handlers::review_daily_log,
        handlers::list_team_logs,
        handlers::join_team,
        handlers::leave_team,
        handlers::list_available_teams,
        handlers::get_user_team,
        handlers::list_own_team_members,
        handlers::list_team_members,
        handlers::get_team_code,
        handlers::remove_team_member,
        handlers::remind_team_member,
        handlers::get_productivity,
        handlers::get_productivity_summary,
        handlers::get_streak,
        handlers::list_notifications,
        handlers::unread_notification_count,
        handlers::mark_notification_read,
        handlers::run_daily_reminders,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::ErrorResponse,
            models::MessageResponse,
            models::UserRole,
            models::User,
            models::RegisterRequest,
            models::LoginRequest,
            models::AuthResponse,
            models::Team,
            models::TeamList,
            models::TeamMember,
            models::TeamMemberList,
            models::JoinTeamRequest,
            models::TeamCodeResponse,
            models::ReviewStatus,
            models::DailyLogRequest,
            models::DailyLog,
            models::DailyLogList,
            models::TeamLog,
            models::TeamLogList,
            models::ReviewRequest,
            models::DateRangeQuery,
            models::BlockerCount,
            models::ProductivitySummary,
            models::StreakResponse,
            models::NotificationKind,
            models::Notification,
            models::NotificationList,
            models::UnreadCount,
            models::ReminderRunResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "daily-logs", description = "Daily log submission and review"),
        (name = "teams", description = "Team membership and invite codes"),
        (name = "reports", description = "Productivity reports and streaks"),
        (name = "notifications", description = "In-app notifications"),
        (name = "system", description = "Health and scheduled jobs")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, localhost origins are allowed)
    pub cors_origins: Option<Vec<String>>,
    /// Secret for signing session tokens
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub session_hours: i64,
    /// Bearer secret guarding `POST /api/cron/daily-reminders`
    pub cron_secret: Option<String>,
    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub secure_cookies: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: "devlog-dev-secret-change-me".to_string(),
            session_hours: 24,
            cron_secret: None,
            secure_cookies: false,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, devlog: DevLog) -> Self {
        let state = Arc::new(AppState {
            devlog,
            jwt: Arc::new(JwtValidator::new(config.jwt_secret.as_bytes())),
            session_hours: config.session_hours,
            cron_secret: config.cron_secret.clone(),
            secure_cookies: config.secure_cookies,
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        let jwt_state = Arc::new(middleware::JwtState {
            validator: self.state.jwt.clone(),
        });

        // Build PUBLIC routes (no session required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/auth/register", post(handlers::register))
            .route("/api/auth/login", post(handlers::login))
            .route("/api/auth/logout", post(handlers::logout))
            .route(
                "/api/cron/daily-reminders",
                post(handlers::run_daily_reminders),
            )
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a session token)
        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::get_current_user))
            // Daily logs
            .route(
                "/api/daily-logs",
                get(handlers::list_daily_logs).post(handlers::create_daily_log),
            )
            .route(
                "/api/daily-logs/{id}",
                get(handlers::get_daily_log)
                    .put(handlers::update_daily_log)
                    .delete(handlers::delete_daily_log),
            )
            .route(
                "/api/daily-logs/{id}/review",
                post(handlers::review_daily_log),
            )
            .route("/api/team-logs", get(handlers::list_team_logs))
            // Teams
            .route("/api/team", get(handlers::list_own_team_members))
            .route("/api/team/join", post(handlers::join_team))
            .route("/api/team/leave", post(handlers::leave_team))
            .route("/api/team/code", get(handlers::get_team_code))
            .route(
                "/api/team/members/{user_id}",
                delete(handlers::remove_team_member),
            )
            .route(
                "/api/team/members/{user_id}/remind",
                post(handlers::remind_team_member),
            )
            .route("/api/teams/{id}/members", get(handlers::list_team_members))
            .route("/api/available-teams", get(handlers::list_available_teams))
            .route("/api/user-team", get(handlers::get_user_team))
            // Reports
            .route("/api/productivity", get(handlers::get_productivity))
            .route(
                "/api/productivity/summary",
                get(handlers::get_productivity_summary),
            )
            .route("/api/stats/streak", get(handlers::get_streak))
            // Notifications
            .route("/api/notifications", get(handlers::list_notifications))
            .route(
                "/api/notifications/unread-count",
                get(handlers::unread_notification_count),
            )
            .route(
                "/api/notifications/{id}/read",
                put(handlers::mark_notification_read),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                jwt_state,
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi serves the document at /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    fn cors_layer(&self) -> CorsLayer {
        // Cookie sessions need credentials, which rules out a wildcard origin
        let allow_origin = match &self.config.cors_origins {
            Some(origins) => AllowOrigin::list(
                origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok())
                    .collect::<Vec<_>>(),
            ),
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin = origin.to_str().unwrap_or("");
                origin.starts_with("http://localhost:")
                    || origin.starts_with("http://127.0.0.1:")
                    || origin.starts_with("https://localhost:")
                    || origin.starts_with("https://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(allow_origin)
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

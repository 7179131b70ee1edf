//! DevLog domain services
//!
//! Team membership, the daily log lifecycle, manager review, productivity
//! reports, notifications and the daily reminder sweep. Every operation takes
//! an already resolved [`Caller`]; sessions are the API layer's concern.

pub mod aggregation;
pub mod calendar;
pub mod error;
pub mod logs;
pub mod mail;
pub mod notifications;
pub mod reminder;
pub mod review;
pub mod teams;
pub mod users;
pub mod validation;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use aggregation::{streak, BlockerCount, ProductivitySummary, ReportService};
pub use error::{Error, Result};
pub use logs::LogService;
pub use mail::{mailer_from_config, DisabledMailer, MailConfig, MailError, MailMessage, Mailer, SmtpMailer};
pub use notifications::{DomainEvent, NotificationDispatcher, NotificationService};
pub use reminder::{ReminderConfig, ReminderReport, ReminderScheduler, ReminderService};
pub use review::ReviewService;
pub use teams::TeamService;
pub use users::{Caller, UserService};
pub use validation::{
    LogFields, LogInput, RegisterInput, Registration, ReviewCommand, ReviewInput, TeamChoice,
};

/// All services sharing one connection pool and mailer
#[derive(Clone)]
pub struct DevLog {
    pub users: UserService,
    pub teams: TeamService,
    pub logs: LogService,
    pub reviews: ReviewService,
    pub reports: ReportService,
    pub notifications: NotificationService,
    pub reminders: ReminderService,
}

impl DevLog {
    /// `app_url` is the public base URL used for links in emails
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Self {
        let app_url = app_url.into();
        let reminders = ReminderService::new(db.clone(), mailer.clone(), app_url.clone());

        Self {
            users: UserService::new(db.clone()),
            teams: TeamService::new(db.clone(), reminders.clone()),
            logs: LogService::new(db.clone()),
            reviews: ReviewService::new(db.clone(), mailer, app_url),
            reports: ReportService::new(db.clone()),
            notifications: NotificationService::new(db),
            reminders,
        }
    }
}

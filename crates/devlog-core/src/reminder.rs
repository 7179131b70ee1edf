//! Daily reminder sweep and its cron-driven scheduler

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info};
use uuid::Uuid;

use devlog_db::entities::{
    daily_log, notification,
    user::{self, UserRole},
};

use crate::calendar;
use crate::error::{Error, Result};
use crate::mail::{self, templates, Mailer};
use crate::notifications::{DomainEvent, NotificationDispatcher};

/// Six-field cron (with seconds): every day at 16:00 UTC
pub const DEFAULT_REMINDER_SCHEDULE: &str = "0 0 16 * * *";

const MIN_SLEEP: Duration = Duration::from_secs(1);

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub schedule: String,
    pub enabled: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_REMINDER_SCHEDULE.to_string(),
            enabled: true,
        }
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderReport {
    pub date: String,
    pub reminded: usize,
}

#[derive(Clone)]
pub struct ReminderService {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl ReminderService {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, app_url: String) -> Self {
        Self {
            db,
            mailer,
            app_url,
        }
    }

    /// Remind every developer who has no log dated `today`
    ///
    /// Running it twice for the same day reminds the same people twice.
    pub async fn run_daily_reminder(&self, today: &str) -> Result<ReminderReport> {
        let logged: Vec<Uuid> = daily_log::Entity::find()
            .select_only()
            .column(daily_log::Column::UserId)
            .filter(daily_log::Column::Date.eq(today))
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut query = user::Entity::find()
            .filter(user::Column::Role.eq(UserRole::Developer))
            .order_by_asc(user::Column::Email);
        if !logged.is_empty() {
            query = query.filter(user::Column::Id.is_not_in(logged));
        }
        let missing = query.all(&self.db).await?;

        info!(
            "Daily reminder for {}: {} developers without a log",
            today,
            missing.len()
        );

        let mut reminded = 0;
        for developer in &missing {
            self.remind(developer, today).await?;
            reminded += 1;
        }

        Ok(ReminderReport {
            date: today.to_string(),
            reminded,
        })
    }

    /// One reminder: an in-app notification plus a best-effort email
    pub async fn remind(&self, user: &user::Model, date: &str) -> Result<notification::Model> {
        let row = NotificationDispatcher::dispatch(
            &self.db,
            &DomainEvent::ReminderDue {
                user_id: user.id,
                date: date.to_string(),
            },
        )
        .await?;

        mail::send_best_effort(
            self.mailer.as_ref(),
            templates::reminder(&user.email, &user.full_name, date, &self.app_url),
        )
        .await;

        Ok(row)
    }
}

/// Runs the sweep whenever its cron schedule fires
pub struct ReminderScheduler {
    schedule: Schedule,
    service: ReminderService,
}

impl ReminderScheduler {
    pub fn new(expression: &str, service: ReminderService) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            Error::validation(
                "reminder_schedule",
                format!("Invalid cron expression '{}': {}", expression, e),
            )
        })?;
        Ok(Self { schedule, service })
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Spawn the scheduler loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        loop {
            let Some(next) = self.next_run() else {
                info!("Reminder schedule has no upcoming runs, stopping");
                return;
            };
            info!("Next daily reminder at {}", next);

            let wait = (next - Utc::now())
                .to_std()
                .unwrap_or(MIN_SLEEP)
                .max(MIN_SLEEP);
            sleep(wait).await;

            let today = calendar::today();
            match self.service.run_daily_reminder(&today).await {
                Ok(report) => info!(
                    "Daily reminder for {} sent to {} developers",
                    report.date, report.reminded
                ),
                Err(e) => error!("Daily reminder for {} failed: {}", today, e),
            }
        }
    }
}

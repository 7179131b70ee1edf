//! In-app notifications
//!
//! Operations that change log or membership state describe what happened as
//! a [`DomainEvent`]. [`NotificationDispatcher`] writes the matching row on
//! whatever connection it is handed, so callers inside a transaction get the
//! state change and the notification committed together.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info};
use uuid::Uuid;

use devlog_db::entities::notification::{self, NotificationKind};

use crate::error::{Error, Result};
use crate::users::Caller;

/// Something that happened and must be announced to one user
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A team member submitted a log; goes to the team's manager
    LogSubmitted {
        manager_id: Uuid,
        author_name: String,
        date: String,
    },
    /// A reviewed log was edited and needs another look
    LogReEdited {
        manager_id: Uuid,
        author_name: String,
        date: String,
    },
    /// A manager finalized the review of a log; goes to its author
    LogReviewed {
        author_id: Uuid,
        reviewer_name: String,
        date: String,
    },
    /// A developer has no log for `date` yet
    ReminderDue { user_id: Uuid, date: String },
}

impl DomainEvent {
    pub fn recipient(&self) -> Uuid {
        match self {
            DomainEvent::LogSubmitted { manager_id, .. }
            | DomainEvent::LogReEdited { manager_id, .. } => *manager_id,
            DomainEvent::LogReviewed { author_id, .. } => *author_id,
            DomainEvent::ReminderDue { user_id, .. } => *user_id,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            DomainEvent::LogSubmitted { .. } => NotificationKind::LogSubmitted,
            DomainEvent::LogReEdited { .. } => NotificationKind::LogReEdited,
            DomainEvent::LogReviewed { .. } => NotificationKind::LogReviewed,
            DomainEvent::ReminderDue { .. } => NotificationKind::LogReminder,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DomainEvent::LogSubmitted { .. } => "New Log Submitted",
            DomainEvent::LogReEdited { .. } => "Log Re-edited",
            DomainEvent::LogReviewed { .. } => "Log Reviewed",
            DomainEvent::ReminderDue { .. } => "Daily Log Reminder",
        }
    }

    pub fn message(&self) -> String {
        match self {
            DomainEvent::LogSubmitted {
                author_name, date, ..
            } => format!("{} has submitted a daily log for {}", author_name, date),
            DomainEvent::LogReEdited {
                author_name, date, ..
            } => format!(
                "{} has re-edited their log for {} and requires re-review",
                author_name, date
            ),
            DomainEvent::LogReviewed {
                reviewer_name,
                date,
                ..
            } => format!(
                "Your log for {} has been reviewed by {}",
                date, reviewer_name
            ),
            DomainEvent::ReminderDue { date, .. } => {
                format!("Don't forget to submit your daily log for {}!", date)
            }
        }
    }
}

/// Persists domain events as notification rows
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    pub async fn dispatch<C>(conn: &C, event: &DomainEvent) -> Result<notification::Model>
    where
        C: ConnectionTrait,
    {
        let row = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(event.recipient()),
            kind: Set(event.kind()),
            title: Set(event.title().to_string()),
            message: Set(event.message()),
            read: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        debug!(
            "Notification {:?} queued for user {}",
            row.kind, row.user_id
        );
        Ok(row)
    }
}

/// Read side of the notification inbox
#[derive(Clone)]
pub struct NotificationService {
    db: DatabaseConnection,
}

impl NotificationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The caller's notifications, newest first
    pub async fn list(&self, caller: &Caller) -> Result<Vec<notification::Model>> {
        let rows = notification::Entity::find()
            .filter(notification::Column::UserId.eq(caller.id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn mark_read(
        &self,
        caller: &Caller,
        notification_id: Uuid,
    ) -> Result<notification::Model> {
        let row = notification::Entity::find_by_id(notification_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Notification not found"))?;

        if row.user_id != caller.id {
            return Err(Error::forbidden("Not your notification"));
        }

        if row.read {
            return Ok(row);
        }

        let mut active: notification::ActiveModel = row.into();
        active.read = Set(true);
        let updated = active.update(&self.db).await?;

        info!("Notification {} marked read", updated.id);
        Ok(updated)
    }

    pub async fn unread_count(&self, caller: &Caller) -> Result<u64> {
        let count = notification::Entity::find()
            .filter(notification::Column::UserId.eq(caller.id))
            .filter(notification::Column::Read.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

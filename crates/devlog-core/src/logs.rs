//! Daily log lifecycle: create, edit, delete, read

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use devlog_db::entities::{
    daily_log::{self, ReviewStatus},
    team, user,
};

use crate::error::{Error, Result};
use crate::notifications::{DomainEvent, NotificationDispatcher};
use crate::users::Caller;
use crate::validation::LogFields;

#[derive(Clone)]
pub struct LogService {
    db: DatabaseConnection,
}

impl LogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a new log; it always starts `pending`
    pub async fn create(&self, author: &Caller, fields: LogFields) -> Result<daily_log::Model> {
        let txn = self.db.begin().await?;

        let now = Utc::now();
        let created = daily_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(author.id),
            date: Set(fields.date),
            tasks: Set(fields.tasks),
            hours: Set(fields.hours),
            minutes: Set(fields.minutes),
            mood: Set(fields.mood),
            blockers: Set(fields.blockers),
            review_status: Set(ReviewStatus::Pending),
            manager_feedback: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if let Some(manager_id) = manager_to_notify(&txn, author).await? {
            NotificationDispatcher::dispatch(
                &txn,
                &DomainEvent::LogSubmitted {
                    manager_id,
                    author_name: author.full_name.clone(),
                    date: created.date.clone(),
                },
            )
            .await?;
        }

        txn.commit().await?;

        info!(
            "User {} submitted log {} for {}",
            author.id, created.id, created.date
        );
        Ok(created)
    }

    /// Replace a log's content; a reviewed log goes back to `pending`
    pub async fn update(
        &self,
        author: &Caller,
        log_id: Uuid,
        fields: LogFields,
    ) -> Result<daily_log::Model> {
        let txn = self.db.begin().await?;

        let existing = daily_log::Entity::find_by_id(log_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Log not found"))?;

        if existing.user_id != author.id {
            return Err(Error::forbidden("You can only edit your own logs"));
        }

        let was_reviewed = existing.review_status == ReviewStatus::Reviewed;

        let mut active: daily_log::ActiveModel = existing.into();
        active.date = Set(fields.date);
        active.tasks = Set(fields.tasks);
        active.hours = Set(fields.hours);
        active.minutes = Set(fields.minutes);
        active.mood = Set(fields.mood);
        active.blockers = Set(fields.blockers);
        active.updated_at = Set(Utc::now());

        if was_reviewed {
            active.review_status = Set(ReviewStatus::Pending);
            active.manager_feedback = Set(None);
            active.reviewed_by = Set(None);
            active.reviewed_at = Set(None);
        }

        let updated = active.update(&txn).await?;

        if was_reviewed {
            if let Some(manager_id) = manager_to_notify(&txn, author).await? {
                NotificationDispatcher::dispatch(
                    &txn,
                    &DomainEvent::LogReEdited {
                        manager_id,
                        author_name: author.full_name.clone(),
                        date: updated.date.clone(),
                    },
                )
                .await?;
            }
        }

        txn.commit().await?;

        if was_reviewed {
            info!("Reviewed log {} edited, back to pending", updated.id);
        } else {
            info!("Log {} updated", updated.id);
        }
        Ok(updated)
    }

    pub async fn delete(&self, author: &Caller, log_id: Uuid) -> Result<()> {
        let existing = daily_log::Entity::find_by_id(log_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Log not found"))?;

        if existing.user_id != author.id {
            return Err(Error::forbidden("You can only delete your own logs"));
        }

        existing.delete(&self.db).await?;

        info!("User {} deleted log {}", author.id, log_id);
        Ok(())
    }

    /// A single log, visible to its author and to the author's team manager
    pub async fn get(&self, caller: &Caller, log_id: Uuid) -> Result<daily_log::Model> {
        let (log, author) = daily_log::Entity::find_by_id(log_id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Log not found"))?;

        if log.user_id == caller.id {
            return Ok(log);
        }

        let same_team = match (caller.team_id, author.and_then(|a| a.team_id)) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        };
        if caller.is_manager() && same_team {
            Ok(log)
        } else {
            Err(Error::forbidden("You cannot view this log"))
        }
    }

    /// The author's logs, newest date first
    pub async fn list_own(&self, author: &Caller) -> Result<Vec<daily_log::Model>> {
        let logs = daily_log::Entity::find()
            .filter(daily_log::Column::UserId.eq(author.id))
            .order_by_desc(daily_log::Column::Date)
            .order_by_desc(daily_log::Column::CreatedAt)
            .all(&self.db)
            .await?;

        debug!("Loaded {} logs for user {}", logs.len(), author.id);
        Ok(logs)
    }

    /// All logs of the manager's team with their authors, newest date first
    pub async fn list_team(
        &self,
        manager: &Caller,
    ) -> Result<Vec<(daily_log::Model, user::Model)>> {
        manager.require_manager()?;
        let team_id = manager.require_team()?;

        let rows = daily_log::Entity::find()
            .find_also_related(user::Entity)
            .filter(user::Column::TeamId.eq(team_id))
            .order_by_desc(daily_log::Column::Date)
            .order_by_desc(daily_log::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let logs: Vec<_> = rows
            .into_iter()
            .filter_map(|(log, author)| author.map(|a| (log, a)))
            .collect();

        debug!("Loaded {} logs for team {}", logs.len(), team_id);
        Ok(logs)
    }
}

/// The manager of the author's team, unless there is no team or the author
/// manages it
async fn manager_to_notify<C>(conn: &C, author: &Caller) -> Result<Option<Uuid>>
where
    C: ConnectionTrait,
{
    let Some(team_id) = author.team_id else {
        return Ok(None);
    };

    let manager_id = team::Entity::find_by_id(team_id)
        .one(conn)
        .await?
        .map(|t| t.manager_id)
        .filter(|manager_id| *manager_id != author.id);
    Ok(manager_id)
}

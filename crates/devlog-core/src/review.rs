//! Manager review of daily logs

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use devlog_db::entities::{
    daily_log::{self, ReviewStatus},
    user,
};

use crate::error::{Error, Result};
use crate::mail::{self, templates, Mailer};
use crate::notifications::{DomainEvent, NotificationDispatcher};
use crate::users::Caller;
use crate::validation::ReviewCommand;

#[derive(Clone)]
pub struct ReviewService {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl ReviewService {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, app_url: String) -> Self {
        Self {
            db,
            mailer,
            app_url,
        }
    }

    /// Attach feedback to a log and optionally finalize it
    ///
    /// Finalizing sets the reviewer and timestamp and tells the author (in-app
    /// and by email). Saving without finalizing leaves the log `pending` with
    /// the feedback kept as a draft.
    pub async fn review(
        &self,
        manager: &Caller,
        log_id: Uuid,
        command: ReviewCommand,
    ) -> Result<daily_log::Model> {
        manager.require_manager()?;

        let txn = self.db.begin().await?;

        let (log, author) = daily_log::Entity::find_by_id(log_id)
            .find_also_related(user::Entity)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Log not found"))?;

        let author = match (author, manager.team_id) {
            (Some(author), Some(team_id)) if author.team_id == Some(team_id) => author,
            _ => {
                return Err(Error::forbidden(
                    "You can only review logs from your team members",
                ))
            }
        };

        let mut active: daily_log::ActiveModel = log.into();
        active.manager_feedback = Set(Some(command.feedback.clone()));
        active.updated_at = Set(Utc::now());

        if command.mark_reviewed {
            active.review_status = Set(ReviewStatus::Reviewed);
            active.reviewed_by = Set(Some(manager.id));
            active.reviewed_at = Set(Some(Utc::now()));
        } else {
            active.review_status = Set(ReviewStatus::Pending);
            active.reviewed_by = Set(None);
            active.reviewed_at = Set(None);
        }

        let updated = active.update(&txn).await?;

        if command.mark_reviewed {
            NotificationDispatcher::dispatch(
                &txn,
                &DomainEvent::LogReviewed {
                    author_id: author.id,
                    reviewer_name: manager.full_name.clone(),
                    date: updated.date.clone(),
                },
            )
            .await?;
        }

        txn.commit().await?;

        if command.mark_reviewed {
            info!("Manager {} reviewed log {}", manager.id, updated.id);
            mail::send_best_effort(
                self.mailer.as_ref(),
                templates::review(
                    &author.email,
                    &author.full_name,
                    &manager.full_name,
                    &updated.date,
                    &command.feedback,
                    &self.app_url,
                ),
            )
            .await;
        } else {
            info!("Manager {} saved draft feedback on log {}", manager.id, updated.id);
        }

        Ok(updated)
    }
}

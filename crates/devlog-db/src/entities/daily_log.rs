//! DailyLog entity: one developer's work summary for a calendar day

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review state of a daily log
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Waiting for (re-)review
    #[sea_orm(string_value = "pending")]
    Pending,

    /// Finalized by a manager
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_logs")]
pub struct Model {
    /// Log UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Author of the log
    pub user_id: Uuid,

    /// Calendar day in `YYYY-MM-DD` form
    pub date: String,

    /// Free-text task narrative
    #[sea_orm(column_type = "Text")]
    pub tasks: String,

    /// Hours spent (0..=24)
    pub hours: i32,

    /// Minutes spent (0..=59)
    pub minutes: i32,

    /// Mood rating (1..=5)
    pub mood: i32,

    /// Blockers, comma separated
    #[sea_orm(column_type = "Text", nullable)]
    pub blockers: Option<String>,

    /// Pending or reviewed
    pub review_status: ReviewStatus,

    /// Manager feedback (may be a draft while pending)
    #[sea_orm(column_type = "Text", nullable)]
    pub manager_feedback: Option<String>,

    /// Manager who finalized the review
    pub reviewed_by: Option<Uuid>,

    /// When the review was finalized
    pub reviewed_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Log belongs to its author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,

    /// Log was reviewed by a manager
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewedBy",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Reviewer,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

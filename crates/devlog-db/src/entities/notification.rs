//! Notification entity: an in-app event addressed to one user

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What triggered a notification
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "log_submitted")]
    LogSubmitted,

    #[sea_orm(string_value = "log_reviewed")]
    LogReviewed,

    #[sea_orm(string_value = "log_re_edited")]
    LogReEdited,

    #[sea_orm(string_value = "log_reminder")]
    LogReminder,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Notification UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    /// Event type
    pub kind: NotificationKind,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Whether the recipient has read it
    pub read: bool,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Notification belongs to its recipient
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

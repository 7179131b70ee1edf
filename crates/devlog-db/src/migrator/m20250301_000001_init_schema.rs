//! Initial schema: users, teams, daily logs and notifications

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create users table
        // ============================================================
        // team_id carries no foreign key: teams.manager_id already points
        // back at users, and the cycle would block table creation.
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::FullName, 255).not_null())
                    .col(string_len(User::Role, 32).not_null().default("developer"))
                    .col(uuid_null(User::TeamId))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email")
                    .table(User::Table)
                    .col(User::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_team_id")
                    .table(User::Table)
                    .col(User::TeamId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create teams table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Team::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Team::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Team::Code)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Team::ManagerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Team::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teams_manager_id")
                            .from(Team::Table, Team::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_code")
                    .table(Team::Table)
                    .col(Team::Code)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. Create daily_logs table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(DailyLog::Table)
                    .if_not_exists()
                    .col(uuid(DailyLog::Id).primary_key())
                    .col(uuid(DailyLog::UserId).not_null())
                    .col(string_len(DailyLog::Date, 10).not_null())
                    .col(text(DailyLog::Tasks).not_null())
                    .col(integer(DailyLog::Hours).not_null())
                    .col(integer(DailyLog::Minutes).not_null())
                    .col(integer(DailyLog::Mood).not_null())
                    .col(text_null(DailyLog::Blockers))
                    .col(
                        string_len(DailyLog::ReviewStatus, 16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(text_null(DailyLog::ManagerFeedback))
                    .col(uuid_null(DailyLog::ReviewedBy))
                    .col(timestamp_with_time_zone_null(DailyLog::ReviewedAt))
                    .col(
                        timestamp_with_time_zone(DailyLog::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(DailyLog::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_daily_logs_user_id")
                            .from(DailyLog::Table, DailyLog::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_daily_logs_reviewed_by")
                            .from(DailyLog::Table, DailyLog::ReviewedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: several logs for the same day are allowed.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_daily_logs_user_id_date")
                    .table(DailyLog::Table)
                    .col(DailyLog::UserId)
                    .col(DailyLog::Date)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. Create notifications table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(uuid(Notification::Id).primary_key())
                    .col(uuid(Notification::UserId).not_null())
                    .col(string_len(Notification::Kind, 32).not_null())
                    .col(string_len(Notification::Title, 255).not_null())
                    .col(text(Notification::Message).not_null())
                    .col(boolean(Notification::Read).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Notification::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user_id")
                            .from(Notification::Table, Notification::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_notifications_user_id")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DailyLog::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Team::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Role,
    TeamId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Team {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    Name,
    Code,
    ManagerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DailyLog {
    #[sea_orm(iden = "daily_logs")]
    Table,
    Id,
    UserId,
    Date,
    Tasks,
    Hours,
    Minutes,
    Mood,
    Blockers,
    ReviewStatus,
    ManagerFeedback,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notification {
    #[sea_orm(iden = "notifications")]
    Table,
    Id,
    UserId,
    Kind,
    Title,
    Message,
    Read,
    CreatedAt,
}

//! Accounts and caller resolution

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use devlog_auth::{hash_password, verify_password};
use devlog_db::entities::{
    team,
    user::{self, UserRole},
};

use crate::error::{Error, Result};
use crate::teams::TeamService;
use crate::validation::{Registration, TeamChoice};

/// The authenticated user an operation runs as
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub team_id: Option<Uuid>,
}

impl Caller {
    pub fn is_manager(&self) -> bool {
        self.role == UserRole::Manager
    }

    pub fn require_manager(&self) -> Result<()> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(Error::forbidden("Only managers can perform this action"))
        }
    }

    /// The caller's team, `NotFound` when they have none
    pub fn require_team(&self) -> Result<Uuid> {
        self.team_id
            .ok_or_else(|| Error::not_found("You are not a member of any team"))
    }
}

impl From<user::Model> for Caller {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            team_id: user.team_id,
        }
    }
}

const BAD_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already registered";

/// A concurrent registration can slip past the lookup; the unique index on
/// `users.email` still rejects it
fn email_conflict(err: DbErr) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::validation("email", EMAIL_TAKEN),
        _ => Error::Database(err),
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create an account
    ///
    /// Managers get a freshly created team; developers with an invite code
    /// join that team. Everything happens in one transaction, so a bad code
    /// leaves no user behind.
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<(user::Model, Option<team::Model>)> {
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(&registration.email))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(Error::validation("email", EMAIL_TAKEN));
        }

        let password_hash = hash_password(&registration.password)?;

        let txn = self.db.begin().await?;

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(registration.email),
            password_hash: Set(password_hash),
            full_name: Set(registration.full_name),
            role: Set(registration.role),
            team_id: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(email_conflict)?;

        let (created, team) = match registration.team {
            TeamChoice::Create { name } => {
                let (manager, team) =
                    TeamService::create_team_for_manager(&txn, created, &name).await?;
                (manager, Some(team))
            }
            TeamChoice::Join { code } => {
                let team = TeamService::find_by_code(&txn, &code)
                    .await?
                    .ok_or_else(|| Error::not_found("Invalid team code"))?;
                let mut active: user::ActiveModel = created.into();
                active.team_id = Set(Some(team.id));
                (active.update(&txn).await?, Some(team))
            }
            TeamChoice::None => (created, None),
        };

        txn.commit().await?;

        info!(
            "Registered {} {} ({})",
            created.role.as_str(),
            created.id,
            created.email
        );
        Ok((created, team))
    }

    /// Check credentials; both failure modes share one message
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model> {
        let email = email.trim().to_lowercase();
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(&email))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::Unauthenticated(BAD_CREDENTIALS.to_string()))?;

        if !verify_password(password, &found.password_hash)? {
            debug!("Password mismatch for {}", email);
            return Err(Error::Unauthenticated(BAD_CREDENTIALS.to_string()));
        }

        info!("User {} logged in", found.id);
        Ok(found)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Map a session subject to its current user record
    pub async fn resolve_caller(&self, user_id: Uuid) -> Result<Caller> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(Caller::from)
            .ok_or_else(|| Error::Unauthenticated("User no longer exists".to_string()))
    }
}

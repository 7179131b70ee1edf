//! Team membership: invite codes, joining, leaving and removal

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use devlog_db::entities::{notification, team, user};

use crate::calendar;
use crate::error::{Error, Result};
use crate::reminder::ReminderService;
use crate::users::Caller;
use crate::validation::normalize_code;

const CODE_PREFIX: &str = "TEAM-";
const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 16;

/// Random invite code, `TEAM-` followed by six of `[A-Z0-9]`
pub fn generate_team_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

#[derive(Clone)]
pub struct TeamService {
    db: DatabaseConnection,
    reminders: ReminderService,
}

impl TeamService {
    pub fn new(db: DatabaseConnection, reminders: ReminderService) -> Self {
        Self { db, reminders }
    }

    /// Create a team owned by `manager` and bind the manager to it
    ///
    /// Runs on the given connection so registration can do it inside its
    /// own transaction.
    pub async fn create_team_for_manager<C>(
        conn: &C,
        manager: user::Model,
        team_name: &str,
    ) -> Result<(user::Model, team::Model)>
    where
        C: ConnectionTrait,
    {
        let code = Self::unused_code(conn).await?;

        let created = team::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(team_name.to_string()),
            code: Set(code),
            manager_id: Set(manager.id),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        let mut active: user::ActiveModel = manager.into();
        active.team_id = Set(Some(created.id));
        let manager = active.update(conn).await?;

        info!(
            "Created team {} '{}' ({}) for manager {}",
            created.id, created.name, created.code, manager.id
        );
        Ok((manager, created))
    }

    async fn unused_code<C>(conn: &C) -> Result<String>
    where
        C: ConnectionTrait,
    {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_team_code();
            if Self::find_by_code(conn, &code).await?.is_none() {
                return Ok(code);
            }
            debug!("Team code {} already taken, retrying", code);
        }

        Err(Error::Internal(
            "Could not generate a unique team code".to_string(),
        ))
    }

    /// Look up a team by an already normalized invite code
    pub async fn find_by_code<C>(conn: &C, code: &str) -> Result<Option<team::Model>>
    where
        C: ConnectionTrait,
    {
        let found = team::Entity::find()
            .filter(team::Column::Code.eq(code))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn join_team_by_code(&self, caller: &Caller, code: &str) -> Result<team::Model> {
        let code = normalize_code(Some(code))
            .ok_or_else(|| Error::validation("code", "Team code is required"))?;

        let team = Self::find_by_code(&self.db, &code)
            .await?
            .ok_or_else(|| Error::not_found("Invalid team code"))?;

        if caller.team_id == Some(team.id) {
            debug!("User {} already in team {}", caller.id, team.id);
            return Ok(team);
        }

        if caller.is_manager() {
            return Err(Error::forbidden(
                "Managers cannot join another team",
            ));
        }

        let member = self.load_user(caller.id).await?;
        if let Some(previous) = member.team_id {
            info!(
                "User {} leaves team {} to join team {}",
                caller.id, previous, team.id
            );
        }

        let mut active: user::ActiveModel = member.into();
        active.team_id = Set(Some(team.id));
        active.update(&self.db).await?;

        info!("User {} joined team {} ({})", caller.id, team.id, team.name);
        Ok(team)
    }

    pub async fn leave_team(&self, caller: &Caller) -> Result<()> {
        let team_id = caller.require_team()?;
        if caller.is_manager() {
            return Err(Error::validation(
                "team",
                "Managers cannot leave the team they manage",
            ));
        }

        let member = self.load_user(caller.id).await?;
        let mut active: user::ActiveModel = member.into();
        active.team_id = Set(None);
        active.update(&self.db).await?;

        info!("User {} left team {}", caller.id, team_id);
        Ok(())
    }

    pub async fn list_available_teams(&self) -> Result<Vec<team::Model>> {
        let teams = team::Entity::find()
            .order_by_asc(team::Column::Name)
            .all(&self.db)
            .await?;
        Ok(teams)
    }

    pub async fn get_own_team(&self, caller: &Caller) -> Result<team::Model> {
        let team_id = caller.require_team()?;
        team::Entity::find_by_id(team_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Team not found"))
    }

    pub async fn get_team_code(&self, caller: &Caller) -> Result<String> {
        caller.require_manager()?;
        Ok(self.get_own_team(caller).await?.code)
    }

    /// Every user whose team reference is `team_id`, by name
    pub async fn get_team_members(&self, team_id: Uuid) -> Result<Vec<user::Model>> {
        let members = user::Entity::find()
            .filter(user::Column::TeamId.eq(team_id))
            .order_by_asc(user::Column::FullName)
            .all(&self.db)
            .await?;
        Ok(members)
    }

    pub async fn own_team_members(&self, caller: &Caller) -> Result<Vec<user::Model>> {
        let team_id = caller.require_team()?;
        self.get_team_members(team_id).await
    }

    /// Members of a specific team; only its manager may look
    pub async fn members_of(&self, caller: &Caller, team_id: Uuid) -> Result<Vec<user::Model>> {
        caller.require_manager()?;
        if caller.team_id != Some(team_id) {
            return Err(Error::forbidden("You can only view your own team"));
        }
        self.get_team_members(team_id).await
    }

    /// Detach a member from the manager's team; the account stays
    pub async fn remove_member(&self, caller: &Caller, user_id: Uuid) -> Result<user::Model> {
        caller.require_manager()?;
        let team_id = caller.require_team()?;

        if user_id == caller.id {
            return Err(Error::validation(
                "user_id",
                "You cannot remove yourself from your own team",
            ));
        }

        let member = self.team_member(team_id, user_id).await?;
        let mut active: user::ActiveModel = member.into();
        active.team_id = Set(None);
        let member = active.update(&self.db).await?;

        info!(
            "Manager {} removed user {} from team {}",
            caller.id, member.id, team_id
        );
        Ok(member)
    }

    /// Nudge one member about today's log
    pub async fn remind_member(
        &self,
        caller: &Caller,
        user_id: Uuid,
    ) -> Result<notification::Model> {
        caller.require_manager()?;
        let team_id = caller.require_team()?;

        let member = self.team_member(team_id, user_id).await?;
        let today = calendar::today();

        info!(
            "Manager {} sends a reminder to {} for {}",
            caller.id, member.id, today
        );
        self.reminders.remind(&member, &today).await
    }

    async fn team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<user::Model> {
        match user::Entity::find_by_id(user_id).one(&self.db).await? {
            Some(member) if member.team_id == Some(team_id) => Ok(member),
            Some(_) => {
                warn!("User {} is not in team {}", user_id, team_id);
                Err(Error::not_found("Member not found in your team"))
            }
            None => Err(Error::not_found("Member not found in your team")),
        }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }
}

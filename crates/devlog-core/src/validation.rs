//! Input validation
//!
//! Raw request shapes are turned into validated commands before any
//! operation touches the store. Fields are checked in declaration order and
//! the first failure wins.

use devlog_auth::MIN_PASSWORD_LEN;
use devlog_db::entities::user::UserRole;

use crate::calendar::parse_day;
use crate::error::{Error, Result};

/// Daily log fields as submitted
#[derive(Debug, Clone, PartialEq)]
pub struct LogInput {
    pub date: String,
    pub tasks: String,
    pub hours: i64,
    pub minutes: i64,
    pub mood: i64,
    pub blockers: Option<String>,
}

/// Daily log fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct LogFields {
    pub date: String,
    pub tasks: String,
    pub hours: i32,
    pub minutes: i32,
    pub mood: i32,
    pub blockers: Option<String>,
}

impl LogInput {
    pub fn validate(self) -> Result<LogFields> {
        let date = self.date.trim().to_string();
        if parse_day(&date).is_none() {
            return Err(Error::validation(
                "date",
                "Date must be a valid calendar day in YYYY-MM-DD format",
            ));
        }

        let tasks = self.tasks.trim().to_string();
        if tasks.is_empty() {
            return Err(Error::validation("tasks", "Tasks are required"));
        }

        let hours = bounded("hours", self.hours, 0, 24)?;
        let minutes = bounded("minutes", self.minutes, 0, 59)?;
        let mood = bounded("mood", self.mood, 1, 5)?;

        let blockers = self
            .blockers
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        Ok(LogFields {
            date,
            tasks,
            hours,
            minutes,
            mood,
            blockers,
        })
    }
}

fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> Result<i32> {
    if (min..=max).contains(&value) {
        // Range check above keeps this lossless
        Ok(value as i32)
    } else {
        Err(Error::validation(
            field,
            format!("{} must be between {} and {}", capitalize(field), min, max),
        ))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Manager review as submitted
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub feedback: String,
    pub mark_reviewed: bool,
}

/// Validated review command
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCommand {
    pub feedback: String,
    pub mark_reviewed: bool,
}

impl ReviewInput {
    pub fn validate(self) -> Result<ReviewCommand> {
        let feedback = self.feedback.trim().to_string();
        if self.mark_reviewed && feedback.is_empty() {
            return Err(Error::validation(
                "feedback",
                "Feedback is required to mark a log as reviewed",
            ));
        }

        Ok(ReviewCommand {
            feedback,
            mark_reviewed: self.mark_reviewed,
        })
    }
}

/// Registration form as submitted
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub role: String,
    pub team_name: Option<String>,
    pub team_code: Option<String>,
}

/// What to do about team membership at registration
#[derive(Debug, Clone, PartialEq)]
pub enum TeamChoice {
    /// Managers always create a team
    Create { name: String },
    /// Developers may join one by invite code
    Join { code: String },
    None,
}

/// Validated registration
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub team: TeamChoice,
}

impl RegisterInput {
    pub fn validate(self) -> Result<Registration> {
        let email = self.email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(Error::validation("email", "Invalid email address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        if self.password != self.confirm_password {
            return Err(Error::validation(
                "confirm_password",
                "Passwords don't match",
            ));
        }

        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(Error::validation("full_name", "Full name is required"));
        }

        let role: UserRole = self
            .role
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| Error::validation("role", "Role must be developer or manager"))?;

        let team = match role {
            UserRole::Manager => {
                let name = self
                    .team_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("{}'s Team", full_name));
                TeamChoice::Create { name }
            }
            UserRole::Developer => match normalize_code(self.team_code.as_deref()) {
                Some(code) => TeamChoice::Join { code },
                None => TeamChoice::None,
            },
        };

        Ok(Registration {
            email,
            password: self.password,
            full_name,
            role,
            team,
        })
    }
}

/// Invite codes compare trimmed and upper-cased
pub fn normalize_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

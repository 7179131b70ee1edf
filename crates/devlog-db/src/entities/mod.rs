//! Database entities

pub mod daily_log;
pub mod notification;
pub mod team;
pub mod user;

pub use daily_log::Entity as DailyLog;
pub use notification::Entity as Notification;
pub use team::Entity as Team;
pub use user::Entity as User;

pub mod prelude {
    pub use super::daily_log::Entity as DailyLog;
    pub use super::notification::Entity as Notification;
    pub use super::team::Entity as Team;
    pub use super::user::Entity as User;
}

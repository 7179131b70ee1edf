//! Streaks and productivity reports over a user's log history

use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;
use uuid::Uuid;

use devlog_db::entities::daily_log;

use crate::calendar::{format_day, parse_day};
use crate::error::{Error, Result};

/// Consecutive days with at least one log, counting back from `today`
///
/// Several logs on one day count once; a day with no log ends the streak,
/// so without a log for `today` the streak is zero.
pub fn streak<'a, I>(dates: I, today: &str) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let logged: BTreeSet<&str> = dates.into_iter().collect();
    let Some(mut day) = parse_day(today) else {
        return 0;
    };

    let mut count = 0;
    while logged.contains(format_day(day).as_str()) {
        count += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    count
}

/// How often a blocker was mentioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockerCount {
    pub blocker: String,
    pub count: u32,
}

/// Totals and averages for a date range
#[derive(Debug, Clone, PartialEq)]
pub struct ProductivitySummary {
    pub start_date: String,
    pub end_date: String,
    pub total_logs: usize,
    pub days_logged: usize,
    pub calendar_days: i64,
    pub total_hours: f64,
    pub average_hours: f64,
    pub average_mood: f64,
    /// Logged days as a percentage of calendar days
    pub completion_rate: f64,
    /// Most frequent first, ties by name
    pub blockers: Vec<BlockerCount>,
}

impl ProductivitySummary {
    pub fn from_logs(logs: &[daily_log::Model], start: &str, end: &str) -> Self {
        let days_logged = logs
            .iter()
            .map(|l| l.date.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let calendar_days = match (parse_day(start), parse_day(end)) {
            (Some(s), Some(e)) if e >= s => (e - s).num_days() + 1,
            _ => 0,
        };

        let total_hours: f64 = logs
            .iter()
            .map(|l| f64::from(l.hours) + f64::from(l.minutes) / 60.0)
            .sum();

        let (average_hours, average_mood) = if logs.is_empty() {
            (0.0, 0.0)
        } else {
            let n = logs.len() as f64;
            let mood: f64 = logs.iter().map(|l| f64::from(l.mood)).sum();
            (total_hours / n, mood / n)
        };

        let completion_rate = if calendar_days > 0 {
            days_logged as f64 / calendar_days as f64 * 100.0
        } else {
            0.0
        };

        Self {
            start_date: start.to_string(),
            end_date: end.to_string(),
            total_logs: logs.len(),
            days_logged,
            calendar_days,
            total_hours,
            average_hours,
            average_mood,
            completion_rate,
            blockers: blocker_frequency(logs),
        }
    }
}

fn blocker_frequency(logs: &[daily_log::Model]) -> Vec<BlockerCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for blocker in logs
        .iter()
        .filter_map(|l| l.blockers.as_deref())
        .flat_map(|b| b.split(", "))
        .map(str::trim)
        .filter(|b| !b.is_empty())
    {
        *counts.entry(blocker).or_default() += 1;
    }

    let mut ranked: Vec<BlockerCount> = counts
        .into_iter()
        .map(|(blocker, count)| BlockerCount {
            blocker: blocker.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.blocker.cmp(&b.blocker)));
    ranked
}

#[derive(Clone)]
pub struct ReportService {
    db: DatabaseConnection,
}

impl ReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Logs with `start <= date <= end`, oldest first
    pub async fn productivity_in_range(
        &self,
        user_id: Uuid,
        start: &str,
        end: &str,
    ) -> Result<Vec<daily_log::Model>> {
        if parse_day(start).is_none() {
            return Err(Error::validation(
                "start_date",
                "Start date must be in YYYY-MM-DD format",
            ));
        }
        if parse_day(end).is_none() {
            return Err(Error::validation(
                "end_date",
                "End date must be in YYYY-MM-DD format",
            ));
        }

        let logs = daily_log::Entity::find()
            .filter(daily_log::Column::UserId.eq(user_id))
            .filter(daily_log::Column::Date.gte(start))
            .filter(daily_log::Column::Date.lte(end))
            .order_by_asc(daily_log::Column::Date)
            .order_by_asc(daily_log::Column::CreatedAt)
            .all(&self.db)
            .await?;

        debug!(
            "Loaded {} logs for user {} between {} and {}",
            logs.len(),
            user_id,
            start,
            end
        );
        Ok(logs)
    }

    pub async fn summary(
        &self,
        user_id: Uuid,
        start: &str,
        end: &str,
    ) -> Result<ProductivitySummary> {
        let logs = self.productivity_in_range(user_id, start, end).await?;
        Ok(ProductivitySummary::from_logs(&logs, start, end))
    }

    pub async fn current_streak(&self, user_id: Uuid, today: &str) -> Result<u32> {
        let dates: Vec<String> = daily_log::Entity::find()
            .select_only()
            .column(daily_log::Column::Date)
            .filter(daily_log::Column::UserId.eq(user_id))
            .filter(daily_log::Column::Date.lte(today))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(streak(dates.iter().map(String::as_str), today))
    }
}

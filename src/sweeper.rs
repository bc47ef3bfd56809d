//! Due-date sweeper
//!
//! Cron-scheduled admin job returning every unreturned entry whose due date
//! has been reached. Each return goes through the regular return transition,
//! so the frontend hears about it through book-returned.

use chrono::{NaiveDate, Utc};
use cron::Schedule;
use std::{str::FromStr, time::Duration};
use tokio::sync::watch;

use crate::{
    error::{AppError, AppResult},
    services::inventory::InventoryService,
};

const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Parse a crontab expression, evaluated in UTC.
///
/// Classic five-field expressions run at second 0 and number weekdays the
/// crontab way (0 or 7 is Sunday). Six and seven-field expressions are
/// handed to `cron` unchanged, with its own Sunday = 1 numbering.
pub fn parse_crontab(expr: &str) -> AppResult<Schedule> {
    let expr = expr.trim();
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = if let [minute, hour, day, month, weekday] = fields.as_slice() {
        let weekday = crontab_weekdays(weekday)
            .map_err(|e| AppError::Config(format!("Invalid sweeper crontab '{}': {}", expr, e)))?;
        format!("0 {} {} {} {} {}", minute, hour, day, month, weekday)
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized)
        .map_err(|e| AppError::Config(format!("Invalid sweeper crontab '{}': {}", expr, e)))
}

/// Rewrite numeric crontab weekdays as names, which `cron` reads unambiguously
fn crontab_weekdays(field: &str) -> Result<String, String> {
    let mut items = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        let range = match range.split_once('-') {
            // A range ending on Sunday-as-7 wraps past Saturday
            Some((start, "7")) if step.is_none() => match weekday_name(start)?.as_str() {
                "SUN" => "SUN-SAT".to_string(),
                start => format!("{}-SAT,SUN", start),
            },
            Some((start, end)) => format!("{}-{}", weekday_name(start)?, weekday_name(end)?),
            None => weekday_name(range)?,
        };
        items.push(match step {
            Some(step) => format!("{}/{}", range, step),
            None => range,
        });
    }
    Ok(items.join(","))
}

fn weekday_name(value: &str) -> Result<String, String> {
    if value == "*" || value == "?" || !value.chars().all(|c| c.is_ascii_digit()) {
        return Ok(value.to_string());
    }
    value
        .parse::<usize>()
        .ok()
        .and_then(|n| WEEKDAYS.get(n))
        .map(|name| name.to_string())
        .ok_or_else(|| format!("day of week {} is out of range 0-7", value))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub due: usize,
    pub returned: usize,
    pub failed: usize,
}

pub struct DueDateSweeper {
    inventory: InventoryService,
    schedule: Schedule,
}

impl DueDateSweeper {
    pub fn new(inventory: InventoryService, schedule: Schedule) -> Self {
        Self { inventory, schedule }
    }

    /// Return every entry due on or before `as_of`
    pub async fn sweep(&self, as_of: NaiveDate) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let due = match self.inventory.due_entries(as_of).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Sweeper could not list due entries: {}", e);
                return summary;
            }
        };
        summary.due = due.len();

        for entry in due {
            match self.inventory.return_entry(entry.id).await {
                Ok(_) => summary.returned += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Sweeper failed to return entry {}: {}", entry.id, e);
                }
            }
        }

        tracing::info!(
            due = summary.due,
            returned = summary.returned,
            failed = summary.failed,
            "Due-date sweep for {} complete",
            as_of
        );
        summary
    }

    /// Sweep on every scheduled firing until `shutdown` fires
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Due-date sweeper started");

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                tracing::warn!("Sweeper schedule has no upcoming firing");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!("Next due-date sweep at {}", next);

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            if *shutdown.borrow() {
                break;
            }
            self.sweep(Utc::now().date_naive()).await;
        }

        tracing::info!("Due-date sweeper stopped");
    }
}

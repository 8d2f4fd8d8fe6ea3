//! Decides which calendar days a push covers.
//!
//! All arithmetic is on local calendar dates (`NaiveDate`), never instants.

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use std::fmt;

/// Most days a single run will re-ingest. Older unsynced days are dropped.
pub const MAX_BACKFILL_DAYS: u32 = 7;

/// Why the planner picked its window; only used for operator messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanReason {
    FirstRun,
    Refresh,
    CatchUp,
    Capped { missed_days: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPlan {
    pub days_to_push: u32,
    pub reason: PlanReason,
}

impl SyncPlan {
    pub fn window(&self, today: NaiveDate) -> DateRange {
        DateRange::ending(today, self.days_to_push)
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            PlanReason::FirstRun => write!(f, "first run, pushing today"),
            PlanReason::Refresh => write!(f, "already synced today, refreshing today"),
            PlanReason::CatchUp => write!(f, "catching up {} day(s)", self.days_to_push),
            PlanReason::Capped { missed_days } => write!(
                f,
                "{} day(s) since last sync, pushing the most recent {}",
                missed_days, self.days_to_push
            ),
        }
    }
}

/// Plans a push from the last successful sync date.
pub fn plan(last_sync: Option<NaiveDate>, today: NaiveDate) -> SyncPlan {
    let Some(last_sync) = last_sync else {
        return SyncPlan {
            days_to_push: 1,
            reason: PlanReason::FirstRun,
        };
    };

    let missed_days = (today - last_sync).num_days();
    if missed_days <= 0 {
        // Same day, or a last-sync date from a skewed clock in the future.
        return SyncPlan {
            days_to_push: 1,
            reason: PlanReason::Refresh,
        };
    }

    if missed_days > i64::from(MAX_BACKFILL_DAYS) {
        SyncPlan {
            days_to_push: MAX_BACKFILL_DAYS,
            reason: PlanReason::Capped { missed_days },
        }
    } else {
        SyncPlan {
            days_to_push: missed_days as u32,
            reason: PlanReason::CatchUp,
        }
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The `days` most recent dates ending at `end` (at least one).
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}

/// How the operator asked for the window on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Planned,
    Date(NaiveDate),
    Days(u32),
}

/// Turns a window request into concrete dates, enforcing the backfill limit.
pub fn resolve_window(
    request: WindowRequest,
    last_sync: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange> {
    match request {
        WindowRequest::Planned => Ok(plan(last_sync, today).window(today)),
        WindowRequest::Days(days) => {
            if days == 0 || days > MAX_BACKFILL_DAYS {
                bail!(
                    "--days must be between 1 and {} (got {})",
                    MAX_BACKFILL_DAYS,
                    days
                );
            }
            Ok(DateRange::ending(today, days))
        }
        WindowRequest::Date(date) => {
            if date > today {
                bail!("--date {} is in the future", date);
            }
            let oldest = DateRange::ending(today, MAX_BACKFILL_DAYS).start;
            if date < oldest {
                bail!(
                    "--date {} is older than the {}-day backfill window (earliest {})",
                    date,
                    MAX_BACKFILL_DAYS,
                    oldest
                );
            }
            Ok(DateRange::single(date))
        }
    }
}

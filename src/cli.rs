use crate::commands::PushOptions;
use crate::sync_plan::{WindowRequest, MAX_BACKFILL_DAYS};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("USAGE_SYNC_GIT_SHA"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "usage-sync")]
#[command(about = "Push daily AI coding tool usage to your usage-sync profile")]
#[command(version = VERSION, disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Service base URL (overrides the saved session)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Without a subcommand: log in if needed, then push
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authorize this machine through the browser
    Login,
    /// Collect usage and submit it
    Push(PushArgs),
    /// Show login state and the next sync window
    Status,
}

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Push a single day (YYYY-MM-DD, within the last 7 days)
    #[arg(long, value_parser = parse_date, conflicts_with = "days")]
    pub date: Option<NaiveDate>,

    /// Push the last N days ending today (1-7)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_BACKFILL_DAYS)))]
    pub days: Option<u32>,

    /// Show what would be submitted without sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    pub fn into_options(self, api_url: Option<String>) -> PushOptions {
        let window = match (self.date, self.days) {
            (Some(date), _) => WindowRequest::Date(date),
            (None, Some(days)) => WindowRequest::Days(days),
            (None, None) => WindowRequest::Planned,
        };
        PushOptions {
            window,
            dry_run: self.dry_run,
            api_url,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

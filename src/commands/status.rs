use super::Context;
use crate::sync_plan::{plan, DateRange, SyncPlan};
use crate::token::peek_claims;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    LoggedOut,
    LoggedIn {
        username: String,
        api_url: String,
        last_push_date: Option<NaiveDate>,
        /// `None` when the token payload could not be read.
        token_expires_at: Option<DateTime<Utc>>,
        token_expired: bool,
        next_plan: SyncPlan,
        next_window: DateRange,
    },
}

pub fn status(ctx: &Context<'_>) -> Result<StatusReport> {
    let Some(session) = ctx.store.load()? else {
        return Ok(StatusReport::LoggedOut);
    };

    let token_expires_at = peek_claims(&session.token).and_then(|claims| claims.expires_at());
    let now = ctx.now.with_timezone(&Utc);
    let next_plan = plan(session.last_push_date, ctx.today());

    Ok(StatusReport::LoggedIn {
        username: session.display_name().to_string(),
        api_url: ctx.api_url(None, Some(&session)),
        last_push_date: session.last_push_date,
        token_expires_at,
        token_expired: token_expires_at.is_some_and(|exp| exp <= now),
        next_plan,
        next_window: next_plan.window(ctx.today()),
    })
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusReport::LoggedOut => {
                write!(f, "Not logged in. Run `usage-sync login` to connect.")
            }
            StatusReport::LoggedIn {
                username,
                api_url,
                last_push_date,
                token_expires_at,
                token_expired,
                next_plan,
                next_window,
            } => {
                writeln!(f, "Logged in as {}", username)?;
                writeln!(f, "  service:    {}", api_url)?;
                match last_push_date {
                    Some(date) => writeln!(f, "  last push:  {}", date)?,
                    None => writeln!(f, "  last push:  never")?,
                }
                match (token_expires_at, token_expired) {
                    (Some(exp), true) => writeln!(
                        f,
                        "  token:      expired {} (run `usage-sync login`)",
                        exp.format("%Y-%m-%d")
                    )?,
                    (Some(exp), false) => {
                        writeln!(f, "  token:      valid until {}", exp.format("%Y-%m-%d"))?
                    }
                    (None, _) => writeln!(f, "  token:      expiry unknown")?,
                }
                write!(f, "  next push:  {} ({})", next_window, next_plan)
            }
        }
    }
}

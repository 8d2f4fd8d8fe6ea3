//! Command entry points.
//!
//! Each command receives a [`Context`] holding every collaborator it may
//! touch, so the same code runs against the real filesystem, network and
//! subprocesses in `main` and against in-memory doubles in tests.

mod login;
mod push;
mod status;
mod sync;

pub use login::login;
pub use push::{push, PushOptions, PushOutcome};
pub use status::{status, StatusReport};
pub use sync::sync;

use crate::api_client::ServiceApi;
use crate::config::{normalize_api_url, Settings};
use crate::device_auth::{Browser, Clock};
use crate::session_store::{Session, SessionStore};
use crate::usage::runner::CommandRunner;
use crate::usage::UsageAdapter;
use chrono::{DateTime, Local, NaiveDate};

pub struct Context<'a> {
    pub settings: &'a Settings,
    pub store: &'a dyn SessionStore,
    pub api: &'a dyn ServiceApi,
    pub runner: &'a dyn CommandRunner,
    pub adapters: &'a [UsageAdapter],
    pub clock: &'a dyn Clock,
    pub browser: &'a dyn Browser,
    /// Wall-clock time of this invocation.
    pub now: DateTime<Local>,
}

impl Context<'_> {
    /// Local calendar date of this invocation.
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Flag beats saved session beats settings default.
    fn api_url(&self, flag: Option<&str>, session: Option<&Session>) -> String {
        flag.map(normalize_api_url)
            .filter(|url| !url.is_empty())
            .or_else(|| session.map(|s| normalize_api_url(&s.api_url)))
            .unwrap_or_else(|| self.settings.api_url.clone())
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;

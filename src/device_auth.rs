//! Browser-mediated device authorization.
//!
//! ```text
//! Idle ──► Requesting ──► AwaitingApproval ──► Approved
//!               │                │
//!               ▼                ├──► Expired
//!             Failed             └──► TimedOut
//! ```
//!
//! The whole wait shares one timeout budget measured on an injected [`Clock`],
//! so tests can run the loop without real sleeps. A failed poll is transient:
//! the loop keeps going until approval, expiry or the budget runs out.

use crate::api_client::{DeviceCheck, ServiceApi};
use std::io;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub trait Browser {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default handler.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut child = open_command(url).spawn()?;
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Launcher command for `url`; its output must not interleave with ours.
fn open_command(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut command = Command::new("open");
        command.arg(url);
        command
    };
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    };
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// Used when browser launching is disabled; the URL is still printed.
pub struct NoBrowser;

impl Browser for NoBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Requesting,
    AwaitingApproval {
        code: String,
        verify_url: String,
        started: Instant,
    },
    Approved {
        token: String,
        username: Option<String>,
    },
    Expired,
    TimedOut,
    Failed(String),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::Approved { .. }
                | AuthState::Expired
                | AuthState::TimedOut
                | AuthState::Failed(_)
        )
    }
}

pub struct DeviceAuthorization<'a> {
    api: &'a dyn ServiceApi,
    clock: &'a dyn Clock,
    browser: &'a dyn Browser,
    api_url: String,
    poll_interval: Duration,
    timeout: Duration,
    polls: u32,
}

impl<'a> DeviceAuthorization<'a> {
    pub fn new(
        api: &'a dyn ServiceApi,
        clock: &'a dyn Clock,
        browser: &'a dyn Browser,
        api_url: &str,
    ) -> Self {
        Self {
            api,
            clock,
            browser,
            api_url: api_url.to_string(),
            poll_interval: crate::config::POLL_INTERVAL,
            timeout: crate::config::LOGIN_TIMEOUT,
            polls: 0,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of `check` calls made so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Drives the machine from `Idle` to a terminal state.
    pub fn run(&mut self) -> AuthState {
        let mut state = AuthState::Idle;
        while !state.is_terminal() {
            state = self.step(state);
        }
        state
    }

    /// Performs one transition.
    pub fn step(&mut self, state: AuthState) -> AuthState {
        match state {
            AuthState::Idle => AuthState::Requesting,
            AuthState::Requesting => self.request_code(),
            AuthState::AwaitingApproval {
                code,
                verify_url,
                started,
            } => self.poll_once(code, verify_url, started),
            terminal => terminal,
        }
    }

    fn request_code(&mut self) -> AuthState {
        let grant = match self.api.begin_device_auth(&self.api_url) {
            Ok(grant) => grant,
            Err(e) => return AuthState::Failed(format!("Could not start login: {}", e)),
        };

        println!("Open this URL to approve the login:");
        println!();
        println!("  {}", grant.verify_url);
        println!();
        println!("Confirmation code: {}", grant.code);
        println!("Waiting for approval...");

        if let Err(e) = self.browser.open(&grant.verify_url) {
            tracing::debug!("Could not open browser: {}", e);
        }

        AuthState::AwaitingApproval {
            code: grant.code,
            verify_url: grant.verify_url,
            started: self.clock.now(),
        }
    }

    fn poll_once(&mut self, code: String, verify_url: String, started: Instant) -> AuthState {
        if self.clock.now().saturating_duration_since(started) > self.timeout {
            return AuthState::TimedOut;
        }

        self.clock.sleep(self.poll_interval);
        self.polls += 1;

        match self.api.check_device_auth(&self.api_url, &code) {
            Ok(DeviceCheck::Completed { token, username }) if !token.is_empty() => {
                AuthState::Approved {
                    token,
                    username: username.filter(|name| !name.is_empty()),
                }
            }
            Ok(DeviceCheck::Completed { .. }) => {
                tracing::warn!("Service reported approval without a token; still waiting");
                AuthState::AwaitingApproval {
                    code,
                    verify_url,
                    started,
                }
            }
            Ok(DeviceCheck::Expired) => AuthState::Expired,
            Ok(DeviceCheck::Pending) => AuthState::AwaitingApproval {
                code,
                verify_url,
                started,
            },
            Err(e) => {
                tracing::debug!("Poll {} failed, retrying: {}", self.polls, e);
                AuthState::AwaitingApproval {
                    code,
                    verify_url,
                    started,
                }
            }
        }
    }
}

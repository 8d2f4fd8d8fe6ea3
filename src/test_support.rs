//! Test doubles for the seams commands are built on.

use crate::api_client::{ApiError, DeviceCheck, DeviceGrant, ServiceApi, SubmitResponse};
use crate::device_auth::Clock;
use crate::merge::SubmitRequest;
use crate::session_store::{Session, SessionStore};
use crate::usage::runner::CommandRunner;
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Clock whose time only moves when something sleeps on it.
pub struct FakeClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }
}

/// Service double answering from scripted responses.
///
/// Once the check script runs out every further poll answers `Pending`.
pub struct ScriptedApi {
    begin: RefCell<Option<Result<DeviceGrant, ApiError>>>,
    checks: RefCell<VecDeque<Result<DeviceCheck, ApiError>>>,
    check_codes: RefCell<Vec<String>>,
    submit: RefCell<Option<Result<SubmitResponse, ApiError>>>,
    submissions: RefCell<Vec<(String, String, SubmitRequest)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            begin: RefCell::new(None),
            checks: RefCell::new(VecDeque::new()),
            check_codes: RefCell::new(Vec::new()),
            submit: RefCell::new(None),
            submissions: RefCell::new(Vec::new()),
        }
    }

    pub fn with_begin(self, result: Result<DeviceGrant, ApiError>) -> Self {
        *self.begin.borrow_mut() = Some(result);
        self
    }

    pub fn with_checks(self, checks: Vec<Result<DeviceCheck, ApiError>>) -> Self {
        self.checks.borrow_mut().extend(checks);
        self
    }

    pub fn with_submit(self, result: Result<SubmitResponse, ApiError>) -> Self {
        *self.submit.borrow_mut() = Some(result);
        self
    }

    pub fn check_codes(&self) -> Vec<String> {
        self.check_codes.borrow().clone()
    }

    /// `(api_url, token, request)` for every submission received.
    pub fn submissions(&self) -> Vec<(String, String, SubmitRequest)> {
        self.submissions.borrow().clone()
    }
}

impl ServiceApi for ScriptedApi {
    fn begin_device_auth(&self, _api_url: &str) -> Result<DeviceGrant, ApiError> {
        self.begin.borrow_mut().take().unwrap_or_else(|| {
            Ok(DeviceGrant {
                code: "ABCD-EFGH".to_string(),
                verify_url: "https://service.test/cli/verify?code=ABCD-EFGH".to_string(),
            })
        })
    }

    fn check_device_auth(&self, _api_url: &str, code: &str) -> Result<DeviceCheck, ApiError> {
        self.check_codes.borrow_mut().push(code.to_string());
        self.checks
            .borrow_mut()
            .pop_front()
            .unwrap_or(Ok(DeviceCheck::Pending))
    }

    fn submit_usage(
        &self,
        api_url: &str,
        token: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ApiError> {
        self.submissions.borrow_mut().push((
            api_url.to_string(),
            token.to_string(),
            request.clone(),
        ));
        self.submit.borrow_mut().take().unwrap_or_else(|| {
            Ok(SubmitResponse {
                results: Vec::new(),
            })
        })
    }
}

/// Session store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    session: RefCell<Option<Session>>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::default();
        *store.session.borrow_mut() = Some(session);
        store
    }

    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.borrow_mut() = Some(session.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Runner answering from a per-program script; unknown programs "are not installed".
pub struct ScriptedRunner {
    outputs: HashMap<String, Result<String, String>>,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_output(mut self, program: &str, stdout: &str) -> Self {
        self.outputs
            .insert(program.to_string(), Ok(stdout.to_string()));
        self
    }

    pub fn with_failure(mut self, program: &str, message: &str) -> Self {
        self.outputs
            .insert(program.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));
        match self.outputs.get(program) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(message)) => Err(anyhow!("{}", message)),
            None => Err(anyhow!("{} is not installed", program)),
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

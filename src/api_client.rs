//! HTTP client for the hosted service.
//!
//! Device-authorization calls are unauthenticated; everything else carries
//! `Authorization: Bearer <token>`. Non-2xx responses are mapped to
//! [`ApiError`] so commands can print an actionable message.

use crate::merge::SubmitRequest;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(15);

const BEGIN_PATH: &str = "/api/auth/cli/init";
const CHECK_PATH: &str = "/api/auth/cli/poll";
const SUBMIT_PATH: &str = "/api/usage/submit";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Your session is invalid or has expired. Run `usage-sync login` again.")]
    Unauthorized,
    #[error("The service does not recognize this request (HTTP 404). usage-sync may need an update.")]
    NotFound,
    #[error("{0}")]
    Server(String),
    #[error("Could not reach the service: {0}")]
    Transport(String),
    #[error("Unexpected response from the service: {0}")]
    Protocol(String),
}

/// Response of the `begin` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceGrant {
    pub code: String,
    pub verify_url: String,
}

/// Response of the `check` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeviceCheck {
    Pending,
    Expired,
    Completed {
        token: String,
        #[serde(default)]
        username: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResult {
    pub date: NaiveDate,
    #[serde(default)]
    pub usage_id: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub post_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub results: Vec<SubmitResult>,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Operations the CLI performs against the hosted service.
pub trait ServiceApi {
    fn begin_device_auth(&self, api_url: &str) -> Result<DeviceGrant, ApiError>;

    fn check_device_auth(&self, api_url: &str, code: &str) -> Result<DeviceCheck, ApiError>;

    fn submit_usage(
        &self,
        api_url: &str,
        token: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ApiError>;
}

pub struct HttpServiceClient {
    agent: ureq::Agent,
}

impl HttpServiceClient {
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(API_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let mut request = self
            .agent
            .post(url)
            .header("User-Agent", user_agent())
            .header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let sent = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .send(&body),
            None => request.send_empty(),
        };
        let mut response = sent.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {}", e)))?;

        check_status(status, &text)?;
        serde_json::from_str(&text).map_err(|e| ApiError::Protocol(e.to_string()))
    }
}

impl Default for HttpServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceApi for HttpServiceClient {
    fn begin_device_auth(&self, api_url: &str) -> Result<DeviceGrant, ApiError> {
        self.post(&endpoint(api_url, BEGIN_PATH), None, None)
    }

    fn check_device_auth(&self, api_url: &str, code: &str) -> Result<DeviceCheck, ApiError> {
        let body = serde_json::to_string(&CheckRequest { code })
            .map_err(|e| ApiError::Protocol(e.to_string()))?;
        self.post(&endpoint(api_url, CHECK_PATH), None, Some(body))
    }

    fn submit_usage(
        &self,
        api_url: &str,
        token: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ApiError> {
        let body =
            serde_json::to_string(request).map_err(|e| ApiError::Protocol(e.to_string()))?;
        self.post(&endpoint(api_url, SUBMIT_PATH), Some(token), Some(body))
    }
}

fn endpoint(api_url: &str, path: &str) -> String {
    format!("{}{}", api_url.trim_end_matches('/'), path)
}

fn user_agent() -> String {
    format!("usage-sync/{}", env!("CARGO_PKG_VERSION"))
}

/// Maps a response status to an error, using the server's `{error}` message when present.
pub fn check_status(status: u16, body: &str) -> Result<(), ApiError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound),
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .map(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status));
            Err(ApiError::Server(message))
        }
    }
}

//! Runtime settings resolved from the environment.

use std::env;
use std::time::Duration;

/// Hosted service used when neither the session nor a flag names one.
pub const DEFAULT_API_URL: &str = "https://usage-sync.dev";

/// Interval between device-code status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Overall budget for browser approval during login.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    /// Command line for the Claude usage tool (program followed by leading args).
    pub ccusage_command: Vec<String>,
    /// Command line for the Codex usage tool.
    pub codex_command: Vec<String>,
    pub tool_timeout: Duration,
    pub max_output_bytes: usize,
    pub poll_interval: Duration,
    pub login_timeout: Duration,
    pub open_browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ccusage_command: vec!["ccusage".to_string()],
            codex_command: vec!["ccusage-codex".to_string()],
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            poll_interval: POLL_INTERVAL,
            login_timeout: LOGIN_TIMEOUT,
            open_browser: true,
        }
    }
}

impl Settings {
    /// Builds settings from `USAGE_SYNC_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env_string("USAGE_SYNC_API_URL")
                .map(|url| normalize_api_url(&url))
                .unwrap_or(defaults.api_url),
            ccusage_command: env_command("USAGE_SYNC_CCUSAGE_CMD")
                .unwrap_or(defaults.ccusage_command),
            codex_command: env_command("USAGE_SYNC_CODEX_CMD").unwrap_or(defaults.codex_command),
            tool_timeout: env_parse::<u64>("USAGE_SYNC_TOOL_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.tool_timeout),
            max_output_bytes: env_parse::<usize>("USAGE_SYNC_MAX_OUTPUT_BYTES")
                .filter(|bytes| *bytes > 0)
                .unwrap_or(defaults.max_output_bytes),
            poll_interval: defaults.poll_interval,
            login_timeout: defaults.login_timeout,
            open_browser: !env_flag("USAGE_SYNC_NO_BROWSER"),
        }
    }
}

/// Strips trailing slashes so endpoint paths can be appended directly.
pub fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn env_command(key: &str) -> Option<Vec<String>> {
    env_string(key).map(|v| v.split_whitespace().map(String::from).collect())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

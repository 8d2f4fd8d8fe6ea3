//! Field tables for the JSON reports of each usage tool.
//!
//! Both tools emit `{"daily": [row, ...]}` but disagree on field names and
//! shapes. Each list is tried in order; the first field present wins.

/// How a tool expects `--since`/`--until` dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateArgStyle {
    /// `20260314`
    Compact,
    /// `2026-03-14`
    Iso,
}

impl DateArgStyle {
    pub fn format(&self) -> &'static str {
        match self {
            DateArgStyle::Compact => "%Y%m%d",
            DateArgStyle::Iso => "%Y-%m-%d",
        }
    }
}

#[derive(Debug)]
pub struct Dialect {
    pub rows_key: &'static str,
    pub date_fields: &'static [&'static str],
    /// Either an array of model ids or an object keyed by model id.
    pub model_fields: &'static [&'static str],
    pub cost_fields: &'static [&'static str],
    pub input_fields: &'static [&'static str],
    pub output_fields: &'static [&'static str],
    pub cache_creation_fields: &'static [&'static str],
    pub cache_read_fields: &'static [&'static str],
    pub total_fields: &'static [&'static str],
    pub date_args: DateArgStyle,
}

/// `ccusage daily --json`
pub const CLAUDE_DIALECT: Dialect = Dialect {
    rows_key: "daily",
    date_fields: &["date"],
    model_fields: &["modelsUsed", "models"],
    cost_fields: &["totalCost", "costUSD"],
    input_fields: &["inputTokens"],
    output_fields: &["outputTokens"],
    cache_creation_fields: &["cacheCreationTokens", "cacheCreationInputTokens"],
    cache_read_fields: &["cacheReadTokens", "cacheReadInputTokens"],
    total_fields: &["totalTokens"],
    date_args: DateArgStyle::Compact,
};

/// `ccusage-codex daily --json`
pub const CODEX_DIALECT: Dialect = Dialect {
    rows_key: "daily",
    date_fields: &["date"],
    model_fields: &["models", "modelsUsed"],
    cost_fields: &["costUSD", "totalCost"],
    input_fields: &["inputTokens"],
    output_fields: &["outputTokens"],
    cache_creation_fields: &["cacheCreationTokens", "cacheCreationInputTokens"],
    cache_read_fields: &["cachedInputTokens", "cacheReadTokens"],
    total_fields: &["totalTokens"],
    date_args: DateArgStyle::Iso,
};

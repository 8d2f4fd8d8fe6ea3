//! Usage source adapters.
//!
//! Every source goes through the same pipeline: build the command line for
//! the requested window, run the tool, parse its report with the source's
//! [`Dialect`], and keep the entries that fall inside the window. A tool that
//! is missing, hangs or prints garbage contributes no entries; it never fails
//! the push.

pub mod dialect;
pub mod parser;
pub mod runner;

use crate::config::Settings;
use crate::sync_plan::DateRange;
use chrono::NaiveDate;
use dialect::{Dialect, CLAUDE_DIALECT, CODEX_DIALECT};
use runner::CommandRunner;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Claude,
    Codex,
}

impl UsageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageSource::Claude => "claude",
            UsageSource::Codex => "codex",
        }
    }
}

impl fmt::Display for UsageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of usage from one source, in the shape the service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalUsageEntry {
    pub date: NaiveDate,
    pub models: Vec<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
}

/// What one adapter produced for a window.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOutput {
    pub source: UsageSource,
    pub entries: Vec<CanonicalUsageEntry>,
}

pub struct UsageAdapter {
    source: UsageSource,
    command: Vec<String>,
    dialect: &'static Dialect,
}

impl UsageAdapter {
    pub fn new(source: UsageSource, command: Vec<String>, dialect: &'static Dialect) -> Self {
        Self {
            source,
            command,
            dialect,
        }
    }

    pub fn claude(settings: &Settings) -> Self {
        Self::new(
            UsageSource::Claude,
            settings.ccusage_command.clone(),
            &CLAUDE_DIALECT,
        )
    }

    pub fn codex(settings: &Settings) -> Self {
        Self::new(
            UsageSource::Codex,
            settings.codex_command.clone(),
            &CODEX_DIALECT,
        )
    }

    /// Both supported sources, in submission order.
    pub fn all(settings: &Settings) -> Vec<Self> {
        vec![Self::claude(settings), Self::codex(settings)]
    }

    pub fn source(&self) -> UsageSource {
        self.source
    }

    /// Arguments after the program name, including any configured prefix.
    pub fn command_args(&self, range: &DateRange) -> Vec<String> {
        let format = self.dialect.date_args.format();
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        args.extend([
            "daily".to_string(),
            "--json".to_string(),
            "--since".to_string(),
            range.start.format(format).to_string(),
            "--until".to_string(),
            range.end.format(format).to_string(),
        ]);
        args
    }

    /// Runs the tool for `range`. Never fails; problems yield no entries.
    pub fn collect(&self, runner: &dyn CommandRunner, range: &DateRange) -> AdapterOutput {
        let Some(program) = self.command.first() else {
            tracing::warn!("No command configured for {} usage", self.source);
            return self.empty();
        };

        let raw = match runner.run(program, &self.command_args(range)) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Skipping {} usage: {:#}", self.source, e);
                return self.empty();
            }
        };

        let parsed = parser::parse_report(&raw, self.dialect);
        let parsed_count = parsed.len();
        let entries: Vec<CanonicalUsageEntry> = parsed
            .into_iter()
            .filter(|entry| range.contains(entry.date))
            .collect();
        tracing::debug!(
            "{}: {} bytes, {} entries parsed, {} inside {}",
            self.source,
            raw.len(),
            parsed_count,
            entries.len(),
            range
        );
        if parsed_count == 0 && !raw.trim().is_empty() {
            tracing::debug!(
                "{} report had no usable rows: {}",
                self.source,
                output_preview(&raw)
            );
        }

        AdapterOutput {
            source: self.source,
            entries,
        }
    }

    fn empty(&self) -> AdapterOutput {
        AdapterOutput {
            source: self.source,
            entries: Vec::new(),
        }
    }
}

const PREVIEW_CHARS: usize = 200;

/// First characters of a tool report, for diagnostics.
fn output_preview(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    if trimmed.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}

/// Runs every adapter in order, one subprocess at a time.
pub fn collect_all(
    adapters: &[UsageAdapter],
    runner: &dyn CommandRunner,
    range: &DateRange,
) -> Vec<AdapterOutput> {
    adapters
        .iter()
        .map(|adapter| adapter.collect(runner, range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_command_args_use_each_tools_date_style() {
        let settings = Settings::default();
        let range = DateRange {
            start: day(8),
            end: day(14),
        };

        assert_eq!(
            UsageAdapter::claude(&settings).command_args(&range),
            vec!["daily", "--json", "--since", "20260308", "--until", "20260314"]
        );
        assert_eq!(
            UsageAdapter::codex(&settings).command_args(&range),
            vec!["daily", "--json", "--since", "2026-03-08", "--until", "2026-03-14"]
        );
    }

    #[test]
    fn test_command_prefix_is_kept() {
        let adapter = UsageAdapter::new(
            UsageSource::Claude,
            vec!["npx".to_string(), "ccusage@latest".to_string()],
            &CLAUDE_DIALECT,
        );
        let args = adapter.command_args(&DateRange::single(day(14)));
        assert_eq!(args[0], "ccusage@latest");
        assert_eq!(args[1], "daily");
    }

    #[test]
    fn test_collect_parses_and_filters_to_window() {
        let runner = ScriptedRunner::new().with_output(
            "ccusage",
            r#"{"daily":[
                {"date":"2026-03-01","totalCost":9},
                {"date":"2026-03-14","totalCost":1}
            ]}"#,
        );
        let adapter = UsageAdapter::claude(&Settings::default());
        let output = adapter.collect(&runner, &DateRange::single(day(14)));

        assert_eq!(output.source, UsageSource::Claude);
        assert_eq!(output.entries.len(), 1);
        assert_eq!(output.entries[0].date, day(14));
        assert_eq!(runner.calls()[0].0, "ccusage");
    }

    #[test]
    fn test_failing_subprocess_yields_no_entries() {
        let runner = ScriptedRunner::new().with_failure("ccusage-codex", "ccusage-codex is not installed");
        let adapter = UsageAdapter::codex(&Settings::default());
        let output = adapter.collect(&runner, &DateRange::single(day(14)));

        assert!(output.entries.is_empty());
    }

    #[test]
    fn test_output_preview_is_bounded() {
        assert_eq!(output_preview("  {\"daily\": [oops\n"), "{\"daily\": [oops");

        let long = "x".repeat(PREVIEW_CHARS + 50);
        let preview = output_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));

        let multibyte = "é".repeat(PREVIEW_CHARS);
        assert_eq!(output_preview(&multibyte), multibyte);
    }

    #[test]
    fn test_malformed_output_yields_no_entries() {
        let runner = ScriptedRunner::new().with_output("ccusage", "{\"daily\": [oops");
        let output =
            UsageAdapter::claude(&Settings::default()).collect(&runner, &DateRange::single(day(14)));
        assert!(output.entries.is_empty());
    }

    #[test]
    fn test_empty_command_yields_no_entries() {
        let runner = ScriptedRunner::new();
        let adapter = UsageAdapter::new(UsageSource::Codex, Vec::new(), &CODEX_DIALECT);
        assert!(adapter
            .collect(&runner, &DateRange::single(day(14)))
            .entries
            .is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_collect_all_keeps_going_after_a_failure() {
        let runner = ScriptedRunner::new()
            .with_failure("ccusage", "boom")
            .with_output(
                "ccusage-codex",
                r#"{"daily":[{"date":"2026-03-14","costUSD":0.5,"models":{"gpt-5":{}}}]}"#,
            );
        let outputs = collect_all(
            &UsageAdapter::all(&Settings::default()),
            &runner,
            &DateRange::single(day(14)),
        );

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].entries.is_empty());
        assert_eq!(outputs[1].entries.len(), 1);
        assert_eq!(outputs[1].source, UsageSource::Codex);
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UsageSource::Codex).unwrap(),
            "\"codex\""
        );
        assert_eq!(UsageSource::Claude.to_string(), "claude");
    }
}

use super::Context;
use crate::api_client::SubmitResponse;
use crate::merge::{build_submission, SubmitRequest};
use crate::session_store::Session;
use crate::sync_plan::{plan, resolve_window, DateRange, WindowRequest};
use crate::usage::collect_all;
use anyhow::{Context as _, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOptions {
    pub window: WindowRequest,
    pub dry_run: bool,
    pub api_url: Option<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            window: WindowRequest::Planned,
            dry_run: false,
            api_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// No source reported usage inside the window.
    NoData { range: DateRange },
    DryRun {
        range: DateRange,
        request: SubmitRequest,
    },
    Submitted {
        range: DateRange,
        response: SubmitResponse,
    },
}

/// Collects usage for the resolved window and submits it.
///
/// The session's `last_push_date` only moves after the service accepted the
/// submission.
pub fn push(ctx: &Context<'_>, options: &PushOptions) -> Result<PushOutcome> {
    let session = ctx
        .store
        .load()?
        .context("Not logged in. Run `usage-sync login` first.")?;
    let api_url = ctx.api_url(options.api_url.as_deref(), Some(&session));
    let today = ctx.today();

    if options.window == WindowRequest::Planned {
        println!("Sync plan: {}.", plan(session.last_push_date, today));
    }
    let range = resolve_window(options.window, session.last_push_date, today)?;
    println!("Collecting usage for {}...", range);

    let outputs = collect_all(ctx.adapters, ctx.runner, &range);
    let request = build_submission(&outputs, &range)?;
    if request.is_empty() {
        println!("No usage found for {}.", range);
        return Ok(PushOutcome::NoData { range });
    }

    print_summary(&request);

    if options.dry_run {
        println!(
            "Dry run: nothing submitted (payload hash {}).",
            short_hash(&request.hash)
        );
        return Ok(PushOutcome::DryRun { range, request });
    }

    let response = ctx
        .api
        .submit_usage(&api_url, &session.token, &request)
        .context("Failed to submit usage")?;

    for result in &response.results {
        match &result.post_url {
            Some(url) => println!("  {} -> {}", result.date, url),
            None => println!("  {} submitted", result.date),
        }
    }

    let last_push_date = session
        .last_push_date
        .map_or(range.end, |previous| previous.max(range.end));
    let updated = Session {
        last_push_date: Some(last_push_date),
        ..session
    };
    ctx.store
        .save(&updated)
        .context("Usage was submitted but the sync date could not be saved")?;

    println!(
        "Pushed {} entr{} for {}.",
        request.entries.len(),
        if request.entries.len() == 1 { "y" } else { "ies" },
        range
    );
    Ok(PushOutcome::Submitted { range, response })
}

fn print_summary(request: &SubmitRequest) {
    for entry in &request.entries {
        println!(
            "  {}  {:<6}  {:>12} tokens  ${:.2}  {}",
            entry.date,
            entry.source.as_str(),
            entry.data.total_tokens,
            entry.data.cost_usd,
            entry.data.models.join(", ")
        );
    }
    println!(
        "  total: {} tokens, ${:.2} across {} day(s)",
        request.total_tokens(),
        request.total_cost(),
        request.dates().len()
    );
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

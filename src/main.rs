use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use usage_sync::api_client::HttpServiceClient;
use usage_sync::cli::{Cli, Commands};
use usage_sync::commands::{self, Context};
use usage_sync::config::Settings;
use usage_sync::device_auth::{Browser, NoBrowser, SystemBrowser, SystemClock};
use usage_sync::logging;
use usage_sync::session_store::FileSessionStore;
use usage_sync::usage::runner::ProcessRunner;
use usage_sync::usage::UsageAdapter;

fn main() -> ExitCode {
    logging::init_subscriber(logging::DEFAULT_LEVEL);

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env();
    let store = FileSessionStore::at_default_location()?;
    tracing::debug!("Session file: {}", store.path().display());

    let api = HttpServiceClient::new();
    let runner = ProcessRunner::new(settings.tool_timeout, settings.max_output_bytes);
    let adapters = UsageAdapter::all(&settings);
    let browser: Box<dyn Browser> = if settings.open_browser {
        Box::new(SystemBrowser)
    } else {
        Box::new(NoBrowser)
    };

    let ctx = Context {
        settings: &settings,
        store: &store,
        api: &api,
        runner: &runner,
        adapters: &adapters,
        clock: &SystemClock,
        browser: browser.as_ref(),
        now: Local::now(),
    };

    let api_url = cli.api_url.as_deref();
    match cli.command {
        None => commands::sync(&ctx, api_url),
        Some(Commands::Login) => commands::login(&ctx, api_url).map(|_| ()),
        Some(Commands::Push(args)) => {
            commands::push(&ctx, &args.into_options(cli.api_url.clone())).map(|_| ())
        }
        Some(Commands::Status) => {
            println!("{}", commands::status(&ctx)?);
            Ok(())
        }
    }
}

use super::Context;
use crate::device_auth::{AuthState, DeviceAuthorization};
use crate::session_store::Session;
use anyhow::{bail, Context as _, Result};

/// Runs the device-authorization handshake and saves the new session.
///
/// Nothing is written unless the handshake ends in `Approved`.
pub fn login(ctx: &Context<'_>, api_url_flag: Option<&str>) -> Result<Session> {
    let existing = ctx.store.load()?;
    let api_url = ctx.api_url(api_url_flag, existing.as_ref());
    tracing::info!("Starting device login against {}", api_url);

    let mut flow = DeviceAuthorization::new(ctx.api, ctx.clock, ctx.browser, &api_url)
        .with_poll_interval(ctx.settings.poll_interval)
        .with_timeout(ctx.settings.login_timeout);

    match flow.run() {
        AuthState::Approved { token, username } => {
            let session = Session {
                token,
                username: username.unwrap_or_default(),
                api_url,
                last_push_date: None,
            };
            ctx.store
                .save(&session)
                .context("Failed to save login session")?;
            println!("Logged in as {}.", session.display_name());
            Ok(session)
        }
        AuthState::Expired => {
            bail!("The login code expired before it was approved. Run `usage-sync login` again.")
        }
        AuthState::TimedOut => bail!(
            "Timed out after {} minutes waiting for approval. Run `usage-sync login` again.",
            ctx.settings.login_timeout.as_secs() / 60
        ),
        AuthState::Failed(message) => bail!(message),
        other => bail!("Login stopped in unexpected state {:?}", other),
    }
}

use super::{login, push, Context, PushOptions};
use crate::token::peek_claims;
use anyhow::Result;
use chrono::Utc;

/// Bare invocation: log in when needed, then push the planned window.
pub fn sync(ctx: &Context<'_>, api_url_flag: Option<&str>) -> Result<()> {
    let session = ctx.store.load()?;
    let needs_login = match &session {
        None => {
            println!("Not logged in yet, starting login.");
            true
        }
        Some(session) => {
            let now = ctx.now.with_timezone(&Utc).timestamp();
            let expired = peek_claims(&session.token).is_some_and(|claims| claims.exp <= now);
            if expired {
                println!("Your session has expired, logging in again.");
            }
            expired
        }
    };

    if needs_login {
        login(ctx, api_url_flag)?;
    }

    push(
        ctx,
        &PushOptions {
            api_url: api_url_flag.map(String::from),
            ..PushOptions::default()
        },
    )?;
    Ok(())
}

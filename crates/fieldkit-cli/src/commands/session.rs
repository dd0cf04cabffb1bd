use chrono::Utc;

use fieldkit_core::models::SessionId;

use crate::commands::common::{format_relative_time, parse_id, short_id, AppContext};
use crate::error::CliError;

pub async fn run_start(
    ctx: &AppContext,
    review_id: &str,
    user_id: &str,
    device: &str,
) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let session = store.start_session(review_id, user_id, device).await?;
    println!("{}", session.id);
    Ok(())
}

pub async fn run_end(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let session_id: SessionId = parse_id(id)?;
    let store = ctx.open_store().await?;
    let session = store.close_session(&session_id).await?;
    println!("{}", session.id);
    Ok(())
}

pub async fn run_list(ctx: &AppContext, review_id: &str, as_json: bool) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let sessions = store.list_sessions(review_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions for review {review_id}.");
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for session in &sessions {
        let id = short_id(&session.id.as_str());
        let state = if session.is_open() { "open" } else { "closed" };
        let synced = if session.synced_at.is_some() {
            "synced"
        } else {
            "pending"
        };
        println!(
            "{id:<13}  {:<16}  {state:<6}  {synced:<7}  started {}",
            session.user_id.chars().take(16).collect::<String>(),
            format_relative_time(session.started_at, now_ms),
        );
    }
    Ok(())
}

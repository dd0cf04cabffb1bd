use chrono::Utc;

use fieldkit_core::cache::CHECKLIST_TEMPLATE_KEY;
use fieldkit_core::models::{ChecklistItem, ChecklistItemId, ChecklistPhase, SyncAction};

use crate::commands::common::{
    format_relative_time, parse_id, parse_template_lines, short_id, AppContext,
};
use crate::error::CliError;

pub async fn run_init(ctx: &AppContext, review_id: &str) -> Result<(), CliError> {
    let cache = ctx.cache_manager()?;
    let body = cache
        .read_cached(review_id, CHECKLIST_TEMPLATE_KEY)
        .await?
        .ok_or_else(|| CliError::NoCachedTemplate(review_id.to_string()))?;
    let lines = parse_template_lines(review_id, &body)?;

    let store = ctx.open_store().await?;
    let items = store.initialize_checklist(review_id, &lines).await?;
    println!(
        "Initialized {} checklist items for review {review_id}",
        items.len()
    );
    Ok(())
}

pub async fn run_complete(
    ctx: &AppContext,
    id: &str,
    user: &str,
    notes: Option<&str>,
) -> Result<(), CliError> {
    let item_id: ChecklistItemId = parse_id(id)?;
    let store = ctx.open_store().await?;

    let mut item = store
        .get_checklist_item(&item_id)
        .await?
        .ok_or_else(|| CliError::InvalidId(id.to_string()))?;
    item.complete(user);
    if let Some(notes) = notes {
        item.annotate(notes);
    }

    store.save_checklist_item(&item, SyncAction::Update).await?;
    println!("{}", item.id);
    Ok(())
}

pub async fn run_annotate(ctx: &AppContext, id: &str, notes: &str) -> Result<(), CliError> {
    let item_id: ChecklistItemId = parse_id(id)?;
    let store = ctx.open_store().await?;

    let mut item = store
        .get_checklist_item(&item_id)
        .await?
        .ok_or_else(|| CliError::InvalidId(id.to_string()))?;
    item.annotate(notes);

    store.save_checklist_item(&item, SyncAction::Update).await?;
    println!("{}", item.id);
    Ok(())
}

pub async fn run_list(
    ctx: &AppContext,
    review_id: &str,
    phase: Option<ChecklistPhase>,
    as_json: bool,
) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let items = store.list_checklist_items(review_id, phase).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No checklist items for review {review_id}.");
        return Ok(());
    }

    for line in format_item_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

fn format_item_lines(items: &[ChecklistItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let check = if item.completed { "[x]" } else { "[ ]" };
            let id = short_id(&item.id.as_str());
            let relative_time = format_relative_time(item.updated_at, now_ms);
            format!(
                "{check} {id:<13}  {:<10}  {:<40}  {:<8}  {relative_time}",
                item.phase,
                item.title.chars().take(40).collect::<String>(),
                item.sync_status,
            )
        })
        .collect()
}

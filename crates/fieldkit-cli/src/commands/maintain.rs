//! Storage, cache, export, and preflight maintenance commands.

use std::path::Path;
use std::sync::Arc;

use fieldkit_core::preflight::{PreflightRunner, UnknownPermissionProbe};
use fieldkit_core::storage::{render_export, suggested_export_file_name};
use fieldkit_core::util::unix_timestamp_ms;

use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_cache(ctx: &AppContext, review_id: &str) -> Result<(), CliError> {
    let cache = ctx.cache_manager()?;
    let stored = cache.cache_review_for_offline(review_id).await?;
    if stored == 0 {
        println!(
            "No reference data could be fetched for review {review_id}; is the backend reachable?"
        );
    } else {
        println!("Cached {stored} reference entries for review {review_id}");
    }
    Ok(())
}

pub async fn run_cached(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let cache = ctx.cache_manager()?;
    let reviews = cache.cached_reviews().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&reviews)?);
        return Ok(());
    }

    if reviews.is_empty() {
        println!("No reviews cached for offline use.");
        return Ok(());
    }
    for review in reviews {
        println!("{review}");
    }
    Ok(())
}

pub async fn run_uncache(ctx: &AppContext, review_id: &str) -> Result<(), CliError> {
    let cache = ctx.cache_manager()?;
    cache.clear_review_cache(review_id).await?;
    println!("Evicted cached data for review {review_id}");
    Ok(())
}

pub async fn run_cleanup(ctx: &AppContext, older_than_days: u32) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let storage = ctx.storage_manager(store);
    let deleted = storage.clear_old_synced_data(older_than_days).await?;
    println!("Deleted {deleted} synced records older than {older_than_days} days");
    Ok(())
}

pub async fn run_export(
    ctx: &AppContext,
    review_id: &str,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let storage = ctx.storage_manager(store);
    let export = storage.export_review_data(review_id).await?;
    let rendered = render_export(&export)?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(review_id, unix_timestamp_ms()))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}

pub async fn run_preflight(ctx: &AppContext, review_id: &str) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let storage = ctx.storage_manager(store.clone());
    let cache = Arc::new(ctx.cache_manager()?);
    let runner = PreflightRunner::new(store, storage, cache, Arc::new(UnknownPermissionProbe));

    let report = runner
        .run(review_id, |check| {
            println!("[{}] {}: {}", check.outcome, check.name, check.detail);
        })
        .await?;

    if report.ready {
        println!("Ready to go offline.");
    } else {
        println!("NOT ready to go offline; fix the failed checks above.");
        std::process::exit(1);
    }
    Ok(())
}

use chrono::Utc;

use fieldkit_core::media::{attach_thumbnail, ThumbnailSpec};
use fieldkit_core::models::{
    ChecklistItemId, EvidenceId, EvidenceKind, FieldEvidence, GpsFix, SyncAction,
    MAX_UPLOAD_BYTES,
};

use crate::cli::EvidenceAddArgs;
use crate::commands::common::{
    format_relative_time, format_size, guess_mime, parse_id, short_id, AppContext,
};
use crate::error::CliError;

pub async fn run_add(ctx: &AppContext, args: &EvidenceAddArgs) -> Result<(), CliError> {
    let item_id: ChecklistItemId = parse_id(&args.item)?;
    let data = std::fs::read(&args.file)?;

    let mime_type = match args.mime.as_deref() {
        Some(mime) => mime.to_string(),
        None => guess_mime(&args.file)
            .ok_or_else(|| CliError::UnknownMimeType(args.file.display().to_string()))?
            .to_string(),
    };
    let kind = args
        .kind
        .map_or_else(|| kind_for_mime(&mime_type), EvidenceKind::from);
    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evidence.bin".to_string());

    let mut evidence = FieldEvidence::new(
        item_id,
        args.review.as_str(),
        kind,
        mime_type,
        file_name,
        data,
    )?;
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        evidence = evidence.with_gps(GpsFix {
            latitude,
            longitude,
            accuracy: args.accuracy,
        });
    }

    if evidence.oversized() {
        eprintln!(
            "Warning: {} is {}, above the {} upload limit; the record will be kept locally but its sync will fail",
            evidence.file_name,
            format_size(evidence.file_size),
            format_size(MAX_UPLOAD_BYTES)
        );
    }

    if kind == EvidenceKind::Photo && !args.no_thumbnail {
        if let Err(error) = attach_thumbnail(&mut evidence, ThumbnailSpec::default()) {
            eprintln!("Warning: could not derive a thumbnail: {error}");
        }
    }

    let store = ctx.open_store().await?;
    store
        .save_field_evidence(&evidence, SyncAction::Create)
        .await?;
    println!("{}", evidence.id);
    Ok(())
}

pub async fn run_delete(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let evidence_id: EvidenceId = parse_id(id)?;
    let store = ctx.open_store().await?;
    store.delete_field_evidence(&evidence_id).await?;
    println!("{evidence_id}");
    Ok(())
}

pub async fn run_list(ctx: &AppContext, review_id: &str, as_json: bool) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let records = store.list_field_evidence(review_id).await?;

    if as_json {
        let items = records
            .iter()
            .map(FieldEvidence::metadata)
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No evidence for review {review_id}.");
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for record in &records {
        let id = short_id(&record.id.as_str());
        let relative_time = format_relative_time(record.captured_at, now_ms);
        println!(
            "{id:<13}  {:<10}  {:<30}  {:>9}  {:<8}  {relative_time}",
            record.kind,
            record.file_name.chars().take(30).collect::<String>(),
            format_size(record.file_size),
            record.sync_status,
        );
    }
    Ok(())
}

pub(crate) fn kind_for_mime(mime_type: &str) -> EvidenceKind {
    if mime_type.starts_with("image/") {
        EvidenceKind::Photo
    } else if mime_type.starts_with("audio/") {
        EvidenceKind::VoiceNote
    } else {
        EvidenceKind::Document
    }
}

use chrono::Utc;

use fieldkit_core::models::{DraftFinding, EvidenceId, FindingId, GpsFix, SyncAction};
use fieldkit_core::util::normalize_text_option;

use crate::cli::FindingAddArgs;
use crate::commands::common::{format_relative_time, parse_id, short_id, AppContext};
use crate::error::CliError;

pub async fn run_add(ctx: &AppContext, args: &FindingAddArgs) -> Result<(), CliError> {
    let mut finding = DraftFinding::new(
        args.review.as_str(),
        args.title.as_str(),
        args.description.as_str(),
        args.severity.into(),
        args.area.as_str(),
    )?;
    finding.question_id = normalize_text_option(args.question.clone());

    for raw in &args.evidence {
        let evidence_id: EvidenceId = parse_id(raw)?;
        finding.link_evidence(evidence_id);
    }
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        finding.gps = Some(GpsFix {
            latitude,
            longitude,
            accuracy: args.accuracy,
        });
    }

    let store = ctx.open_store().await?;
    store
        .save_draft_finding(&finding, SyncAction::Create)
        .await?;
    println!("{}", finding.id);
    Ok(())
}

pub async fn run_discard(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let finding_id: FindingId = parse_id(id)?;
    let store = ctx.open_store().await?;
    store.delete_draft_finding(&finding_id).await?;
    println!("{finding_id}");
    Ok(())
}

pub async fn run_list(ctx: &AppContext, review_id: &str, as_json: bool) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let findings = store.list_draft_findings(review_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    if findings.is_empty() {
        println!("No draft findings for review {review_id}.");
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for line in format_finding_lines(&findings, now_ms) {
        println!("{line}");
    }
    Ok(())
}

fn format_finding_lines(findings: &[DraftFinding], now_ms: i64) -> Vec<String> {
    findings
        .iter()
        .map(|finding| {
            let id = short_id(&finding.id.as_str());
            let relative_time = format_relative_time(finding.updated_at, now_ms);
            format!(
                "{id:<13}  {:<12}  {:<8}  {:<40}  {:<8}  {relative_time}",
                finding.severity,
                finding.area_code,
                finding.title.chars().take(40).collect::<String>(),
                finding.sync_status,
            )
        })
        .collect()
}

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use fieldkit_core::models::{ChecklistItemId, EvidenceKind, FindingId, SessionId};
use fieldkit_core::FieldworkConfig;

use crate::cli::{EvidenceAddArgs, FindingAddArgs, SeverityArg};
use crate::commands::common::{
    format_relative_time, format_size, guess_mime, parse_id, parse_template_lines, short_id,
    AppContext,
};
use crate::commands::evidence::kind_for_mime;
use crate::commands::{checklist, evidence, finding, maintain};
use crate::error::CliError;

fn test_ctx(dir: &tempfile::TempDir) -> AppContext {
    AppContext {
        config: FieldworkConfig {
            // reserved port; every remote call fails fast
            api_base_url: Some("http://127.0.0.1:9".to_string()),
            ..FieldworkConfig::default()
        },
        data_dir: dir.path().join("data"),
        cache_dir: dir.path().join("cache"),
    }
}

fn write_cached_template(ctx: &AppContext, review_id: &str, body: &str) {
    let dir = ctx.cache_dir.join("reviews").join(review_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("checklist-template.json"), body).unwrap();
}

#[test]
fn guess_mime_covers_capture_formats() {
    assert_eq!(guess_mime(Path::new("dock.jpg")), Some("image/jpeg"));
    assert_eq!(guess_mime(Path::new("memo.WAV")), Some("audio/wav"));
    assert_eq!(guess_mime(Path::new("permit.pdf")), Some("application/pdf"));
    assert_eq!(guess_mime(Path::new("blob.xyz")), None);
    assert_eq!(guess_mime(Path::new("no-extension")), None);
}

#[test]
fn kind_for_mime_maps_media_families() {
    assert_eq!(kind_for_mime("image/png"), EvidenceKind::Photo);
    assert_eq!(kind_for_mime("audio/mpeg"), EvidenceKind::VoiceNote);
    assert_eq!(kind_for_mime("application/pdf"), EvidenceKind::Document);
}

#[test]
fn parse_id_rejects_empty_and_garbage() {
    assert!(matches!(
        parse_id::<ChecklistItemId>("  "),
        Err(CliError::EmptyId)
    ));
    assert!(matches!(
        parse_id::<FindingId>("not-a-uuid"),
        Err(CliError::InvalidId(_))
    ));

    let id = SessionId::new();
    let parsed: SessionId = parse_id(&id.as_str()).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn parse_template_lines_accepts_both_shapes() {
    let bare = r#"[{"itemKey": "permits", "phase": "pre-visit", "title": "Collect permits"}]"#;
    let lines = parse_template_lines("rev-1", bare).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].item_key, "permits");

    let wrapped = r#"{"lines": [{"itemKey": "walkthrough", "phase": "on-site", "title": "Walkthrough"}]}"#;
    let lines = parse_template_lines("rev-1", wrapped).unwrap();
    assert_eq!(lines.len(), 1);

    assert!(matches!(
        parse_template_lines("rev-1", r#"{"unexpected": true}"#),
        Err(CliError::MalformedTemplate(_))
    ));
}

#[test]
fn short_id_truncates_to_prefix() {
    assert_eq!(short_id("0198b2f0-6a6e-7000-8000-0123456789ab"), "0198b2f0-6a6e");
    assert_eq!(short_id("short"), "short");
}

#[test]
fn format_size_picks_sensible_units() {
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(2048), "2.0 KB");
    assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 3 * 60 * 60_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 48 * 60 * 60_000, now), "2d ago");
}

#[test]
fn resolve_prefers_the_flag_directory() {
    let ctx = AppContext::resolve(Some(PathBuf::from("/tmp/fieldkit-test")));
    assert_eq!(ctx.data_dir, PathBuf::from("/tmp/fieldkit-test"));
    assert_eq!(ctx.db_path(), PathBuf::from("/tmp/fieldkit-test/fieldkit.db"));
}

#[tokio::test(flavor = "multi_thread")]
async fn checklist_init_builds_items_from_the_cached_template() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    write_cached_template(
        &ctx,
        "rev-1",
        r#"{"lines": [
            {"itemKey": "permits", "phase": "pre-visit", "title": "Collect permits"},
            {"itemKey": "walkthrough", "phase": "on-site", "title": "Site walkthrough"}
        ]}"#,
    );

    checklist::run_init(&ctx, "rev-1").await.unwrap();

    let store = ctx.open_store().await.unwrap();
    let items = store.list_checklist_items("rev-1", None).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(store.eligible_queue_entries().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn checklist_init_requires_a_cached_template() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let error = checklist::run_init(&ctx, "rev-9").await.unwrap_err();
    assert!(matches!(error, CliError::NoCachedTemplate(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn evidence_add_stores_record_and_enqueues_push() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let capture = dir.path().join("memo.wav");
    std::fs::write(&capture, vec![0x52u8; 1024]).unwrap();

    let args = EvidenceAddArgs {
        file: capture,
        item: ChecklistItemId::new().as_str(),
        review: "rev-1".to_string(),
        kind: None,
        mime: None,
        lat: Some(59.33),
        lon: Some(18.06),
        accuracy: 12.0,
        no_thumbnail: false,
    };
    evidence::run_add(&ctx, &args).await.unwrap();

    let store = ctx.open_store().await.unwrap();
    let records = store.list_field_evidence("rev-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, EvidenceKind::VoiceNote);
    assert_eq!(records[0].mime_type, "audio/wav");
    assert_eq!(records[0].file_size, 1024);
    assert_eq!(records[0].gps.map(|gps| gps.accuracy), Some(12.0));

    let entries = store.eligible_queue_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    // metadata-only payload
    assert!(entries[0].payload.get("data").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn evidence_add_rejects_unknown_extensions_without_a_mime_flag() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let capture = dir.path().join("capture.xyz");
    std::fs::write(&capture, b"bytes").unwrap();

    let args = EvidenceAddArgs {
        file: capture,
        item: ChecklistItemId::new().as_str(),
        review: "rev-1".to_string(),
        kind: None,
        mime: None,
        lat: None,
        lon: None,
        accuracy: 25.0,
        no_thumbnail: true,
    };
    let error = evidence::run_add(&ctx, &args).await.unwrap_err();
    assert!(matches!(error, CliError::UnknownMimeType(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn finding_add_and_discard_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let args = FindingAddArgs {
        review: "rev-1".to_string(),
        title: "Blocked exit".to_string(),
        description: "Emergency exit blocked by pallets".to_string(),
        severity: SeverityArg::Critical,
        area: "hse-3".to_string(),
        question: Some("q-17".to_string()),
        evidence: vec![],
        lat: None,
        lon: None,
        accuracy: 25.0,
    };
    finding::run_add(&ctx, &args).await.unwrap();

    let store = ctx.open_store().await.unwrap();
    let findings = store.list_draft_findings("rev-1").await.unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].area_code, "HSE-3");
    assert_eq!(findings[0].question_id.as_deref(), Some("q-17"));

    finding::run_discard(&ctx, &findings[0].id.as_str())
        .await
        .unwrap();
    assert!(store
        .list_draft_findings("rev-1")
        .await
        .unwrap()
        .is_empty());

    // create + delete are both queued, in that order
    let entries = store.eligible_queue_entries().await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn export_writes_a_standalone_backup_file() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    write_cached_template(
        &ctx,
        "rev-1",
        r#"[{"itemKey": "permits", "phase": "pre-visit", "title": "Collect permits"}]"#,
    );
    checklist::run_init(&ctx, "rev-1").await.unwrap();

    let out_dir = dir.path().join("exports");
    std::fs::create_dir_all(&out_dir).unwrap();
    maintain::run_export(&ctx, "rev-1", Some(&out_dir))
        .await
        .unwrap();

    let exported = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("fieldkit-export-rev-1"))
        })
        .expect("export file present");
    let body = std::fs::read_to_string(exported).unwrap();
    assert!(body.contains("\"reviewId\": \"rev-1\""));
    assert!(body.contains("Collect permits"));
}

#[tokio::test(flavor = "multi_thread")]
async fn uncache_evicts_a_cached_review() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    write_cached_template(&ctx, "rev-1", "[]");

    maintain::run_uncache(&ctx, "rev-1").await.unwrap();
    assert!(!ctx.cache_dir.join("reviews").join("rev-1").exists());
}

#[test]
fn completions_write_a_bash_script() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fieldkit.bash");

    crate::commands::completions::run_completions(crate::cli::CompletionShell::Bash, Some(&output))
        .unwrap();

    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.contains("_fieldkit()"));
    assert!(script.contains("complete -F _fieldkit"));
}

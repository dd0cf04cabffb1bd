//! Local storage bookkeeping: quota introspection, durability requests,
//! retention cleanup, and emergency export.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    ChecklistItem, DraftFinding, EvidenceMetadata, OfflineSession, SyncStatus,
};
use crate::services::FieldStore;
use crate::util::unix_timestamp_ms;

const PERSISTENCE_MARKER: &str = ".fieldkit-persist";
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Used/quota byte counts, mirroring the platform storage estimate shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEstimate {
    /// Bytes currently used by the local data directory.
    pub usage_bytes: u64,
    /// Configured ceiling; 0 when unknown.
    pub quota_bytes: u64,
}

impl StorageEstimate {
    /// Bytes left under the quota; `None` when the quota is unknown.
    #[must_use]
    pub const fn free_bytes(&self) -> Option<u64> {
        if self.quota_bytes == 0 {
            None
        } else {
            Some(self.quota_bytes.saturating_sub(self.usage_bytes))
        }
    }
}

/// Complete JSON snapshot of one review's local data.
///
/// An emergency, human-recoverable backup; not a sync mechanism. Blobs are
/// inlined as base64 data URIs so the file stands alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewExport {
    pub review_id: String,
    pub exported_at: i64,
    pub checklist_items: Vec<ChecklistItem>,
    pub evidence: Vec<EvidenceExport>,
    pub findings: Vec<DraftFinding>,
    pub sessions: Vec<OfflineSession>,
}

/// One evidence record with its blobs inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceExport {
    #[serde(flatten)]
    pub metadata: EvidenceMetadata,
    pub sync_status: SyncStatus,
    pub data_uri: String,
    pub thumbnail_uri: Option<String>,
}

/// Keeps local storage bounded and recoverable.
pub struct StorageManager {
    store: FieldStore,
    data_dir: Option<PathBuf>,
    quota_bytes: Option<u64>,
}

impl StorageManager {
    /// Build a manager over the store and its on-disk data directory.
    #[must_use]
    pub const fn new(
        store: FieldStore,
        data_dir: Option<PathBuf>,
        quota_bytes: Option<u64>,
    ) -> Self {
        Self {
            store,
            data_dir,
            quota_bytes,
        }
    }

    /// Report used/quota bytes. Degrades to zero/zero, never errors.
    pub fn storage_estimate(&self) -> StorageEstimate {
        let usage_bytes = self
            .data_dir
            .as_deref()
            .map(directory_size)
            .unwrap_or_default();
        StorageEstimate {
            usage_bytes,
            quota_bytes: self.quota_bytes.unwrap_or_default(),
        }
    }

    /// Best-effort request for eviction protection.
    ///
    /// Writes a durability marker next to the database; returns whether the
    /// marker could be placed.
    pub fn request_persistent_storage(&self) -> bool {
        let Some(data_dir) = self.data_dir.as_deref() else {
            return false;
        };

        let granted = std::fs::create_dir_all(data_dir)
            .and_then(|()| std::fs::write(data_dir.join(PERSISTENCE_MARKER), b"keep"))
            .is_ok();
        if !granted {
            tracing::warn!(path = %data_dir.display(), "Persistent storage request denied");
        }
        granted
    }

    /// Delete already-synced records older than the cutoff, atomically
    /// across all three entity tables. Returns the number deleted.
    pub async fn clear_old_synced_data(&self, older_than_days: u32) -> Result<usize> {
        let cutoff = unix_timestamp_ms() - i64::from(older_than_days) * MS_PER_DAY;
        self.store.clear_synced_older_than(cutoff).await
    }

    /// Snapshot every table scoped to one review, blobs inlined.
    pub async fn export_review_data(&self, review_id: &str) -> Result<ReviewExport> {
        let checklist_items = self.store.list_checklist_items(review_id, None).await?;
        let findings = self.store.list_draft_findings(review_id).await?;
        let sessions = self.store.list_sessions(review_id).await?;

        let evidence = self
            .store
            .list_field_evidence(review_id)
            .await?
            .into_iter()
            .map(|record| EvidenceExport {
                metadata: record.metadata(),
                sync_status: record.sync_status,
                data_uri: data_uri(&record.mime_type, &record.data),
                thumbnail_uri: record
                    .thumbnail
                    .as_deref()
                    .map(|bytes| data_uri("image/jpeg", bytes)),
            })
            .collect();

        Ok(ReviewExport {
            review_id: review_id.to_string(),
            exported_at: unix_timestamp_ms(),
            checklist_items,
            evidence,
            findings,
            sessions,
        })
    }
}

/// Render an export as pretty-printed JSON.
pub fn render_export(export: &ReviewExport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(export)
}

/// Deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(review_id: &str, timestamp_ms: i64) -> String {
    format!("fieldkit-export-{review_id}-{timestamp_ms}.json")
}

fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

fn directory_size(path: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };

    let mut total = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            total += directory_size(&entry.path());
        } else if let Ok(metadata) = entry.metadata() {
            total += metadata.len();
        }
    }
    total
}

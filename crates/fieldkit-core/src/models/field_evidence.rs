//! Field evidence model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

use super::ids::{ChecklistItemId, EvidenceId};
use super::sync_status::SyncStatus;

/// Hard ceiling on the raw blob size accepted for upload (10 MB).
///
/// Oversized captures fail permanently before any network call so a request
/// that can never succeed does not burn the retry budget.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// What kind of artifact the reviewer captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    Photo,
    VoiceNote,
    Document,
}

impl EvidenceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::VoiceNote => "voice-note",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "photo" => Ok(Self::Photo),
            "voice-note" => Ok(Self::VoiceNote),
            "document" => Ok(Self::Document),
            other => Err(Error::InvalidInput(format!(
                "Unknown evidence kind: {other}"
            ))),
        }
    }
}

/// GPS fix recorded at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
}

/// A captured artifact tied to exactly one checklist item and one review.
///
/// The record exclusively owns its raw blob until the upload transport takes
/// a read-only borrow of it; the thumbnail is a derived, disposable cache
/// with the same ownership scope. Neither blob is ever serialized into a
/// sync queue payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEvidence {
    /// Unique identifier.
    pub id: EvidenceId,
    /// Checklist item this evidence supports.
    pub checklist_item_id: ChecklistItemId,
    /// Review this evidence belongs to.
    pub review_id: String,
    /// Artifact kind.
    pub kind: EvidenceKind,
    /// Content MIME type.
    pub mime_type: String,
    /// Original file name.
    pub file_name: String,
    /// Blob size in bytes.
    pub file_size: u64,
    /// Raw binary payload. Owned by this record until uploaded.
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Derived preview blob for photos; disposable.
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
    /// GPS fix at capture time, when available.
    pub gps: Option<GpsFix>,
    /// Capture timestamp (Unix ms).
    pub captured_at: i64,
    /// Whether markup has been flattened into the blob.
    pub annotated: bool,
    /// Sync state; written only by the sync engine.
    pub sync_status: SyncStatus,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
}

impl FieldEvidence {
    /// Create an evidence record from captured bytes.
    pub fn new(
        checklist_item_id: ChecklistItemId,
        review_id: impl Into<String>,
        kind: EvidenceKind,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self> {
        let review_id = review_id.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();
        let file_name = file_name.into().trim().to_string();

        if review_id.is_empty() {
            return Err(Error::InvalidInput(
                "Evidence review_id cannot be empty".to_string(),
            ));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "Evidence mime_type cannot be empty".to_string(),
            ));
        }
        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "Evidence file_name cannot be empty".to_string(),
            ));
        }
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "Evidence payload cannot be empty".to_string(),
            ));
        }

        let now = unix_timestamp_ms();
        Ok(Self {
            id: EvidenceId::new(),
            checklist_item_id,
            review_id,
            kind,
            mime_type,
            file_name,
            file_size: data.len() as u64,
            data,
            thumbnail: None,
            gps: None,
            captured_at: now,
            annotated: false,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Attach a GPS fix recorded at capture time.
    #[must_use]
    pub const fn with_gps(mut self, gps: GpsFix) -> Self {
        self.gps = Some(gps);
        self
    }

    /// Replace the blob with an annotated (markup-flattened) version.
    ///
    /// Callers must not do this while the record is `syncing`; the store
    /// service enforces that.
    pub fn apply_annotation(&mut self, data: Vec<u8>) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "Annotated payload cannot be empty".to_string(),
            ));
        }
        self.file_size = data.len() as u64;
        self.data = data;
        self.annotated = true;
        self.updated_at = unix_timestamp_ms();
        Ok(())
    }

    /// Whether the blob exceeds the upload ceiling.
    #[must_use]
    pub const fn oversized(&self) -> bool {
        self.file_size > MAX_UPLOAD_BYTES
    }

    /// Metadata projection used for queue payloads and the upload sidecar.
    #[must_use]
    pub fn metadata(&self) -> EvidenceMetadata {
        EvidenceMetadata {
            id: self.id,
            checklist_item_id: self.checklist_item_id,
            review_id: self.review_id.clone(),
            kind: self.kind,
            mime_type: self.mime_type.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            gps: self.gps,
            captured_at: self.captured_at,
            annotated: self.annotated,
        }
    }
}

/// Blob-free projection of an evidence record.
///
/// This is what travels in queue entries and in the `metadata` part of the
/// multipart upload; the raw bytes are loaded from the store at push time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceMetadata {
    pub id: EvidenceId,
    pub checklist_item_id: ChecklistItemId,
    pub review_id: String,
    pub kind: EvidenceKind,
    pub mime_type: String,
    pub file_name: String,
    pub file_size: u64,
    pub gps: Option<GpsFix>,
    pub captured_at: i64,
    pub annotated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FieldEvidence {
        FieldEvidence::new(
            ChecklistItemId::new(),
            "rev-1",
            EvidenceKind::Photo,
            "image/jpeg",
            "site.jpg",
            vec![0xFF; 2048],
        )
        .unwrap()
    }

    #[test]
    fn new_evidence_records_size_and_defaults() {
        let evidence = sample();
        assert_eq!(evidence.file_size, 2048);
        assert!(!evidence.annotated);
        assert_eq!(evidence.sync_status, SyncStatus::Pending);
        assert!(evidence.thumbnail.is_none());
    }

    #[test]
    fn new_evidence_validates_inputs() {
        let item_id = ChecklistItemId::new();
        assert!(
            FieldEvidence::new(item_id, "", EvidenceKind::Photo, "image/png", "f.png", vec![1])
                .is_err()
        );
        assert!(
            FieldEvidence::new(item_id, "r", EvidenceKind::Photo, "", "f.png", vec![1]).is_err()
        );
        assert!(
            FieldEvidence::new(item_id, "r", EvidenceKind::Photo, "image/png", "", vec![1])
                .is_err()
        );
        assert!(
            FieldEvidence::new(item_id, "r", EvidenceKind::Photo, "image/png", "f.png", vec![])
                .is_err()
        );
    }

    #[test]
    fn oversized_checks_the_upload_ceiling() {
        let mut evidence = sample();
        assert!(!evidence.oversized());
        evidence.file_size = MAX_UPLOAD_BYTES + 1;
        assert!(evidence.oversized());
    }

    #[test]
    fn apply_annotation_rewrites_blob_in_place() {
        let mut evidence = sample();
        let original_updated = evidence.updated_at;
        evidence.apply_annotation(vec![0xAA; 4096]).unwrap();

        assert!(evidence.annotated);
        assert_eq!(evidence.file_size, 4096);
        assert!(evidence.updated_at >= original_updated);
        assert!(evidence.apply_annotation(vec![]).is_err());
    }

    #[test]
    fn metadata_omits_blob_bytes() {
        let evidence = sample().with_gps(GpsFix {
            latitude: 59.33,
            longitude: 18.06,
            accuracy: 8.5,
        });
        let metadata = evidence.metadata();
        assert_eq!(metadata.file_size, 2048);

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"latitude\":59.33"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn serialized_evidence_never_carries_the_blob() {
        let evidence = sample();
        let json = serde_json::to_string(&evidence).unwrap();
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("thumbnail"));
    }
}

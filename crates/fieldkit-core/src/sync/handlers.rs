//! Per-entity push handlers and their typed registry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{EntityKind, EvidenceId, QueueEntry, SyncAction, MAX_UPLOAD_BYTES};
use crate::services::FieldStore;

use super::{PushError, SyncApiClient};

/// Pushes one queue entry to the remote authority.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn push(&self, entry: &QueueEntry) -> Result<(), PushError>;
}

/// Exhaustive handler registry, one slot per entity kind.
///
/// A missing handler is a compile error here, not a runtime permanent
/// failure: constructing the registry requires all four slots.
pub struct SyncHandlers {
    pub checklist_item: Arc<dyn SyncHandler>,
    pub field_evidence: Arc<dyn SyncHandler>,
    pub draft_finding: Arc<dyn SyncHandler>,
    pub offline_session: Arc<dyn SyncHandler>,
}

impl SyncHandlers {
    /// Wire the real handlers over one API client and store.
    #[must_use]
    pub fn wired(api: SyncApiClient, store: FieldStore) -> Self {
        Self {
            checklist_item: Arc::new(ChecklistItemHandler { api: api.clone() }),
            field_evidence: Arc::new(FieldEvidenceHandler {
                api: api.clone(),
                store,
            }),
            draft_finding: Arc::new(DraftFindingHandler { api: api.clone() }),
            offline_session: Arc::new(OfflineSessionHandler { api }),
        }
    }

    /// Resolve the handler for an entity kind.
    #[must_use]
    pub fn for_kind(&self, kind: EntityKind) -> &dyn SyncHandler {
        match kind {
            EntityKind::ChecklistItem => self.checklist_item.as_ref(),
            EntityKind::FieldEvidence => self.field_evidence.as_ref(),
            EntityKind::DraftFinding => self.draft_finding.as_ref(),
            EntityKind::OfflineSession => self.offline_session.as_ref(),
        }
    }
}

/// Fold the entry's action into its snapshot payload.
///
/// All payloads are JSON objects; anything else can never be accepted
/// remotely and fails before a request is attempted.
fn payload_with_action(entry: &QueueEntry) -> Result<serde_json::Value, PushError> {
    let serde_json::Value::Object(mut fields) = entry.payload.clone() else {
        return Err(PushError::Permanent(format!(
            "Queue payload for {} is not a JSON object",
            entry.entity_id
        )));
    };
    fields.insert(
        "action".to_string(),
        serde_json::Value::String(entry.action.as_str().to_string()),
    );
    Ok(serde_json::Value::Object(fields))
}

/// Pushes checklist item snapshots.
pub struct ChecklistItemHandler {
    pub api: SyncApiClient,
}

#[async_trait]
impl SyncHandler for ChecklistItemHandler {
    async fn push(&self, entry: &QueueEntry) -> Result<(), PushError> {
        let payload = payload_with_action(entry)?;
        self.api.push_checklist_item(&payload).await
    }
}

/// Pushes draft finding snapshots.
pub struct DraftFindingHandler {
    pub api: SyncApiClient,
}

#[async_trait]
impl SyncHandler for DraftFindingHandler {
    async fn push(&self, entry: &QueueEntry) -> Result<(), PushError> {
        let payload = payload_with_action(entry)?;
        self.api.push_draft_finding(&payload).await
    }
}

/// Pushes offline session audit records.
pub struct OfflineSessionHandler {
    pub api: SyncApiClient,
}

#[async_trait]
impl SyncHandler for OfflineSessionHandler {
    async fn push(&self, entry: &QueueEntry) -> Result<(), PushError> {
        let payload = payload_with_action(entry)?;
        self.api.push_offline_session(&payload).await
    }
}

/// Uploads and deletes evidence records.
///
/// Queue payloads for evidence hold metadata only, so create/update pushes
/// load the full record from the store to borrow its blob. The 10 MB size
/// ceiling is enforced before any network traffic.
pub struct FieldEvidenceHandler {
    pub api: SyncApiClient,
    pub store: FieldStore,
}

#[async_trait]
impl SyncHandler for FieldEvidenceHandler {
    async fn push(&self, entry: &QueueEntry) -> Result<(), PushError> {
        if entry.action == SyncAction::Delete {
            return self.api.delete_evidence(&entry.entity_id).await;
        }

        let id: EvidenceId = entry.entity_id.parse().map_err(|_| {
            PushError::Permanent(format!("Invalid evidence id: {}", entry.entity_id))
        })?;

        let record = self
            .store
            .get_field_evidence(&id)
            .await
            .map_err(|error| PushError::Retryable(error.to_string()))?
            .ok_or_else(|| {
                PushError::Permanent(format!(
                    "Evidence {id} no longer exists locally; nothing to upload"
                ))
            })?;

        if record.oversized() {
            return Err(PushError::Permanent(format!(
                "Evidence file {} is {} bytes, above the {} MB upload limit",
                record.file_name,
                record.file_size,
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        self.api
            .upload_evidence(&record.metadata(), &record.data)
            .await
    }
}

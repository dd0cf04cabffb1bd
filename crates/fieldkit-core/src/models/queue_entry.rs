//! Sync queue entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

use super::ids::QueueEntryId;

/// Default retry budget per queue entry.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Which entity table a queue entry targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ChecklistItem,
    FieldEvidence,
    DraftFinding,
    OfflineSession,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChecklistItem => "checklist_item",
            Self::FieldEvidence => "field_evidence",
            Self::DraftFinding => "draft_finding",
            Self::OfflineSession => "offline_session",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "checklist_item" => Ok(Self::ChecklistItem),
            "field_evidence" => Ok(Self::FieldEvidence),
            "draft_finding" => Ok(Self::DraftFinding),
            "offline_session" => Ok(Self::OfflineSession),
            other => Err(Error::InvalidInput(format!(
                "Unknown entity kind: {other}"
            ))),
        }
    }
}

/// The mutation a queue entry carries to the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "Unknown sync action: {other}"
            ))),
        }
    }
}

/// One outstanding intent to push a local change.
///
/// Entries are drained in (created_at, id) order; the v7 entry id breaks
/// same-millisecond ties in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Unique identifier.
    pub id: QueueEntryId,
    /// Entity table this entry targets.
    pub entity_kind: EntityKind,
    /// Target entity id (string form of the entity's uuid).
    pub entity_id: String,
    /// Mutation to apply remotely.
    pub action: SyncAction,
    /// Serialized snapshot payload. Metadata-only for evidence; the blob is
    /// loaded from the store at push time.
    pub payload: serde_json::Value,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Retry budget.
    pub max_retries: u32,
    /// Set when the entry was frozen by a remote conflict; excluded from
    /// bulk retry resets.
    pub conflict: bool,
    /// Timestamp of the last attempt (Unix ms).
    pub last_attempt_at: Option<i64>,
    /// Message from the last failed attempt.
    pub last_error: Option<String>,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
}

impl QueueEntry {
    /// Create a queue entry for one local mutation.
    pub fn new(
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        action: SyncAction,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: QueueEntryId::new(),
            entity_kind,
            entity_id: entity_id.into(),
            action,
            payload,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            conflict: false,
            last_attempt_at: None,
            last_error: None,
            created_at: unix_timestamp_ms(),
        }
    }

    /// Whether the retry budget is spent.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Record a failed attempt and consume one retry.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.retry_count += 1;
        self.last_error = Some(message.into());
        self.last_attempt_at = Some(unix_timestamp_ms());
    }

    /// Exhaust the budget immediately (permanent failure).
    pub fn exhaust(&mut self, message: impl Into<String>) {
        self.retry_count = self.max_retries;
        self.last_error = Some(message.into());
        self.last_attempt_at = Some(unix_timestamp_ms());
    }

    /// Freeze the entry after a remote conflict so no drain picks it up
    /// again until an operator resolves it.
    pub fn freeze_conflict(&mut self, message: impl Into<String>) {
        self.retry_count = self.max_retries;
        self.conflict = true;
        self.last_error = Some(message.into());
        self.last_attempt_at = Some(unix_timestamp_ms());
    }
}

//! Checklist item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

use super::ids::ChecklistItemId;
use super::sync_status::SyncStatus;

/// Review phase a checklist item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecklistPhase {
    PreVisit,
    OnSite,
    PostVisit,
}

impl ChecklistPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreVisit => "pre-visit",
            Self::OnSite => "on-site",
            Self::PostVisit => "post-visit",
        }
    }
}

impl fmt::Display for ChecklistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecklistPhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pre-visit" => Ok(Self::PreVisit),
            "on-site" => Ok(Self::OnSite),
            "post-visit" => Ok(Self::PostVisit),
            other => Err(Error::InvalidInput(format!(
                "Unknown checklist phase: {other}"
            ))),
        }
    }
}

/// One line of a review's checklist template, as served by the remote
/// template endpoint and cached for offline initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistTemplateLine {
    /// Stable key of the line item.
    pub item_key: String,
    /// Phase the item applies to.
    pub phase: ChecklistPhase,
    /// Human-readable item text.
    pub title: String,
}

/// One line item of a review's checklist, worked on offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    /// Unique identifier.
    pub id: ChecklistItemId,
    /// Review this item belongs to.
    pub review_id: String,
    /// Stable key of the template line item this row was initialized from.
    pub item_key: String,
    /// Phase of the review the item applies to.
    pub phase: ChecklistPhase,
    /// Human-readable item text.
    pub title: String,
    /// Whether the reviewer marked the item done.
    pub completed: bool,
    /// Completion timestamp (Unix ms).
    pub completed_at: Option<i64>,
    /// User id of whoever completed the item.
    pub completed_by: Option<String>,
    /// Free-text reviewer notes.
    pub notes: Option<String>,
    /// Sync state; written only by the sync engine.
    pub sync_status: SyncStatus,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
}

impl ChecklistItem {
    /// Create a checklist item from a template line.
    pub fn new(
        review_id: impl Into<String>,
        item_key: impl Into<String>,
        phase: ChecklistPhase,
        title: impl Into<String>,
    ) -> Result<Self> {
        let review_id = review_id.into().trim().to_string();
        let item_key = item_key.into().trim().to_string();
        let title = title.into().trim().to_string();

        if review_id.is_empty() {
            return Err(Error::InvalidInput(
                "Checklist item review_id cannot be empty".to_string(),
            ));
        }
        if item_key.is_empty() {
            return Err(Error::InvalidInput(
                "Checklist item item_key cannot be empty".to_string(),
            ));
        }
        if title.is_empty() {
            return Err(Error::InvalidInput(
                "Checklist item title cannot be empty".to_string(),
            ));
        }

        let now = unix_timestamp_ms();
        Ok(Self {
            id: ChecklistItemId::new(),
            review_id,
            item_key,
            phase,
            title,
            completed: false,
            completed_at: None,
            completed_by: None,
            notes: None,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Mark the item completed by the given user.
    pub fn complete(&mut self, user_id: impl Into<String>) {
        let now = unix_timestamp_ms();
        self.completed = true;
        self.completed_at = Some(now);
        self.completed_by = Some(user_id.into());
        self.updated_at = now;
    }

    /// Replace the reviewer notes.
    pub fn annotate(&mut self, notes: impl Into<String>) {
        self.notes = crate::util::normalize_text_option(Some(notes.into()));
        self.updated_at = unix_timestamp_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_starts_pending_and_incomplete() {
        let item = ChecklistItem::new("rev-1", "doc-check", ChecklistPhase::PreVisit, "Check docs")
            .unwrap();
        assert!(!item.completed);
        assert_eq!(item.sync_status, SyncStatus::Pending);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn new_item_validates_inputs() {
        assert!(ChecklistItem::new("", "k", ChecklistPhase::OnSite, "t").is_err());
        assert!(ChecklistItem::new("r", " ", ChecklistPhase::OnSite, "t").is_err());
        assert!(ChecklistItem::new("r", "k", ChecklistPhase::OnSite, "").is_err());
    }

    #[test]
    fn complete_records_actor_and_timestamp() {
        let mut item =
            ChecklistItem::new("rev-1", "walkthrough", ChecklistPhase::OnSite, "Walkthrough")
                .unwrap();
        item.complete("user-7");

        assert!(item.completed);
        assert_eq!(item.completed_by.as_deref(), Some("user-7"));
        assert!(item.completed_at.is_some());
    }

    #[test]
    fn annotate_normalizes_empty_notes() {
        let mut item =
            ChecklistItem::new("rev-1", "walkthrough", ChecklistPhase::OnSite, "Walkthrough")
                .unwrap();
        item.annotate("  follow up with site manager  ");
        assert_eq!(item.notes.as_deref(), Some("follow up with site manager"));

        item.annotate("   ");
        assert_eq!(item.notes, None);
    }

    #[test]
    fn phase_round_trips_through_strings() {
        for phase in [
            ChecklistPhase::PreVisit,
            ChecklistPhase::OnSite,
            ChecklistPhase::PostVisit,
        ] {
            let parsed: ChecklistPhase = phase.as_str().parse().unwrap();
            assert_eq!(parsed, phase);
        }
    }
}

//! Draft finding model

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

use super::field_evidence::GpsFix;
use super::ids::{EvidenceId, FindingId};
use super::sync_status::SyncStatus;

/// Severity grading for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Observation,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Observation => "observation",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Self::Critical),
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "observation" => Ok(Self::Observation),
            other => Err(Error::InvalidInput(format!("Unknown severity: {other}"))),
        }
    }
}

/// Area codes look like `QA`, `PROD-2`, `HSE-12`.
fn area_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z][A-Z0-9]{0,7}(-[0-9]{1,4})?$").expect("Invalid regex")
    })
}

/// A finding drafted in the field, mutated until synced.
///
/// Evidence references are weak: the evidence records live and sync
/// independently, and a referenced record may already be gone locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftFinding {
    /// Unique identifier.
    pub id: FindingId,
    /// Review this finding belongs to.
    pub review_id: String,
    /// Short title.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Severity grading.
    pub severity: Severity,
    /// Audit area code, e.g. `PROD-2`.
    pub area_code: String,
    /// Optional questionnaire question this finding answers.
    pub question_id: Option<String>,
    /// Weak references to supporting evidence records.
    pub evidence_ids: Vec<EvidenceId>,
    /// GPS fix at drafting time, when available.
    pub gps: Option<GpsFix>,
    /// Sync state; written only by the sync engine.
    pub sync_status: SyncStatus,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
}

impl DraftFinding {
    /// Create a new draft finding.
    pub fn new(
        review_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        area_code: impl Into<String>,
    ) -> Result<Self> {
        let review_id = review_id.into().trim().to_string();
        let title = title.into().trim().to_string();
        let description = description.into().trim().to_string();
        let area_code = area_code.into().trim().to_uppercase();

        if review_id.is_empty() {
            return Err(Error::InvalidInput(
                "Finding review_id cannot be empty".to_string(),
            ));
        }
        if title.is_empty() {
            return Err(Error::InvalidInput(
                "Finding title cannot be empty".to_string(),
            ));
        }
        if !area_code_pattern().is_match(&area_code) {
            return Err(Error::InvalidInput(format!(
                "Invalid area code: {area_code}"
            )));
        }

        let now = unix_timestamp_ms();
        Ok(Self {
            id: FindingId::new(),
            review_id,
            title,
            description,
            severity,
            area_code,
            question_id: None,
            evidence_ids: Vec::new(),
            gps: None,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Link an evidence record; duplicates are ignored.
    pub fn link_evidence(&mut self, evidence_id: EvidenceId) {
        if !self.evidence_ids.contains(&evidence_id) {
            self.evidence_ids.push(evidence_id);
            self.updated_at = unix_timestamp_ms();
        }
    }

    /// Drop a weak evidence reference if present.
    pub fn unlink_evidence(&mut self, evidence_id: EvidenceId) {
        let before = self.evidence_ids.len();
        self.evidence_ids.retain(|id| *id != evidence_id);
        if self.evidence_ids.len() != before {
            self.updated_at = unix_timestamp_ms();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_finding_uppercases_area_code() {
        let finding = DraftFinding::new(
            "rev-1",
            "Blocked exit",
            "Emergency exit blocked by pallets",
            Severity::Critical,
            "hse-3",
        )
        .unwrap();
        assert_eq!(finding.area_code, "HSE-3");
        assert_eq!(finding.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn new_finding_rejects_bad_area_codes() {
        for code in ["", "3QA", "qa_3", "TOOLONGCODE9", "QA-99999"] {
            assert!(
                DraftFinding::new("rev-1", "t", "d", Severity::Minor, code).is_err(),
                "expected {code:?} to be rejected"
            );
        }
    }

    #[test]
    fn evidence_links_deduplicate() {
        let mut finding =
            DraftFinding::new("rev-1", "t", "d", Severity::Major, "QA").unwrap();
        let evidence = EvidenceId::new();

        finding.link_evidence(evidence);
        finding.link_evidence(evidence);
        assert_eq!(finding.evidence_ids.len(), 1);

        finding.unlink_evidence(evidence);
        assert!(finding.evidence_ids.is_empty());
    }
}

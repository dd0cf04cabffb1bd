//! Draft finding repository implementation

use crate::error::{Error, Result};
use crate::models::{DraftFinding, EvidenceId, FindingId, SyncStatus};
use rusqlite::{params, Connection};

use super::{gps_from_columns, parse_column};

/// Trait for draft finding storage operations
pub trait FindingRepository {
    /// Insert or replace a finding
    fn upsert(&self, finding: &DraftFinding) -> Result<()>;

    /// Get a finding by ID
    fn get(&self, id: &FindingId) -> Result<Option<DraftFinding>>;

    /// List a review's findings in creation order
    fn list_by_review(&self, review_id: &str) -> Result<Vec<DraftFinding>>;

    /// Overwrite the sync status of a finding
    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()>;

    /// Count findings with the given sync status
    fn count_by_status(&self, status: SyncStatus) -> Result<usize>;

    /// Hard-delete a finding
    fn delete(&self, id: &FindingId) -> Result<()>;
}

/// `SQLite` implementation of `FindingRepository`
pub struct SqliteFindingRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "id, review_id, title, description, severity, area_code, \
     question_id, evidence_ids, latitude, longitude, accuracy, sync_status, created_at, \
     updated_at";

impl<'a> SqliteFindingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_finding(row: &rusqlite::Row<'_>) -> rusqlite::Result<DraftFinding> {
        let id: String = row.get(0)?;
        let severity: String = row.get(4)?;
        let evidence_ids: String = row.get(7)?;
        let status: String = row.get(11)?;

        let evidence_ids: Vec<EvidenceId> =
            serde_json::from_str(&evidence_ids).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(error),
                )
            })?;

        Ok(DraftFinding {
            id: parse_column(0, &id)?,
            review_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            severity: parse_column(4, &severity)?,
            area_code: row.get(5)?,
            question_id: row.get(6)?,
            evidence_ids,
            gps: gps_from_columns(row.get(8)?, row.get(9)?, row.get(10)?),
            sync_status: parse_column(11, &status)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl FindingRepository for SqliteFindingRepository<'_> {
    fn upsert(&self, finding: &DraftFinding) -> Result<()> {
        let evidence_ids = serde_json::to_string(&finding.evidence_ids)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO draft_findings
             (id, review_id, title, description, severity, area_code, question_id,
              evidence_ids, latitude, longitude, accuracy, sync_status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                finding.id.as_str(),
                finding.review_id,
                finding.title,
                finding.description,
                finding.severity.as_str(),
                finding.area_code,
                finding.question_id,
                evidence_ids,
                finding.gps.map(|gps| gps.latitude),
                finding.gps.map(|gps| gps.longitude),
                finding.gps.map(|gps| gps.accuracy),
                finding.sync_status.as_str(),
                finding.created_at,
                finding.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &FindingId) -> Result<Option<DraftFinding>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM draft_findings WHERE id = ?"),
            params![id.as_str()],
            Self::parse_finding,
        );

        match result {
            Ok(finding) => Ok(Some(finding)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_review(&self, review_id: &str) -> Result<Vec<DraftFinding>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM draft_findings
             WHERE review_id = ?
             ORDER BY created_at ASC, id ASC"
        ))?;

        let findings = stmt
            .query_map(params![review_id], Self::parse_finding)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(findings)
    }

    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE draft_findings SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_status(&self, status: SyncStatus) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM draft_findings WHERE sync_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete(&self, id: &FindingId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM draft_findings WHERE id = ?",
            params![id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

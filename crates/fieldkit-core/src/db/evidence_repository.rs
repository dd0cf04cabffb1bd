//! Field evidence repository implementation

use crate::error::{Error, Result};
use crate::models::{EvidenceId, FieldEvidence, SyncStatus};
use rusqlite::{params, Connection};

use super::{gps_from_columns, parse_column};

/// Trait for evidence storage operations
pub trait EvidenceRepository {
    /// Insert or replace an evidence record, blob included
    fn upsert(&self, evidence: &FieldEvidence) -> Result<()>;

    /// Get a full record (with blobs) by ID
    fn get(&self, id: &EvidenceId) -> Result<Option<FieldEvidence>>;

    /// List a review's evidence records (with blobs) in creation order
    fn list_by_review(&self, review_id: &str) -> Result<Vec<FieldEvidence>>;

    /// List evidence tied to one checklist item
    fn list_by_checklist_item(&self, checklist_item_id: &str) -> Result<Vec<FieldEvidence>>;

    /// Overwrite the sync status of a record
    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()>;

    /// Count records with the given sync status
    fn count_by_status(&self, status: SyncStatus) -> Result<usize>;

    /// Hard-delete a record and its blobs
    fn delete(&self, id: &EvidenceId) -> Result<()>;
}

/// `SQLite` implementation of `EvidenceRepository`
pub struct SqliteEvidenceRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "id, checklist_item_id, review_id, kind, mime_type, file_name, \
     file_size, data, thumbnail, latitude, longitude, accuracy, captured_at, annotated, \
     sync_status, created_at, updated_at";

impl<'a> SqliteEvidenceRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[allow(clippy::cast_sign_loss)] // file_size is validated non-negative on write
    fn parse_evidence(row: &rusqlite::Row<'_>) -> rusqlite::Result<FieldEvidence> {
        let id: String = row.get(0)?;
        let checklist_item_id: String = row.get(1)?;
        let kind: String = row.get(3)?;
        let status: String = row.get(14)?;
        Ok(FieldEvidence {
            id: parse_column(0, &id)?,
            checklist_item_id: parse_column(1, &checklist_item_id)?,
            review_id: row.get(2)?,
            kind: parse_column(3, &kind)?,
            mime_type: row.get(4)?,
            file_name: row.get(5)?,
            file_size: row.get::<_, i64>(6)? as u64,
            data: row.get(7)?,
            thumbnail: row.get(8)?,
            gps: gps_from_columns(row.get(9)?, row.get(10)?, row.get(11)?),
            captured_at: row.get(12)?,
            annotated: row.get::<_, i32>(13)? != 0,
            sync_status: parse_column(14, &status)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }
}

impl EvidenceRepository for SqliteEvidenceRepository<'_> {
    #[allow(clippy::cast_possible_wrap)] // sizes are far below i64::MAX
    fn upsert(&self, evidence: &FieldEvidence) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO field_evidence
             (id, checklist_item_id, review_id, kind, mime_type, file_name, file_size,
              data, thumbnail, latitude, longitude, accuracy, captured_at, annotated,
              sync_status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                evidence.id.as_str(),
                evidence.checklist_item_id.as_str(),
                evidence.review_id,
                evidence.kind.as_str(),
                evidence.mime_type,
                evidence.file_name,
                evidence.file_size as i64,
                evidence.data,
                evidence.thumbnail,
                evidence.gps.map(|gps| gps.latitude),
                evidence.gps.map(|gps| gps.longitude),
                evidence.gps.map(|gps| gps.accuracy),
                evidence.captured_at,
                i32::from(evidence.annotated),
                evidence.sync_status.as_str(),
                evidence.created_at,
                evidence.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &EvidenceId) -> Result<Option<FieldEvidence>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM field_evidence WHERE id = ?"),
            params![id.as_str()],
            Self::parse_evidence,
        );

        match result {
            Ok(evidence) => Ok(Some(evidence)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_review(&self, review_id: &str) -> Result<Vec<FieldEvidence>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM field_evidence
             WHERE review_id = ?
             ORDER BY created_at ASC, id ASC"
        ))?;

        let records = stmt
            .query_map(params![review_id], Self::parse_evidence)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn list_by_checklist_item(&self, checklist_item_id: &str) -> Result<Vec<FieldEvidence>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM field_evidence
             WHERE checklist_item_id = ?
             ORDER BY created_at ASC, id ASC"
        ))?;

        let records = stmt
            .query_map(params![checklist_item_id], Self::parse_evidence)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE field_evidence SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_status(&self, status: SyncStatus) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM field_evidence WHERE sync_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete(&self, id: &EvidenceId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM field_evidence WHERE id = ?",
            params![id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

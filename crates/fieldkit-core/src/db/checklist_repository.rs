//! Checklist item repository implementation

use crate::error::{Error, Result};
use crate::models::{ChecklistItem, ChecklistItemId, ChecklistPhase, SyncStatus};
use rusqlite::{params, Connection};

use super::parse_column;

/// Trait for checklist item storage operations
pub trait ChecklistItemRepository {
    /// Insert or replace a checklist item
    fn upsert(&self, item: &ChecklistItem) -> Result<()>;

    /// Get an item by ID
    fn get(&self, id: &ChecklistItemId) -> Result<Option<ChecklistItem>>;

    /// List a review's items, optionally filtered by phase, in creation order
    fn list_by_review(
        &self,
        review_id: &str,
        phase: Option<ChecklistPhase>,
    ) -> Result<Vec<ChecklistItem>>;

    /// Overwrite the sync status of an item
    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()>;

    /// Count items with the given sync status
    fn count_by_status(&self, status: SyncStatus) -> Result<usize>;

    /// Hard-delete an item
    fn delete(&self, id: &ChecklistItemId) -> Result<()>;
}

/// `SQLite` implementation of `ChecklistItemRepository`
pub struct SqliteChecklistItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteChecklistItemRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChecklistItem> {
        let id: String = row.get(0)?;
        let phase: String = row.get(3)?;
        let status: String = row.get(9)?;
        Ok(ChecklistItem {
            id: parse_column(0, &id)?,
            review_id: row.get(1)?,
            item_key: row.get(2)?,
            phase: parse_column(3, &phase)?,
            title: row.get(4)?,
            completed: row.get::<_, i32>(5)? != 0,
            completed_at: row.get(6)?,
            completed_by: row.get(7)?,
            notes: row.get(8)?,
            sync_status: parse_column(9, &status)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, review_id, item_key, phase, title, completed, completed_at, \
     completed_by, notes, sync_status, created_at, updated_at";

impl ChecklistItemRepository for SqliteChecklistItemRepository<'_> {
    fn upsert(&self, item: &ChecklistItem) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO checklist_items
             (id, review_id, item_key, phase, title, completed, completed_at,
              completed_by, notes, sync_status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id.as_str(),
                item.review_id,
                item.item_key,
                item.phase.as_str(),
                item.title,
                i32::from(item.completed),
                item.completed_at,
                item.completed_by,
                item.notes,
                item.sync_status.as_str(),
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &ChecklistItemId) -> Result<Option<ChecklistItem>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM checklist_items WHERE id = ?"),
            params![id.as_str()],
            Self::parse_item,
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_review(
        &self,
        review_id: &str,
        phase: Option<ChecklistPhase>,
    ) -> Result<Vec<ChecklistItem>> {
        let items = if let Some(phase) = phase {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM checklist_items
                 WHERE review_id = ? AND phase = ?
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![review_id, phase.as_str()], Self::parse_item)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM checklist_items
                 WHERE review_id = ?
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![review_id], Self::parse_item)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(items)
    }

    fn set_sync_status(&self, id: &str, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE checklist_items SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_status(&self, status: SyncStatus) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM checklist_items WHERE sync_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete(&self, id: &ChecklistItemId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM checklist_items WHERE id = ?",
            params![id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample(review: &str) -> ChecklistItem {
        ChecklistItem::new(review, "fire-doors", ChecklistPhase::OnSite, "Inspect fire doors")
            .unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let repo = SqliteChecklistItemRepository::new(db.connection());

        let mut item = sample("rev-1");
        repo.upsert(&item).unwrap();

        item.complete("user-7");
        item.annotate("south wing door jammed");
        repo.upsert(&item).unwrap();

        let fetched = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[test]
    fn test_list_by_review_filters_phase() {
        let db = setup();
        let repo = SqliteChecklistItemRepository::new(db.connection());

        repo.upsert(&sample("rev-1")).unwrap();
        repo.upsert(
            &ChecklistItem::new("rev-1", "permits", ChecklistPhase::PreVisit, "Collect permits")
                .unwrap(),
        )
        .unwrap();
        repo.upsert(&sample("rev-2")).unwrap();

        assert_eq!(repo.list_by_review("rev-1", None).unwrap().len(), 2);
        assert_eq!(
            repo.list_by_review("rev-1", Some(ChecklistPhase::PreVisit))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repo.list_by_review("rev-3", None).unwrap().len(), 0);
    }

    #[test]
    fn test_set_sync_status() {
        let db = setup();
        let repo = SqliteChecklistItemRepository::new(db.connection());

        let item = sample("rev-1");
        repo.upsert(&item).unwrap();

        repo.set_sync_status(&item.id.as_str(), SyncStatus::Synced)
            .unwrap();
        let fetched = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Synced);

        assert_eq!(repo.count_by_status(SyncStatus::Synced).unwrap(), 1);
        assert_eq!(repo.count_by_status(SyncStatus::Pending).unwrap(), 0);

        assert!(repo.set_sync_status("missing", SyncStatus::Failed).is_err());
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteChecklistItemRepository::new(db.connection());

        let item = sample("rev-1");
        repo.upsert(&item).unwrap();
        repo.delete(&item.id).unwrap();

        assert!(repo.get(&item.id).unwrap().is_none());
        assert!(repo.delete(&item.id).is_err());
    }
}

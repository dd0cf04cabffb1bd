//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: syncable entity tables and the sync queue
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS checklist_items (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL,
            item_key TEXT NOT NULL,
            phase TEXT NOT NULL,
            title TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_at INTEGER,
            completed_by TEXT,
            notes TEXT,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_checklist_items_review ON checklist_items(review_id);
        CREATE INDEX IF NOT EXISTS idx_checklist_items_status ON checklist_items(sync_status);
        CREATE INDEX IF NOT EXISTS idx_checklist_items_review_phase ON checklist_items(review_id, phase);

        CREATE TABLE IF NOT EXISTS field_evidence (
            id TEXT PRIMARY KEY,
            checklist_item_id TEXT NOT NULL,
            review_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            data BLOB NOT NULL,
            thumbnail BLOB,
            latitude REAL,
            longitude REAL,
            accuracy REAL,
            captured_at INTEGER NOT NULL,
            annotated INTEGER NOT NULL DEFAULT 0,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_field_evidence_review ON field_evidence(review_id);
        CREATE INDEX IF NOT EXISTS idx_field_evidence_item ON field_evidence(checklist_item_id);
        CREATE INDEX IF NOT EXISTS idx_field_evidence_status ON field_evidence(sync_status);

        CREATE TABLE IF NOT EXISTS draft_findings (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            severity TEXT NOT NULL,
            area_code TEXT NOT NULL,
            question_id TEXT,
            evidence_ids TEXT NOT NULL DEFAULT '[]',
            latitude REAL,
            longitude REAL,
            accuracy REAL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_draft_findings_review ON draft_findings(review_id);
        CREATE INDEX IF NOT EXISTS idx_draft_findings_status ON draft_findings(sync_status);

        CREATE TABLE IF NOT EXISTS sync_queue (
            id TEXT PRIMARY KEY,
            entity_kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            action TEXT NOT NULL,
            payload TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            max_retries INTEGER NOT NULL DEFAULT 3,
            conflict INTEGER NOT NULL DEFAULT 0,
            last_attempt_at INTEGER,
            last_error TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_queue_created ON sync_queue(created_at);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_entity ON sync_queue(entity_kind, entity_id);

        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: offline session audit trail and sync metadata
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS offline_sessions (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            device TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            synced_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_offline_sessions_review ON offline_sessions(review_id);

        CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        INSERT INTO schema_version (version) VALUES (2);
        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_all_tables_created() {
        let conn = setup();
        run(&conn).unwrap();

        for table in [
            "checklist_items",
            "field_evidence",
            "draft_findings",
            "sync_queue",
            "offline_sessions",
            "sync_meta",
        ] {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master
                        WHERE type = 'table' AND name = ?
                    )",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "expected table {table}");
        }
    }
}

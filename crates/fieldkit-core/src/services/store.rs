//! Thread-safe store service used across the sync subsystem.
//!
//! Every user-driven mutation of a syncable entity goes through this service
//! so the entity write and its sync queue entry land in one transaction; an
//! entity mutation without a matching queue entry would be a lost update.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ChecklistItemRepository, Database, EvidenceRepository, FindingRepository, QueueCounts,
    QueueRepository, SessionRepository, SqliteChecklistItemRepository, SqliteEvidenceRepository,
    SqliteFindingRepository, SqliteQueueRepository, SqliteSessionRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    ChecklistItem, ChecklistItemId, ChecklistPhase, ChecklistTemplateLine, DraftFinding,
    EntityKind, EvidenceId, FieldEvidence, FindingId, OfflineSession, QueueEntry, QueueEntryId,
    SessionId, SyncAction, SyncStatus,
};
use crate::util::unix_timestamp_ms;

const META_LAST_SYNC_AT: &str = "last_sync_at";

/// Thread-safe service for store and queue operations.
#[derive(Clone)]
pub struct FieldStore {
    db: Arc<Mutex<Database>>,
}

impl FieldStore {
    /// Open a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| Error::StorageUnavailable(error.to_string()))?;
        }

        let db = Database::open(&db_path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Verify the store accepts writes.
    pub async fn probe_writable(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.probe_writable()
    }

    // ----- checklist items -------------------------------------------------

    /// Create a review's checklist items from template lines, offline.
    ///
    /// All items and their queue entries are written in one transaction.
    pub async fn initialize_checklist(
        &self,
        review_id: &str,
        lines: &[ChecklistTemplateLine],
    ) -> Result<Vec<ChecklistItem>> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let items = {
            let items_repo = SqliteChecklistItemRepository::new(&tx);
            let queue_repo = SqliteQueueRepository::new(&tx);

            let mut items = Vec::with_capacity(lines.len());
            for line in lines {
                let item =
                    ChecklistItem::new(review_id, &line.item_key, line.phase, &line.title)?;
                items_repo.upsert(&item)?;
                queue_repo.insert(&QueueEntry::new(
                    EntityKind::ChecklistItem,
                    item.id.as_str(),
                    SyncAction::Create,
                    serde_json::to_value(&item)?,
                ))?;
                items.push(item);
            }
            items
        };

        tx.commit()?;
        tracing::info!(review_id, count = items.len(), "Initialized offline checklist");
        Ok(items)
    }

    /// Persist a checklist item mutation and enqueue its push.
    pub async fn save_checklist_item(
        &self,
        item: &ChecklistItem,
        action: SyncAction,
    ) -> Result<QueueEntry> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let entry = {
            SqliteChecklistItemRepository::new(&tx).upsert(item)?;
            let entry = QueueEntry::new(
                EntityKind::ChecklistItem,
                item.id.as_str(),
                action,
                serde_json::to_value(item)?,
            );
            SqliteQueueRepository::new(&tx).insert(&entry)?;
            entry
        };

        tx.commit()?;
        Ok(entry)
    }

    /// Fetch a checklist item by id.
    pub async fn get_checklist_item(&self, id: &ChecklistItemId) -> Result<Option<ChecklistItem>> {
        let db = self.db.lock().await;
        SqliteChecklistItemRepository::new(db.connection()).get(id)
    }

    /// List a review's checklist items.
    pub async fn list_checklist_items(
        &self,
        review_id: &str,
        phase: Option<ChecklistPhase>,
    ) -> Result<Vec<ChecklistItem>> {
        let db = self.db.lock().await;
        SqliteChecklistItemRepository::new(db.connection()).list_by_review(review_id, phase)
    }

    // ----- field evidence --------------------------------------------------

    /// Persist an evidence record (blob included) and enqueue its push.
    ///
    /// The queue payload carries the metadata projection only; the blob is
    /// loaded back from this store at upload time. Rewrites are rejected
    /// while an upload of the same record is in flight.
    pub async fn save_field_evidence(
        &self,
        evidence: &FieldEvidence,
        action: SyncAction,
    ) -> Result<QueueEntry> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let entry = {
            let evidence_repo = SqliteEvidenceRepository::new(&tx);
            if let Some(existing) = evidence_repo.get(&evidence.id)? {
                if existing.sync_status == SyncStatus::Syncing {
                    return Err(Error::InvalidInput(
                        "Evidence blob cannot be rewritten while its upload is in flight"
                            .to_string(),
                    ));
                }
            }

            evidence_repo.upsert(evidence)?;
            let entry = QueueEntry::new(
                EntityKind::FieldEvidence,
                evidence.id.as_str(),
                action,
                serde_json::to_value(evidence.metadata())?,
            );
            SqliteQueueRepository::new(&tx).insert(&entry)?;
            entry
        };

        tx.commit()?;
        Ok(entry)
    }

    /// Delete an evidence record locally and enqueue the remote delete.
    pub async fn delete_field_evidence(&self, id: &EvidenceId) -> Result<QueueEntry> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let entry = {
            let evidence_repo = SqliteEvidenceRepository::new(&tx);
            let existing = evidence_repo
                .get(id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            evidence_repo.delete(id)?;

            let entry = QueueEntry::new(
                EntityKind::FieldEvidence,
                id.as_str(),
                SyncAction::Delete,
                serde_json::json!({ "id": id, "reviewId": existing.review_id }),
            );
            SqliteQueueRepository::new(&tx).insert(&entry)?;
            entry
        };

        tx.commit()?;
        Ok(entry)
    }

    /// Fetch a full evidence record (with blobs) by id.
    pub async fn get_field_evidence(&self, id: &EvidenceId) -> Result<Option<FieldEvidence>> {
        let db = self.db.lock().await;
        SqliteEvidenceRepository::new(db.connection()).get(id)
    }

    /// List a review's evidence records.
    pub async fn list_field_evidence(&self, review_id: &str) -> Result<Vec<FieldEvidence>> {
        let db = self.db.lock().await;
        SqliteEvidenceRepository::new(db.connection()).list_by_review(review_id)
    }

    /// List evidence tied to one checklist item.
    pub async fn list_evidence_for_item(
        &self,
        checklist_item_id: &ChecklistItemId,
    ) -> Result<Vec<FieldEvidence>> {
        let db = self.db.lock().await;
        SqliteEvidenceRepository::new(db.connection())
            .list_by_checklist_item(&checklist_item_id.as_str())
    }

    // ----- draft findings --------------------------------------------------

    /// Persist a draft finding mutation and enqueue its push.
    pub async fn save_draft_finding(
        &self,
        finding: &DraftFinding,
        action: SyncAction,
    ) -> Result<QueueEntry> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let entry = {
            SqliteFindingRepository::new(&tx).upsert(finding)?;
            let entry = QueueEntry::new(
                EntityKind::DraftFinding,
                finding.id.as_str(),
                action,
                serde_json::to_value(finding)?,
            );
            SqliteQueueRepository::new(&tx).insert(&entry)?;
            entry
        };

        tx.commit()?;
        Ok(entry)
    }

    /// Discard a draft finding locally and enqueue the remote delete.
    pub async fn delete_draft_finding(&self, id: &FindingId) -> Result<QueueEntry> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let entry = {
            let finding_repo = SqliteFindingRepository::new(&tx);
            let existing = finding_repo
                .get(id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            finding_repo.delete(id)?;

            let entry = QueueEntry::new(
                EntityKind::DraftFinding,
                id.as_str(),
                SyncAction::Delete,
                serde_json::json!({ "id": id, "reviewId": existing.review_id }),
            );
            SqliteQueueRepository::new(&tx).insert(&entry)?;
            entry
        };

        tx.commit()?;
        Ok(entry)
    }

    /// Fetch a draft finding by id.
    pub async fn get_draft_finding(&self, id: &FindingId) -> Result<Option<DraftFinding>> {
        let db = self.db.lock().await;
        SqliteFindingRepository::new(db.connection()).get(id)
    }

    /// List a review's draft findings.
    pub async fn list_draft_findings(&self, review_id: &str) -> Result<Vec<DraftFinding>> {
        let db = self.db.lock().await;
        SqliteFindingRepository::new(db.connection()).list_by_review(review_id)
    }

    // ----- offline sessions ------------------------------------------------

    /// Open an offline working session and enqueue its audit push.
    pub async fn start_session(
        &self,
        review_id: &str,
        user_id: &str,
        device: &str,
    ) -> Result<OfflineSession> {
        let session = OfflineSession::start(review_id, user_id, device)?;

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        {
            SqliteSessionRepository::new(&tx).upsert(&session)?;
            SqliteQueueRepository::new(&tx).insert(&QueueEntry::new(
                EntityKind::OfflineSession,
                session.id.as_str(),
                SyncAction::Create,
                serde_json::to_value(&session)?,
            ))?;
        }
        tx.commit()?;

        tracing::info!(session_id = %session.id, review_id, "Started offline session");
        Ok(session)
    }

    /// Close an offline session and enqueue the closing update.
    pub async fn close_session(&self, id: &SessionId) -> Result<OfflineSession> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let session = {
            let session_repo = SqliteSessionRepository::new(&tx);
            let mut session = session_repo
                .get(id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            session.close();
            session_repo.upsert(&session)?;
            SqliteQueueRepository::new(&tx).insert(&QueueEntry::new(
                EntityKind::OfflineSession,
                session.id.as_str(),
                SyncAction::Update,
                serde_json::to_value(&session)?,
            ))?;
            session
        };

        tx.commit()?;
        Ok(session)
    }

    /// Fetch a session by id.
    pub async fn get_session(&self, id: &SessionId) -> Result<Option<OfflineSession>> {
        let db = self.db.lock().await;
        SqliteSessionRepository::new(db.connection()).get(id)
    }

    /// List a review's sessions, most recent first.
    pub async fn list_sessions(&self, review_id: &str) -> Result<Vec<OfflineSession>> {
        let db = self.db.lock().await;
        SqliteSessionRepository::new(db.connection()).list_by_review(review_id)
    }

    // ----- sync queue ------------------------------------------------------

    /// Queue entries with retry budget left, in strict creation order.
    pub async fn eligible_queue_entries(&self) -> Result<Vec<QueueEntry>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).list_eligible()
    }

    /// Every queue entry, in creation order.
    pub async fn all_queue_entries(&self) -> Result<Vec<QueueEntry>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).list_all()
    }

    /// Persist retry/conflict bookkeeping for an entry.
    pub async fn update_queue_entry(&self, entry: &QueueEntry) -> Result<()> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).update(entry)
    }

    /// Remove a queue entry after a confirmed push.
    pub async fn delete_queue_entry(&self, id: &QueueEntryId) -> Result<()> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).delete(id)
    }

    /// Reset exhausted non-conflict entries and mark their entities pending.
    ///
    /// Returns how many entries re-entered the pipeline.
    pub async fn reset_exhausted_entries(&self) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let count = {
            let reset = SqliteQueueRepository::new(&tx).reset_exhausted()?;
            for entry in &reset {
                Self::mark_entity_status_in(&tx, entry.entity_kind, &entry.entity_id, SyncStatus::Pending)?;
            }
            reset.len()
        };

        tx.commit()?;
        Ok(count)
    }

    /// Delete exhausted entries whose last attempt predates the cutoff.
    pub async fn purge_exhausted_before(&self, cutoff_ms: i64) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).purge_exhausted_before(cutoff_ms)
    }

    /// Pending/failed tallies over the queue.
    pub async fn queue_counts(&self) -> Result<QueueCounts> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).counts()
    }

    /// Conflict count aggregated across the three syncable tables.
    pub async fn conflict_count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let checklist = SqliteChecklistItemRepository::new(conn)
            .count_by_status(SyncStatus::Conflict)?;
        let evidence =
            SqliteEvidenceRepository::new(conn).count_by_status(SyncStatus::Conflict)?;
        let findings =
            SqliteFindingRepository::new(conn).count_by_status(SyncStatus::Conflict)?;
        Ok(checklist + evidence + findings)
    }

    /// Error message of the most recently failed attempt, if any.
    pub async fn most_recent_error(&self) -> Result<Option<String>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).most_recent_error()
    }

    // ----- sync status -----------------------------------------------------

    /// Overwrite an entity's sync status. Only the sync engine calls this.
    ///
    /// Entities deleted locally (delete-action entries) no longer have a row
    /// to update; that is not an error. Sessions carry a `synced_at`
    /// timestamp instead of a status column.
    pub async fn mark_entity_status(
        &self,
        kind: EntityKind,
        entity_id: &str,
        status: SyncStatus,
    ) -> Result<()> {
        let db = self.db.lock().await;
        Self::mark_entity_status_in(db.connection(), kind, entity_id, status)
    }

    fn mark_entity_status_in(
        conn: &rusqlite::Connection,
        kind: EntityKind,
        entity_id: &str,
        status: SyncStatus,
    ) -> Result<()> {
        let result = match kind {
            EntityKind::ChecklistItem => {
                SqliteChecklistItemRepository::new(conn).set_sync_status(entity_id, status)
            }
            EntityKind::FieldEvidence => {
                SqliteEvidenceRepository::new(conn).set_sync_status(entity_id, status)
            }
            EntityKind::DraftFinding => {
                SqliteFindingRepository::new(conn).set_sync_status(entity_id, status)
            }
            EntityKind::OfflineSession => {
                if status == SyncStatus::Synced {
                    SqliteSessionRepository::new(conn)
                        .mark_synced(entity_id, unix_timestamp_ms())
                } else {
                    Ok(())
                }
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(Error::NotFound(_)) => {
                tracing::debug!(%kind, entity_id, "No local row to mark; likely deleted");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    // ----- retention cleanup -----------------------------------------------

    /// Delete already-synced rows older than the cutoff in one transaction.
    ///
    /// Pending, failed, and conflict rows are never touched regardless of
    /// age. Returns the number of rows deleted.
    pub async fn clear_synced_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;

        let mut deleted = 0;
        for table in ["checklist_items", "field_evidence", "draft_findings"] {
            deleted += tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE sync_status = 'synced' AND updated_at < ?"
                ),
                rusqlite::params![cutoff_ms],
            )?;
        }

        tx.commit()?;
        if deleted > 0 {
            tracing::info!(deleted, "Cleared old synced records");
        }
        Ok(deleted)
    }

    // ----- sync metadata ---------------------------------------------------

    /// Timestamp of the last successful sync, if any.
    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        Ok(self
            .get_meta(META_LAST_SYNC_AT)
            .await?
            .and_then(|value| value.parse().ok()))
    }

    /// Record the timestamp of a successful sync.
    pub async fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        self.set_meta(META_LAST_SYNC_AT, &timestamp_ms.to_string())
            .await
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let result = db.connection().query_row(
            "SELECT value FROM sync_meta WHERE key = ?",
            rusqlite::params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceKind, Severity};

    async fn setup() -> FieldStore {
        FieldStore::open_in_memory().await.unwrap()
    }

    fn template() -> Vec<ChecklistTemplateLine> {
        vec![
            ChecklistTemplateLine {
                item_key: "permits".to_string(),
                phase: ChecklistPhase::PreVisit,
                title: "Collect permits".to_string(),
            },
            ChecklistTemplateLine {
                item_key: "walkthrough".to_string(),
                phase: ChecklistPhase::OnSite,
                title: "Site walkthrough".to_string(),
            },
        ]
    }

    fn evidence(store_review: &str) -> FieldEvidence {
        FieldEvidence::new(
            ChecklistItemId::new(),
            store_review,
            EvidenceKind::Photo,
            "image/jpeg",
            "dock.jpg",
            vec![0x42; 256],
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initialize_checklist_creates_items_and_queue_entries() {
        let store = setup().await;

        let items = store
            .initialize_checklist("rev-1", &template())
            .await
            .unwrap();
        assert_eq!(items.len(), 2);

        let entries = store.eligible_queue_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|entry| entry.entity_kind == EntityKind::ChecklistItem));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_entity_save_produces_a_queue_entry() {
        let store = setup().await;

        let mut item = ChecklistItem::new("rev-1", "k", ChecklistPhase::OnSite, "t").unwrap();
        store
            .save_checklist_item(&item, SyncAction::Create)
            .await
            .unwrap();
        item.complete("user-7");
        store
            .save_checklist_item(&item, SyncAction::Update)
            .await
            .unwrap();

        store
            .save_field_evidence(&evidence("rev-1"), SyncAction::Create)
            .await
            .unwrap();

        let finding = DraftFinding::new("rev-1", "t", "d", Severity::Minor, "QA").unwrap();
        store
            .save_draft_finding(&finding, SyncAction::Create)
            .await
            .unwrap();

        let entries = store.eligible_queue_entries().await.unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn evidence_queue_payload_is_metadata_only() {
        let store = setup().await;

        let evidence = evidence("rev-1");
        let entry = store
            .save_field_evidence(&evidence, SyncAction::Create)
            .await
            .unwrap();

        assert_eq!(entry.payload["fileSize"], 256);
        assert!(entry.payload.get("data").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn evidence_rewrite_is_rejected_while_syncing() {
        let store = setup().await;

        let mut evidence = evidence("rev-1");
        store
            .save_field_evidence(&evidence, SyncAction::Create)
            .await
            .unwrap();
        store
            .mark_entity_status(
                EntityKind::FieldEvidence,
                &evidence.id.as_str(),
                SyncStatus::Syncing,
            )
            .await
            .unwrap();

        evidence.apply_annotation(vec![0x55; 128]).unwrap();
        let error = store
            .save_field_evidence(&evidence, SyncAction::Update)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_evidence_enqueues_remote_delete() {
        let store = setup().await;

        let evidence = evidence("rev-1");
        store
            .save_field_evidence(&evidence, SyncAction::Create)
            .await
            .unwrap();
        let entry = store.delete_field_evidence(&evidence.id).await.unwrap();

        assert_eq!(entry.action, SyncAction::Delete);
        assert_eq!(entry.payload["reviewId"], "rev-1");
        assert!(store
            .get_field_evidence(&evidence.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_lifecycle_enqueues_create_and_update() {
        let store = setup().await;

        let session = store
            .start_session("rev-1", "user-7", "tablet-a4")
            .await
            .unwrap();
        store.close_session(&session.id).await.unwrap();

        let entries = store.eligible_queue_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, SyncAction::Create);
        assert_eq!(entries[1].action, SyncAction::Update);

        let closed = store.get_session(&session.id).await.unwrap().unwrap();
        assert!(!closed.is_open());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_exhausted_entries_restores_entity_status() {
        let store = setup().await;

        let item = ChecklistItem::new("rev-1", "k", ChecklistPhase::OnSite, "t").unwrap();
        let mut entry = store
            .save_checklist_item(&item, SyncAction::Create)
            .await
            .unwrap();

        entry.exhaust("HTTP 500");
        store.update_queue_entry(&entry).await.unwrap();
        store
            .mark_entity_status(
                EntityKind::ChecklistItem,
                &item.id.as_str(),
                SyncStatus::Failed,
            )
            .await
            .unwrap();

        let reset = store.reset_exhausted_entries().await.unwrap();
        assert_eq!(reset, 1);

        let refreshed = store.get_checklist_item(&item.id).await.unwrap().unwrap();
        assert_eq!(refreshed.sync_status, SyncStatus::Pending);
        assert_eq!(store.eligible_queue_entries().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_synced_older_than_spares_unsynced_rows() {
        let store = setup().await;

        let mut synced_old = ChecklistItem::new("rev-1", "a", ChecklistPhase::OnSite, "a").unwrap();
        synced_old.sync_status = SyncStatus::Synced;
        synced_old.updated_at = 1_000;
        let mut pending_old = ChecklistItem::new("rev-1", "b", ChecklistPhase::OnSite, "b").unwrap();
        pending_old.updated_at = 1_000;
        let mut synced_new = ChecklistItem::new("rev-1", "c", ChecklistPhase::OnSite, "c").unwrap();
        synced_new.sync_status = SyncStatus::Synced;

        for item in [&synced_old, &pending_old, &synced_new] {
            store
                .save_checklist_item(item, SyncAction::Create)
                .await
                .unwrap();
        }

        let deleted = store.clear_synced_older_than(5_000).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store
            .get_checklist_item(&synced_old.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_checklist_item(&pending_old.id)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get_checklist_item(&synced_new.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_count_aggregates_across_tables() {
        let store = setup().await;

        let item = ChecklistItem::new("rev-1", "k", ChecklistPhase::OnSite, "t").unwrap();
        store
            .save_checklist_item(&item, SyncAction::Create)
            .await
            .unwrap();
        let finding = DraftFinding::new("rev-1", "t", "d", Severity::Minor, "QA").unwrap();
        store
            .save_draft_finding(&finding, SyncAction::Create)
            .await
            .unwrap();

        store
            .mark_entity_status(
                EntityKind::ChecklistItem,
                &item.id.as_str(),
                SyncStatus::Conflict,
            )
            .await
            .unwrap();
        store
            .mark_entity_status(
                EntityKind::DraftFinding,
                &finding.id.as_str(),
                SyncStatus::Conflict,
            )
            .await
            .unwrap();

        assert_eq!(store.conflict_count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn last_sync_at_round_trips() {
        let store = setup().await;
        assert_eq!(store.last_sync_at().await.unwrap(), None);

        store.set_last_sync_at(123_456).await.unwrap();
        assert_eq!(store.last_sync_at().await.unwrap(), Some(123_456));
    }
}

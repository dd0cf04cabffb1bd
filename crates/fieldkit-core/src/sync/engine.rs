//! Sync queue drain engine.
//!
//! Drains the queue to convergence in strict creation order without
//! exceeding any entry's retry budget. Safe to trigger concurrently: a
//! drain already in progress turns further triggers into no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{QueueEntry, SyncStatus};
use crate::services::FieldStore;
use crate::util::unix_timestamp_ms;

use super::connectivity::ConnectivityMonitor;
use super::{PushError, SyncHandlers};

/// Tunables for the drain loop.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// First backoff delay after a failure.
    pub backoff_base: Duration,
    /// Growth factor per consumed retry (5 s, 15 s, 45 s by default).
    pub backoff_multiplier: u32,
    /// How long exhausted entries are kept for inspection before
    /// `clear_completed` garbage-collects them.
    pub entry_ttl: Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(5),
            backoff_multiplier: 3,
            entry_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Point-in-time view of the queue, cheap enough for status UI polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatusSnapshot {
    /// Entries still inside their retry budget.
    pub pending: usize,
    /// Exhausted entries, conflicts excluded.
    pub failed: usize,
    /// Conflicted records across the three syncable tables.
    pub conflicts: usize,
    /// Last successful sync (Unix ms).
    pub last_sync_at: Option<i64>,
    /// Most recent push error message.
    pub last_error: Option<String>,
}

/// Drains the sync queue through the typed handler registry.
pub struct SyncEngine {
    store: FieldStore,
    handlers: Arc<SyncHandlers>,
    config: SyncEngineConfig,
    draining: AtomicBool,
}

impl SyncEngine {
    /// Build an engine over a store and a fully wired handler registry.
    #[must_use]
    pub fn new(store: FieldStore, handlers: Arc<SyncHandlers>, config: SyncEngineConfig) -> Self {
        Self {
            store,
            handlers,
            config,
            draining: AtomicBool::new(false),
        }
    }

    /// Drain all eligible queue entries once.
    ///
    /// Returns the number of entries confirmed by the remote. Returns 0
    /// immediately when another drain is already running.
    pub async fn process_queue(&self) -> Result<usize> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain already in progress; skipping trigger");
            return Ok(0);
        }

        let outcome = self.drain().await;
        self.draining.store(false, Ordering::Release);
        outcome
    }

    async fn drain(&self) -> Result<usize> {
        let entries = self.store.eligible_queue_entries().await?;
        if entries.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = entries.len(), "Draining sync queue");
        let mut synced = 0usize;

        for mut entry in entries {
            self.store
                .mark_entity_status(entry.entity_kind, &entry.entity_id, SyncStatus::Syncing)
                .await?;

            let handler = self.handlers.for_kind(entry.entity_kind);
            match handler.push(&entry).await {
                Ok(()) => {
                    self.store.delete_queue_entry(&entry.id).await?;
                    self.store
                        .mark_entity_status(entry.entity_kind, &entry.entity_id, SyncStatus::Synced)
                        .await?;
                    synced += 1;
                }
                Err(error) => {
                    let delay = self.backoff_delay(entry.retry_count);
                    self.handle_push_failure(&mut entry, &error).await?;
                    // One pause per failed entry; later entries still run
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if synced > 0 {
            self.store.set_last_sync_at(unix_timestamp_ms()).await?;
        }
        tracing::info!(synced, "Drain finished");
        Ok(synced)
    }

    async fn handle_push_failure(
        &self,
        entry: &mut QueueEntry,
        error: &PushError,
    ) -> Result<()> {
        let entity_status = match error {
            PushError::Conflict(message) => {
                tracing::warn!(entity_id = %entry.entity_id, %message, "Push conflicted; parking entry");
                entry.freeze_conflict(message.clone());
                SyncStatus::Conflict
            }
            PushError::Permanent(message) => {
                tracing::warn!(entity_id = %entry.entity_id, %message, "Push failed permanently");
                entry.exhaust(message.clone());
                SyncStatus::Failed
            }
            PushError::Retryable(message) => {
                entry.record_failure(message.clone());
                if entry.is_exhausted() {
                    tracing::warn!(entity_id = %entry.entity_id, %message, "Retry budget exhausted");
                    SyncStatus::Failed
                } else {
                    tracing::warn!(
                        entity_id = %entry.entity_id,
                        retry_count = entry.retry_count,
                        %message,
                        "Push failed; will retry"
                    );
                    // Never leave a record looking "syncing" across attempts
                    SyncStatus::Pending
                }
            }
        };

        self.store.update_queue_entry(entry).await?;
        self.store
            .mark_entity_status(entry.entity_kind, &entry.entity_id, entity_status)
            .await
    }

    /// Backoff before the next entry, based on retries already consumed.
    fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(6);
        self.config.backoff_base * self.config.backoff_multiplier.saturating_pow(exponent)
    }

    /// Give every exhausted non-conflict entry a fresh budget.
    ///
    /// This is the only way a failed entry re-enters the pipeline; parked
    /// conflicts stay parked until an operator edits the record.
    pub async fn retry_failed(&self) -> Result<usize> {
        let reset = self.store.reset_exhausted_entries().await?;
        if reset > 0 {
            tracing::info!(reset, "Requeued failed entries");
        }
        Ok(reset)
    }

    /// Garbage-collect exhausted entries past their inspection TTL.
    pub async fn clear_completed(&self) -> Result<usize> {
        let ttl_ms = i64::try_from(self.config.entry_ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = unix_timestamp_ms() - ttl_ms;
        let purged = self.store.purge_exhausted_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, "Purged stale queue entries");
        }
        Ok(purged)
    }

    /// Current queue tallies and the most recent error, for status UI.
    pub async fn sync_status(&self) -> Result<SyncStatusSnapshot> {
        let counts = self.store.queue_counts().await?;
        Ok(SyncStatusSnapshot {
            pending: counts.pending,
            failed: counts.failed,
            conflicts: self.store.conflict_count().await?,
            last_sync_at: self.store.last_sync_at().await?,
            last_error: self.store.most_recent_error().await?,
        })
    }

    /// Arm a one-shot drain on the monitor's next offline-to-online flip.
    ///
    /// Returns whether a hook was armed (the monitor arms only while
    /// offline). Re-arm after each reconnect drain for continuous coverage.
    pub fn attach_reconnect(self: &Arc<Self>, monitor: &ConnectivityMonitor) -> bool {
        let engine = Arc::clone(self);
        let handle = tokio::runtime::Handle::current();
        monitor.on_reconnect(move || {
            handle.spawn(async move {
                match engine.process_queue().await {
                    Ok(synced) => tracing::info!(synced, "Reconnect drain finished"),
                    Err(error) => tracing::warn!(%error, "Reconnect drain failed"),
                }
            });
        })
    }
}

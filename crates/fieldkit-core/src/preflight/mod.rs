//! Pre-departure readiness check.
//!
//! Pure composition over the store, cache, and storage managers: answers
//! "is this device ready to go offline" as a fixed, ordered sequence of
//! checks, reporting each one as it completes so a UI can show progress.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheManager;
use crate::error::Result;
use crate::services::FieldStore;
use crate::storage::StorageManager;

/// A capability the capture UI needs in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Camera,
    Microphone,
    Location,
}

impl Capability {
    pub const ALL: [Self; 3] = [Self::Camera, Self::Microphone, Self::Location];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Location => "location",
        }
    }
}

/// Grant state of one capability, as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Unknown,
}

/// Platform boundary for permission lookups.
pub trait PermissionProbe: Send + Sync {
    fn status(&self, capability: Capability) -> PermissionState;
}

/// Probe for platforms with no permission introspection.
pub struct UnknownPermissionProbe;

impl PermissionProbe for UnknownPermissionProbe {
    fn status(&self, _capability: Capability) -> PermissionState {
        PermissionState::Unknown
    }
}

/// Result grade of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Warning => f.write_str("warning"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// One completed check with a human-readable detail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub name: &'static str,
    pub outcome: CheckOutcome,
    pub detail: String,
}

/// The full readiness verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub checks: Vec<CheckReport>,
    /// True iff no check failed; warnings do not block departure.
    pub ready: bool,
}

/// Runs the readiness sequence.
pub struct PreflightRunner {
    store: FieldStore,
    storage: StorageManager,
    cache: Arc<CacheManager>,
    permissions: Arc<dyn PermissionProbe>,
    /// Below this many free bytes the storage check warns; below a quarter
    /// of it, the check fails.
    min_free_bytes: u64,
}

impl PreflightRunner {
    /// Default free-space floor (50 MB).
    pub const DEFAULT_MIN_FREE_BYTES: u64 = 50 * 1024 * 1024;

    #[must_use]
    pub fn new(
        store: FieldStore,
        storage: StorageManager,
        cache: Arc<CacheManager>,
        permissions: Arc<dyn PermissionProbe>,
    ) -> Self {
        Self {
            store,
            storage,
            cache,
            permissions,
            min_free_bytes: Self::DEFAULT_MIN_FREE_BYTES,
        }
    }

    /// Override the free-space floor.
    #[must_use]
    pub const fn with_min_free_bytes(mut self, min_free_bytes: u64) -> Self {
        self.min_free_bytes = min_free_bytes;
        self
    }

    /// Run every check in order, reporting each as it completes.
    pub async fn run(
        &self,
        review_id: &str,
        mut on_check: impl FnMut(&CheckReport) + Send,
    ) -> Result<PreflightReport> {
        let mut checks = Vec::with_capacity(4);

        let report = self.check_local_store().await;
        on_check(&report);
        checks.push(report);

        let report = self.check_permissions();
        on_check(&report);
        checks.push(report);

        let report = self.check_review_cache(review_id).await;
        on_check(&report);
        checks.push(report);

        let report = self.check_free_space();
        on_check(&report);
        checks.push(report);

        let ready = checks
            .iter()
            .all(|check| check.outcome != CheckOutcome::Fail);
        Ok(PreflightReport { checks, ready })
    }

    /// Fail when the store cannot take writes; nothing else works offline.
    async fn check_local_store(&self) -> CheckReport {
        match self.store.probe_writable().await {
            Ok(()) => CheckReport {
                name: "local-store",
                outcome: CheckOutcome::Pass,
                detail: "Local store accepts writes".to_string(),
            },
            Err(error) => CheckReport {
                name: "local-store",
                outcome: CheckOutcome::Fail,
                detail: error.to_string(),
            },
        }
    }

    fn check_permissions(&self) -> CheckReport {
        let mut not_granted = Vec::new();
        for capability in Capability::ALL {
            if self.permissions.status(capability) != PermissionState::Granted {
                not_granted.push(capability.as_str());
            }
        }

        if not_granted.is_empty() {
            CheckReport {
                name: "permissions",
                outcome: CheckOutcome::Pass,
                detail: "Camera, microphone, and location granted".to_string(),
            }
        } else {
            CheckReport {
                name: "permissions",
                outcome: CheckOutcome::Warning,
                detail: format!("Not granted: {}", not_granted.join(", ")),
            }
        }
    }

    /// Attempt to populate the cache on the spot when it is missing.
    async fn check_review_cache(&self, review_id: &str) -> CheckReport {
        if !self.cache.is_cached_for_offline(review_id).await {
            if let Err(error) = self.cache.cache_review_for_offline(review_id).await {
                tracing::warn!(review_id, %error, "Preflight cache attempt failed");
            }
        }

        if self.cache.is_cached_for_offline(review_id).await {
            CheckReport {
                name: "review-cache",
                outcome: CheckOutcome::Pass,
                detail: "Review data cached for offline use".to_string(),
            }
        } else {
            CheckReport {
                name: "review-cache",
                outcome: CheckOutcome::Warning,
                detail: "Review data not cached; reference data will be unavailable offline"
                    .to_string(),
            }
        }
    }

    fn check_free_space(&self) -> CheckReport {
        let estimate = self.storage.storage_estimate();
        match estimate.free_bytes() {
            None => CheckReport {
                name: "free-space",
                outcome: CheckOutcome::Warning,
                detail: "Storage quota unknown".to_string(),
            },
            Some(free) if free < self.min_free_bytes / 4 => CheckReport {
                name: "free-space",
                outcome: CheckOutcome::Fail,
                detail: format!("Only {free} bytes free; storage is effectively exhausted"),
            },
            Some(free) if free < self.min_free_bytes => CheckReport {
                name: "free-space",
                outcome: CheckOutcome::Warning,
                detail: format!("Low on space: {free} bytes free"),
            },
            Some(free) => CheckReport {
                name: "free-space",
                outcome: CheckOutcome::Pass,
                detail: format!("{free} bytes free"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GrantedProbe;

    impl PermissionProbe for GrantedProbe {
        fn status(&self, _capability: Capability) -> PermissionState {
            PermissionState::Granted
        }
    }

    struct DeniedCameraProbe;

    impl PermissionProbe for DeniedCameraProbe {
        fn status(&self, capability: Capability) -> PermissionState {
            if capability == Capability::Camera {
                PermissionState::Denied
            } else {
                PermissionState::Granted
            }
        }
    }

    async fn runner(
        dir: &tempfile::TempDir,
        quota: Option<u64>,
        permissions: Arc<dyn PermissionProbe>,
    ) -> PreflightRunner {
        let store = FieldStore::open_in_memory().await.unwrap();
        let storage =
            StorageManager::new(store.clone(), Some(dir.path().to_path_buf()), quota);
        // unreachable API: cache population attempts fail silently
        let cache = Arc::new(CacheManager::new(dir.path().join("cache"), "http://127.0.0.1:9").unwrap());
        PreflightRunner::new(store, storage, cache, permissions)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ready_when_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(&dir, Some(1024 * 1024 * 1024), Arc::new(GrantedProbe)).await;

        let mut seen = Vec::new();
        let report = runner
            .run("rev-1", |check| seen.push(check.name))
            .await
            .unwrap();

        // sequential order, reported incrementally
        assert_eq!(
            seen,
            vec!["local-store", "permissions", "review-cache", "free-space"]
        );
        assert!(report.ready);

        let outcome_of = |name: &str| {
            report
                .checks
                .iter()
                .find(|check| check.name == name)
                .unwrap()
                .outcome
        };
        assert_eq!(outcome_of("local-store"), CheckOutcome::Pass);
        assert_eq!(outcome_of("permissions"), CheckOutcome::Pass);
        // cache could not be populated against the unreachable API
        assert_eq!(outcome_of("review-cache"), CheckOutcome::Warning);
        assert_eq!(outcome_of("free-space"), CheckOutcome::Pass);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn denied_permission_warns_but_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            &dir,
            Some(1024 * 1024 * 1024),
            Arc::new(DeniedCameraProbe),
        )
        .await;

        let report = runner.run("rev-1", |_| {}).await.unwrap();
        assert!(report.ready);

        let permissions = report
            .checks
            .iter()
            .find(|check| check.name == "permissions")
            .unwrap();
        assert_eq!(permissions.outcome, CheckOutcome::Warning);
        assert!(permissions.detail.contains("camera"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn severe_storage_exhaustion_blocks_departure() {
        let dir = tempfile::tempdir().unwrap();
        // quota smaller than what the directory already holds
        std::fs::write(dir.path().join("blob.bin"), vec![0u8; 4096]).unwrap();
        let runner = runner(&dir, Some(4096), Arc::new(GrantedProbe)).await;

        let report = runner.run("rev-1", |_| {}).await.unwrap();
        assert!(!report.ready);

        let free_space = report
            .checks
            .iter()
            .find(|check| check.name == "free-space")
            .unwrap();
        assert_eq!(free_space.outcome, CheckOutcome::Fail);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_quota_warns() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(&dir, None, Arc::new(UnknownPermissionProbe)).await;

        let report = runner.run("rev-1", |_| {}).await.unwrap();
        assert!(report.ready);

        let free_space = report
            .checks
            .iter()
            .find(|check| check.name == "free-space")
            .unwrap();
        assert_eq!(free_space.outcome, CheckOutcome::Warning);
    }
}

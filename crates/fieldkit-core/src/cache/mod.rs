//! Read-side reference-data cache for offline operation.
//!
//! Write-side changes go through the sync queue; this cache is the other
//! direction: reference data a reviewer needs to *read* in the field
//! (review detail, checklist template, roster, documents, questionnaire
//! structures), fetched while connected and kept on disk per review.
//! Population is best-effort: an endpoint that fails is skipped silently
//! and picked up on the next caching request, with no retry loop.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Cache entry key for the primary review-detail payload.
pub const REVIEW_DETAIL_KEY: &str = "review-detail";

/// Cache entry key for the checklist template, read back when a checklist
/// is initialized offline.
pub const CHECKLIST_TEMPLATE_KEY: &str = "checklist-template";

const INDEX_FILE: &str = "cached_reviews.json";

/// Disk-backed cache of remote read endpoints, keyed by review id.
pub struct CacheManager {
    cache_dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl CacheManager {
    /// Build a cache over a directory and the remote read API.
    pub fn new(cache_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_text_option(Some(base_url.into()))
            .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        if !is_http_url(&base_url) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client: {error}")))?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            base_url,
            client,
        })
    }

    /// The fixed set of endpoints a review needs for offline reading.
    fn offline_endpoints(review_id: &str) -> Vec<(&'static str, &'static str, serde_json::Value)> {
        vec![
            (
                REVIEW_DETAIL_KEY,
                "/v1/reviews/detail",
                serde_json::json!({ "reviewId": review_id }),
            ),
            (
                CHECKLIST_TEMPLATE_KEY,
                "/v1/reviews/checklist-template",
                serde_json::json!({ "reviewId": review_id }),
            ),
            (
                "team-roster",
                "/v1/reviews/team",
                serde_json::json!({ "reviewId": review_id }),
            ),
            (
                "documents",
                "/v1/reviews/documents",
                serde_json::json!({ "reviewId": review_id }),
            ),
            (
                "questionnaire-self-assessment",
                "/v1/questionnaires/structure",
                serde_json::json!({ "questionnaireType": "self-assessment" }),
            ),
            (
                "questionnaire-on-site",
                "/v1/questionnaires/structure",
                serde_json::json!({ "questionnaireType": "on-site" }),
            ),
        ]
    }

    /// Fetch and persist everything a review needs offline.
    ///
    /// Individual fetch failures are skipped; the return value is how many
    /// entries were stored this pass.
    pub async fn cache_review_for_offline(&self, review_id: &str) -> Result<usize> {
        let mut stored = 0;
        for (key, route, input) in Self::offline_endpoints(review_id) {
            match self.fetch(route, &input).await {
                Ok(body) => {
                    self.store_entry(review_id, key, &body).await?;
                    stored += 1;
                }
                Err(error) => {
                    tracing::warn!(review_id, key, %error, "Skipping cache entry");
                }
            }
        }

        if stored > 0 {
            self.index_review(review_id).await?;
        }
        tracing::info!(review_id, stored, "Review cache pass finished");
        Ok(stored)
    }

    /// Delegate a caching pass to a background task.
    pub fn cache_in_background(
        self: &Arc<Self>,
        review_id: impl Into<String>,
    ) -> tokio::task::JoinHandle<Result<usize>> {
        let manager = Arc::clone(self);
        let review_id = review_id.into();
        tokio::spawn(async move { manager.cache_review_for_offline(&review_id).await })
    }

    /// Whether the primary review-detail entry is present.
    pub async fn is_cached_for_offline(&self, review_id: &str) -> bool {
        tokio::fs::try_exists(self.entry_path(review_id, REVIEW_DETAIL_KEY))
            .await
            .unwrap_or(false)
    }

    /// Read a cached payload back, if present.
    pub async fn read_cached(&self, review_id: &str, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(review_id, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Evict every cached entry for a review.
    pub async fn clear_review_cache(&self, review_id: &str) -> Result<()> {
        let dir = self.review_dir(review_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        let mut index = self.read_index().await?;
        index.retain(|cached| cached != review_id);
        self.write_index(&index).await
    }

    /// Review ids with at least one cached entry, for fast enumeration.
    pub async fn cached_reviews(&self) -> Result<Vec<String>> {
        self.read_index().await
    }

    async fn fetch(&self, route: &str, input: &serde_json::Value) -> Result<String> {
        let encoded = urlencoding::encode(&input.to_string()).into_owned();
        let url = format!("{}{route}?input={encoded}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::InvalidInput(compact_text(&error.to_string())))?;

        if !response.status().is_success() {
            return Err(Error::InvalidInput(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|error| Error::InvalidInput(compact_text(&error.to_string())))
    }

    async fn store_entry(&self, review_id: &str, key: &str, body: &str) -> Result<()> {
        let dir = self.review_dir(review_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.entry_path(review_id, key), body).await?;
        Ok(())
    }

    async fn index_review(&self, review_id: &str) -> Result<()> {
        let mut index = self.read_index().await?;
        if !index.iter().any(|cached| cached == review_id) {
            index.push(review_id.to_string());
            self.write_index(&index).await?;
        }
        Ok(())
    }

    async fn read_index(&self) -> Result<Vec<String>> {
        let path = self.cache_dir.join(INDEX_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(serde_json::from_str(&body)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    async fn write_index(&self, index: &[String]) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let body = serde_json::to_string_pretty(index)?;
        tokio::fs::write(self.cache_dir.join(INDEX_FILE), body).await?;
        Ok(())
    }

    fn review_dir(&self, review_id: &str) -> PathBuf {
        self.cache_dir.join("reviews").join(review_id)
    }

    fn entry_path(&self, review_id: &str, key: &str) -> PathBuf {
        self.review_dir(review_id).join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &tempfile::TempDir) -> CacheManager {
        // nothing listens on this port, so every fetch fails
        CacheManager::new(dir.path(), "http://127.0.0.1:9").unwrap()
    }

    #[test]
    fn new_rejects_invalid_base_urls() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CacheManager::new(dir.path(), "").is_err());
        assert!(CacheManager::new(dir.path(), "api.example.com").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_fetches_are_tolerated_silently() {
        let dir = tempfile::tempdir().unwrap();
        let cache = manager(&dir);

        let stored = cache.cache_review_for_offline("rev-1").await.unwrap();
        assert_eq!(stored, 0);
        assert!(!cache.is_cached_for_offline("rev-1").await);
        assert!(cache.cached_reviews().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stored_entries_are_indexed_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = manager(&dir);

        cache
            .store_entry("rev-1", REVIEW_DETAIL_KEY, r#"{"id":"rev-1"}"#)
            .await
            .unwrap();
        cache
            .store_entry("rev-1", "checklist-template", r#"{"lines":[]}"#)
            .await
            .unwrap();
        cache.index_review("rev-1").await.unwrap();
        cache.index_review("rev-1").await.unwrap(); // no duplicate

        assert!(cache.is_cached_for_offline("rev-1").await);
        assert_eq!(cache.cached_reviews().await.unwrap(), vec!["rev-1"]);
        assert_eq!(
            cache
                .read_cached("rev-1", REVIEW_DETAIL_KEY)
                .await
                .unwrap()
                .as_deref(),
            Some(r#"{"id":"rev-1"}"#)
        );
        assert!(cache
            .read_cached("rev-1", "missing-key")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_review_cache_evicts_entries_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let cache = manager(&dir);

        cache
            .store_entry("rev-1", REVIEW_DETAIL_KEY, "{}")
            .await
            .unwrap();
        cache.index_review("rev-1").await.unwrap();
        cache
            .store_entry("rev-2", REVIEW_DETAIL_KEY, "{}")
            .await
            .unwrap();
        cache.index_review("rev-2").await.unwrap();

        cache.clear_review_cache("rev-1").await.unwrap();

        assert!(!cache.is_cached_for_offline("rev-1").await);
        assert!(cache.is_cached_for_offline("rev-2").await);
        assert_eq!(cache.cached_reviews().await.unwrap(), vec!["rev-2"]);

        // clearing an absent review is a no-op
        cache.clear_review_cache("rev-9").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn background_delegation_runs_the_same_pass() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(manager(&dir));

        let handle = cache.cache_in_background("rev-1");
        let stored = handle.await.unwrap().unwrap();
        assert_eq!(stored, 0);
    }
}

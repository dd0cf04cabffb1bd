//! Shared context and helpers for the command implementations.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use fieldkit_core::cache::CacheManager;
use fieldkit_core::models::ChecklistTemplateLine;
use fieldkit_core::storage::StorageManager;
use fieldkit_core::sync::{SyncApiClient, SyncEngine, SyncEngineConfig, SyncHandlers};
use fieldkit_core::{FieldStore, FieldworkConfig};

use crate::error::CliError;

/// Resolved configuration and directories shared by every command.
pub struct AppContext {
    pub config: FieldworkConfig,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppContext {
    /// Resolve directories from the flag, the environment, and the
    /// platform default, in that order.
    pub fn resolve(data_dir_flag: Option<PathBuf>) -> Self {
        let config = FieldworkConfig::from_env();
        let data_dir = data_dir_flag
            .or_else(|| config.data_dir.clone())
            .unwrap_or_else(default_data_dir);
        let cache_dir = config
            .cache_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("cache"));
        tracing::debug!(data_dir = %data_dir.display(), "Resolved data directory");

        Self {
            config,
            data_dir,
            cache_dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("fieldkit.db")
    }

    pub async fn open_store(&self) -> Result<FieldStore, CliError> {
        Ok(FieldStore::open_path(self.db_path()).await?)
    }

    pub fn cache_manager(&self) -> Result<CacheManager, CliError> {
        let base_url = self.config.require_api_base_url()?;
        Ok(CacheManager::new(self.cache_dir.clone(), base_url)?)
    }

    pub fn storage_manager(&self, store: FieldStore) -> StorageManager {
        StorageManager::new(store, Some(self.data_dir.clone()), self.config.quota_bytes)
    }

    pub fn sync_engine(&self, store: FieldStore) -> Result<SyncEngine, CliError> {
        let base_url = self.config.require_api_base_url()?;
        let api = SyncApiClient::new(base_url).map_err(CliError::NotConfigured)?;
        let handlers = Arc::new(SyncHandlers::wired(api, store.clone()));
        Ok(SyncEngine::new(store, handlers, SyncEngineConfig::default()))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldkit")
}

/// Parse a typed entity id from operator input.
pub fn parse_id<T>(raw: &str) -> Result<T, CliError>
where
    T: FromStr,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyId);
    }
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidId(trimmed.to_string()))
}

/// Guess a MIME type from the file extension of a captured artifact.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "ogg" | "opus" => Some("audio/ogg"),
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

/// Checklist templates arrive either as a bare array of lines or wrapped
/// in a `{"lines": [...]}` object, depending on the serving endpoint.
pub fn parse_template_lines(
    review_id: &str,
    body: &str,
) -> Result<Vec<ChecklistTemplateLine>, CliError> {
    #[derive(Deserialize)]
    struct TemplatePayload {
        lines: Vec<ChecklistTemplateLine>,
    }

    if let Ok(lines) = serde_json::from_str::<Vec<ChecklistTemplateLine>>(body) {
        return Ok(lines);
    }
    if let Ok(payload) = serde_json::from_str::<TemplatePayload>(body) {
        return Ok(payload.lines);
    }
    Err(CliError::MalformedTemplate(review_id.to_string()))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

//! HTTP client for the remote sync boundary.
//!
//! One call per push. The server's response contract is uniform across
//! endpoints: 2xx success (body ignored), 409 conflict, 5xx retryable,
//! any other 4xx a permanent failure whose message reaches the operator.

use reqwest::multipart;

use crate::models::EvidenceMetadata;
use crate::util::{is_http_url, normalize_text_option};

use super::{classify_response, PushError};

/// HTTP client for the per-entity sync endpoints.
#[derive(Debug, Clone)]
pub struct SyncApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl SyncApiClient {
    /// Build a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, String> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| format!("Failed to construct HTTP client: {error}"))?;
        Ok(Self { base_url, client })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Push a checklist item snapshot.
    pub async fn push_checklist_item(
        &self,
        payload: &serde_json::Value,
    ) -> Result<(), PushError> {
        self.post_json("/v1/sync/checklist-items", payload).await
    }

    /// Push a draft finding snapshot.
    pub async fn push_draft_finding(&self, payload: &serde_json::Value) -> Result<(), PushError> {
        self.post_json("/v1/sync/draft-findings", payload).await
    }

    /// Push an offline session audit record.
    pub async fn push_offline_session(
        &self,
        payload: &serde_json::Value,
    ) -> Result<(), PushError> {
        self.post_json("/v1/sync/offline-sessions", payload).await
    }

    /// Upload evidence bytes with their JSON metadata sidecar.
    ///
    /// The blob travels as the `file` part; ids, GPS, capture time, and the
    /// annotation marker travel as the `metadata` part.
    pub async fn upload_evidence(
        &self,
        metadata: &EvidenceMetadata,
        data: &[u8],
    ) -> Result<(), PushError> {
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|error| PushError::Permanent(format!("Invalid metadata: {error}")))?;

        let file_part = multipart::Part::bytes(data.to_vec())
            .file_name(metadata.file_name.clone())
            .mime_str(&metadata.mime_type)
            .map_err(|error| PushError::Permanent(format!("Invalid MIME type: {error}")))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("metadata", metadata_json);

        let response = self
            .client
            .post(format!("{}/v1/sync/evidence", self.base_url))
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await
    }

    /// Delete an evidence record remotely by id.
    pub async fn delete_evidence(&self, id: &str) -> Result<(), PushError> {
        self.post_json(
            "/v1/sync/evidence/delete",
            &serde_json::json!({ "id": id }),
        )
        .await
    }

    async fn post_json(&self, route: &str, payload: &serde_json::Value) -> Result<(), PushError> {
        let response = self
            .client
            .post(format!("{}{route}", self.base_url))
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await?;

        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<(), PushError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status, &body))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, String> {
    let base = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| "API base URL must not be empty".to_string())?;
    let base = base.trim_end_matches('/').to_string();
    if !is_http_url(&base) {
        return Err("API base URL must include http:// or https://".to_string());
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("example.com").is_err());
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.example.com/").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn client_exposes_configured_base_url() {
        let client = SyncApiClient::new("https://api.example.com/").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }
}

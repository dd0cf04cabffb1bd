//! Push-side synchronization: remote client, per-entity handlers, the queue
//! drain engine, and the connectivity monitor.

mod api;
mod connectivity;
mod engine;
mod handlers;

pub use api::SyncApiClient;
pub use connectivity::{
    ConnectivityConfig, ConnectivityMonitor, HttpReachabilityProbe, ReachabilityProbe,
};
pub use engine::{SyncEngine, SyncEngineConfig, SyncStatusSnapshot};
pub use handlers::{
    ChecklistItemHandler, DraftFindingHandler, FieldEvidenceHandler, OfflineSessionHandler,
    SyncHandler, SyncHandlers,
};

use thiserror::Error;

use crate::util::compact_text;

/// How a push attempt failed, which decides what the engine does next.
#[derive(Debug, Error)]
pub enum PushError {
    /// The remote rejected the snapshot as stale (HTTP 409). Parked for
    /// operator resolution, never auto-retried.
    #[error("Remote conflict: {0}")]
    Conflict(String),

    /// Transient server or transport failure (HTTP 5xx, network). Retried
    /// with exponential backoff until the entry's budget runs out.
    #[error("Retryable failure: {0}")]
    Retryable(String),

    /// The request can never succeed (validation, size, permission). The
    /// entry is exhausted immediately and the message surfaced verbatim.
    #[error("{0}")]
    Permanent(String),
}

impl From<reqwest::Error> for PushError {
    fn from(error: reqwest::Error) -> Self {
        // Transport problems are transient by definition out in the field
        Self::Retryable(compact_text(&error.to_string()))
    }
}

/// Classify a non-success HTTP response per the remote contract:
/// 409 conflict, 5xx retryable, any other status permanent.
pub(crate) fn classify_response(status: u16, body: &str) -> PushError {
    let message = response_message(status, body);
    match status {
        409 => PushError::Conflict(message),
        500..=599 => PushError::Retryable(message),
        _ => PushError::Permanent(message),
    }
}

fn response_message(status: u16, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} (HTTP {status})", compact_text(&message));
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("{} (HTTP {status})", compact_text(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_status_classifies_as_conflict() {
        assert!(matches!(
            classify_response(409, ""),
            PushError::Conflict(_)
        ));
    }

    #[test]
    fn server_errors_classify_as_retryable() {
        assert!(matches!(
            classify_response(500, ""),
            PushError::Retryable(_)
        ));
        assert!(matches!(
            classify_response(503, ""),
            PushError::Retryable(_)
        ));
    }

    #[test]
    fn client_errors_classify_as_permanent() {
        assert!(matches!(
            classify_response(400, ""),
            PushError::Permanent(_)
        ));
        assert!(matches!(
            classify_response(403, ""),
            PushError::Permanent(_)
        ));
        assert!(matches!(
            classify_response(404, ""),
            PushError::Permanent(_)
        ));
    }

    #[test]
    fn response_message_prefers_json_error_body() {
        let message = response_message(422, r#"{"message": "severity is required"}"#);
        assert_eq!(message, "severity is required (HTTP 422)");
    }

    #[test]
    fn response_message_falls_back_to_raw_body() {
        assert_eq!(response_message(500, ""), "HTTP 500");
        assert_eq!(
            response_message(502, "bad gateway"),
            "bad gateway (HTTP 502)"
        );
    }
}

//! Offline session audit record

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::unix_timestamp_ms;

use super::ids::SessionId;

/// Audit record of one reviewer's offline working window.
///
/// Used for the audit trail only, never for reconciliation, so it carries a
/// plain `synced_at` timestamp instead of a sync status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSession {
    /// Unique identifier.
    pub id: SessionId,
    /// Review worked on during the session.
    pub review_id: String,
    /// Reviewer who worked offline.
    pub user_id: String,
    /// Device descriptor, e.g. `tablet-a4 / android 14`.
    pub device: String,
    /// Session start (Unix ms).
    pub started_at: i64,
    /// Session end (Unix ms); `None` while the session is open.
    pub ended_at: Option<i64>,
    /// When the record was accepted remotely (Unix ms).
    pub synced_at: Option<i64>,
}

impl OfflineSession {
    /// Open a new session for a reviewer on a device.
    pub fn start(
        review_id: impl Into<String>,
        user_id: impl Into<String>,
        device: impl Into<String>,
    ) -> Result<Self> {
        let review_id = review_id.into().trim().to_string();
        let user_id = user_id.into().trim().to_string();
        let device = device.into().trim().to_string();

        if review_id.is_empty() {
            return Err(Error::InvalidInput(
                "Session review_id cannot be empty".to_string(),
            ));
        }
        if user_id.is_empty() {
            return Err(Error::InvalidInput(
                "Session user_id cannot be empty".to_string(),
            ));
        }
        if device.is_empty() {
            return Err(Error::InvalidInput(
                "Session device cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: SessionId::new(),
            review_id,
            user_id,
            device,
            started_at: unix_timestamp_ms(),
            ended_at: None,
            synced_at: None,
        })
    }

    /// Close the working window.
    pub fn close(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(unix_timestamp_ms());
        }
    }

    /// Whether the session is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_validates_inputs() {
        assert!(OfflineSession::start("", "u", "d").is_err());
        assert!(OfflineSession::start("r", " ", "d").is_err());
        assert!(OfflineSession::start("r", "u", "").is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let mut session = OfflineSession::start("rev-1", "user-7", "tablet-a4").unwrap();
        assert!(session.is_open());

        session.close();
        let first_end = session.ended_at;
        session.close();

        assert!(!session.is_open());
        assert_eq!(session.ended_at, first_end);
    }
}

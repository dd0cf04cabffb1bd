//! Database layer for Fieldkit

mod checklist_repository;
mod connection;
mod evidence_repository;
mod finding_repository;
mod migrations;
mod queue_repository;
mod session_repository;

pub use checklist_repository::{ChecklistItemRepository, SqliteChecklistItemRepository};
pub use connection::Database;
pub use evidence_repository::{EvidenceRepository, SqliteEvidenceRepository};
pub use finding_repository::{FindingRepository, SqliteFindingRepository};
pub use queue_repository::{QueueCounts, QueueRepository, SqliteQueueRepository};
pub use session_repository::{SessionRepository, SqliteSessionRepository};

use std::str::FromStr;

/// Parse a TEXT column into a domain type inside a row-mapping closure.
pub(crate) fn parse_column<T>(index: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

/// Assemble an optional GPS fix from three nullable REAL columns.
pub(crate) fn gps_from_columns(
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
) -> Option<crate::models::GpsFix> {
    match (latitude, longitude, accuracy) {
        (Some(latitude), Some(longitude), Some(accuracy)) => Some(crate::models::GpsFix {
            latitude,
            longitude,
            accuracy,
        }),
        _ => None,
    }
}

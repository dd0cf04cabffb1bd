//! Entity identifier newtypes.
//!
//! All local records use UUID v7 identifiers so that lexicographic id order
//! matches creation order, which the sync queue relies on for FIFO drains.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique identifier using UUID v7.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Get the string representation of this ID.
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

entity_id! {
    /// Identifier for a checklist line item.
    ChecklistItemId
}

entity_id! {
    /// Identifier for a captured evidence record.
    EvidenceId
}

entity_id! {
    /// Identifier for a draft finding.
    FindingId
}

entity_id! {
    /// Identifier for a sync queue entry.
    QueueEntryId
}

entity_id! {
    /// Identifier for an offline working session.
    SessionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ChecklistItemId::new(), ChecklistItemId::new());
        assert_ne!(EvidenceId::new(), EvidenceId::new());
    }

    #[test]
    fn ids_round_trip_through_strings() {
        let id = FindingId::new();
        let parsed: FindingId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn queue_entry_ids_sort_by_creation() {
        let first = QueueEntryId::new();
        let second = QueueEntryId::new();
        assert!(first < second);
    }
}

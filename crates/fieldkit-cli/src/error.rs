//! CLI error type

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldkit_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Identifier cannot be empty")]
    EmptyId,
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("No cached checklist template for review {0}; run `fieldkit cache --review {0}` while online")]
    NoCachedTemplate(String),
    #[error("Unrecognized checklist template payload for review {0}")]
    MalformedTemplate(String),
    #[error("Cannot determine a MIME type for {0}; pass --mime")]
    UnknownMimeType(String),
    #[error("{0}")]
    NotConfigured(String),
}

//! fieldkit-core - Core library for Fieldkit
//!
//! Offline fieldwork sync subsystem for on-site audit reviews: the local
//! persistent store, the sync queue and its drain engine, per-entity push
//! handlers, the connectivity monitor, and the storage/cache managers that
//! keep local storage bounded and pre-populated for offline use.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod preflight;
pub mod services;
pub mod storage;
pub mod sync;
pub mod util;

pub use config::FieldworkConfig;
pub use error::{Error, Result};
pub use services::FieldStore;
pub use sync::{PushError, SyncEngine};

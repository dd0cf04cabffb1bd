//! Service facades over the database layer.

mod store;

pub use store::FieldStore;

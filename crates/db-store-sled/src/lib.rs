//! Sled-backed implementation of the indexer store.

pub mod table;

mod macros;
mod schemas;
mod store;

pub use store::{SledIndexerStore, DB_SCHEMA_VERSION};

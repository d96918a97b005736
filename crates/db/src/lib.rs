//! Database trait definitions for the staking indexer.

mod errors;
mod traits;

pub use errors::{DbError, DbResult};
pub use traits::IndexerDatabase;

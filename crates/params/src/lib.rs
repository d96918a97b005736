//! Versioned protocol parameters.
//!
//! The protocol rotates covenant sets and fee/time limits by publishing a
//! new parameter version with an activation height.  Classification of a
//! transaction always uses the version active at its inclusion height, so
//! history never needs re-indexing after a rotation.

mod serde_helpers;
mod versions;

pub use versions::{ParamsError, ParamsVersion, ParamsVersions};

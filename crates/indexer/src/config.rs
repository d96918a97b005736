use serde::{Deserialize, Serialize};

use crate::emitter::RetryConfig;

/// Runtime knobs of the indexer core.  Everything else (params, store,
/// collaborators) arrives through the constructor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Retry budget for event emission.
    pub emitter: RetryConfig,
}

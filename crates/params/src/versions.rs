use std::path::Path;

use bitcoin::{Amount, Network, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_helpers::{serde_amount_sat, serde_tag_hex};

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read param file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse param file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("param file contains no versions")]
    Empty,

    #[error("activation heights must be strictly ascending (version {0})")]
    UnorderedActivationHeights(u32),

    #[error("version {version}: {reason}")]
    InvalidVersion { version: u32, reason: String },

    #[error("all versions must target the same network")]
    MixedNetworks,

    #[error("no params version covers height {0}")]
    NoVersionForHeight(u64),
}

/// One version of the protocol parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamsVersion {
    pub version: u32,

    /// First height this version applies to.
    pub activation_height: u64,

    /// 4-byte tag identifying protocol traffic in OP_RETURN outputs.
    #[serde(with = "serde_tag_hex")]
    pub tag: [u8; 4],

    pub covenant_pks: Vec<XOnlyPublicKey>,

    pub covenant_quorum: u32,

    /// Timelock on the unbonding output, blocks.
    pub unbonding_time: u16,

    #[serde(with = "serde_amount_sat")]
    pub unbonding_fee: Amount,

    #[serde(with = "serde_amount_sat")]
    pub min_staking_value: Amount,

    #[serde(with = "serde_amount_sat")]
    pub max_staking_value: Amount,

    pub min_staking_time: u16,

    pub max_staking_time: u16,

    pub network: Network,
}

impl ParamsVersion {
    fn validate(&self) -> Result<(), ParamsError> {
        let fail = |reason: &str| ParamsError::InvalidVersion {
            version: self.version,
            reason: reason.to_owned(),
        };

        if self.covenant_pks.is_empty() {
            return Err(fail("empty covenant set"));
        }
        if self.covenant_quorum == 0 {
            return Err(fail("covenant quorum must be positive"));
        }
        if self.covenant_quorum as usize > self.covenant_pks.len() {
            return Err(fail("covenant quorum exceeds covenant set size"));
        }
        if self.min_staking_value > self.max_staking_value {
            return Err(fail("min staking value exceeds max"));
        }
        if self.min_staking_time > self.max_staking_time {
            return Err(fail("min staking time exceeds max"));
        }
        Ok(())
    }
}

/// The ordered list of parameter versions, immutable after load.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamsVersions {
    versions: Vec<ParamsVersion>,
}

impl ParamsVersions {
    /// Validates and wraps an already-parsed version list.
    pub fn new(versions: Vec<ParamsVersion>) -> Result<Self, ParamsError> {
        if versions.is_empty() {
            return Err(ParamsError::Empty);
        }

        for pair in versions.windows(2) {
            if pair[1].activation_height <= pair[0].activation_height {
                return Err(ParamsError::UnorderedActivationHeights(pair[1].version));
            }
        }

        let network = versions[0].network;
        for v in &versions {
            v.validate()?;
            if v.network != network {
                return Err(ParamsError::MixedNetworks);
            }
        }

        Ok(Self { versions })
    }

    /// Reads and validates the JSON param file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let raw = std::fs::read_to_string(path)?;
        let versions: Vec<ParamsVersion> = serde_json::from_str(&raw)?;
        Self::new(versions)
    }

    /// Returns the version whose activation height is the greatest not
    /// exceeding `height`.
    pub fn params_at(&self, height: u64) -> Result<&ParamsVersion, ParamsError> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.activation_height <= height)
            .ok_or(ParamsError::NoVersionForHeight(height))
    }

    pub fn versions(&self) -> &[ParamsVersion] {
        &self.versions
    }
}

use bitcoin::Txid;
use serde::{Deserialize, Serialize};

use crate::records::{RecordError, StoredStakingTx, StoredUnbondingTx};

/// Event pushed downstream when a staking transaction is indexed.
///
/// Field layout is a stable wire schema; consumers deduplicate by
/// `staking_tx_hash_hex`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStakingEvent {
    pub staking_tx_hash_hex: String,
    pub staker_pk_hex: String,
    pub finality_provider_pk_hex: String,
    pub staking_value: u64,
    pub staking_start_height: u64,
    pub staking_start_timestamp: u64,
    pub staking_time: u32,
    pub staking_output_index: u32,
    pub is_overflow: bool,
}

impl ActiveStakingEvent {
    pub fn from_record(record: &StoredStakingTx) -> Result<Self, RecordError> {
        Ok(Self {
            staking_tx_hash_hex: record.tx_hash()?.to_string(),
            staker_pk_hex: hex::encode(record.staker_pk_bytes()),
            finality_provider_pk_hex: hex::encode(record.finality_provider_pk_bytes()),
            staking_value: record.staking_value().to_sat(),
            staking_start_height: record.inclusion_height(),
            staking_start_timestamp: record.inclusion_timestamp(),
            staking_time: record.staking_time(),
            staking_output_index: record.staking_output_idx(),
            is_overflow: record.is_overflow(),
        })
    }
}

/// Event pushed downstream when an unbonding transaction is indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingStakingEvent {
    pub unbonding_tx_hash_hex: String,
    pub staking_tx_hash_hex: String,
    pub unbonding_start_height: u64,
    pub unbonding_start_timestamp: u64,
}

impl UnbondingStakingEvent {
    pub fn from_record(record: &StoredUnbondingTx) -> Result<Self, RecordError> {
        Ok(Self {
            unbonding_tx_hash_hex: record.tx_hash()?.to_string(),
            staking_tx_hash_hex: record.staking_tx_hash().to_string(),
            unbonding_start_height: record.inclusion_height(),
            unbonding_start_timestamp: record.inclusion_timestamp(),
        })
    }
}

/// Event pushed downstream when a staking output is spent through the
/// timelock path.  Withdrawals are not persisted; the event is the only
/// artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawStakingEvent {
    pub staking_tx_hash_hex: String,
}

impl WithdrawStakingEvent {
    pub fn new(staking_tx_hash: Txid) -> Self {
        Self {
            staking_tx_hash_hex: staking_tx_hash.to_string(),
        }
    }
}

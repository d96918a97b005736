use bitcoin::{
    consensus,
    hashes::Hash,
    Amount, Transaction, Txid, XOnlyPublicKey,
};
use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

/// Errors decoding the embedded fields of a stored record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid consensus tx bytes: {0}")]
    InvalidTxBytes(#[from] consensus::encode::Error),

    #[error("invalid x-only public key bytes")]
    InvalidPublicKey(#[from] bitcoin::secp256k1::Error),
}

/// A recognized staking transaction as persisted in the store.
///
/// The raw transaction is kept in consensus encoding so the record
/// round-trips byte-exact through borsh; decoded views are produced on
/// demand.  Records are created once and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoredStakingTx {
    /// Consensus-serialized transaction.
    tx_bytes: Vec<u8>,

    /// Staker public key, x-only.
    staker_pk: [u8; 32],

    /// Finality provider public key, x-only.
    finality_provider_pk: [u8; 32],

    /// Staking period in blocks.
    staking_time: u32,

    /// Value of the staking output, satoshi.
    staking_value: u64,

    /// Index of the staking output within the transaction.
    staking_output_idx: u32,

    /// Height of the block the transaction was included in.
    inclusion_height: u64,

    /// Header timestamp of the inclusion block, unix seconds.
    inclusion_timestamp: u64,

    /// Set when the staking value or time fell outside the active caps.
    /// Overflow records are indexed and emitted for auditability.
    is_overflow: bool,
}

impl StoredStakingTx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx: &Transaction,
        staker_pk: &XOnlyPublicKey,
        finality_provider_pk: &XOnlyPublicKey,
        staking_time: u32,
        staking_value: Amount,
        staking_output_idx: u32,
        inclusion_height: u64,
        inclusion_timestamp: u64,
        is_overflow: bool,
    ) -> Self {
        Self {
            tx_bytes: consensus::serialize(tx),
            staker_pk: staker_pk.serialize(),
            finality_provider_pk: finality_provider_pk.serialize(),
            staking_time,
            staking_value: staking_value.to_sat(),
            staking_output_idx,
            inclusion_height,
            inclusion_timestamp,
            is_overflow,
        }
    }

    /// Decodes the embedded transaction.
    pub fn tx(&self) -> Result<Transaction, RecordError> {
        Ok(consensus::deserialize(&self.tx_bytes)?)
    }

    /// Hash of the embedded transaction.
    pub fn tx_hash(&self) -> Result<Txid, RecordError> {
        Ok(self.tx()?.compute_txid())
    }

    pub fn staker_pk(&self) -> Result<XOnlyPublicKey, RecordError> {
        Ok(XOnlyPublicKey::from_slice(&self.staker_pk)?)
    }

    pub fn finality_provider_pk(&self) -> Result<XOnlyPublicKey, RecordError> {
        Ok(XOnlyPublicKey::from_slice(&self.finality_provider_pk)?)
    }

    pub fn staker_pk_bytes(&self) -> &[u8; 32] {
        &self.staker_pk
    }

    pub fn finality_provider_pk_bytes(&self) -> &[u8; 32] {
        &self.finality_provider_pk
    }

    pub fn staking_time(&self) -> u32 {
        self.staking_time
    }

    pub fn staking_value(&self) -> Amount {
        Amount::from_sat(self.staking_value)
    }

    pub fn staking_output_idx(&self) -> u32 {
        self.staking_output_idx
    }

    pub fn inclusion_height(&self) -> u64 {
        self.inclusion_height
    }

    pub fn inclusion_timestamp(&self) -> u64 {
        self.inclusion_timestamp
    }

    pub fn is_overflow(&self) -> bool {
        self.is_overflow
    }
}

/// A recognized unbonding transaction as persisted in the store.
///
/// Links back to its staking record by hash; the reverse direction lives
/// in the store's secondary index.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoredUnbondingTx {
    /// Consensus-serialized transaction.
    tx_bytes: Vec<u8>,

    /// Hash of the staking transaction whose output this tx spends.
    staking_tx_hash: [u8; 32],

    /// Height of the block the transaction was included in.
    inclusion_height: u64,

    /// Header timestamp of the inclusion block, unix seconds.
    inclusion_timestamp: u64,
}

impl StoredUnbondingTx {
    pub fn new(
        tx: &Transaction,
        staking_tx_hash: Txid,
        inclusion_height: u64,
        inclusion_timestamp: u64,
    ) -> Self {
        Self {
            tx_bytes: consensus::serialize(tx),
            staking_tx_hash: staking_tx_hash.to_byte_array(),
            inclusion_height,
            inclusion_timestamp,
        }
    }

    pub fn tx(&self) -> Result<Transaction, RecordError> {
        Ok(consensus::deserialize(&self.tx_bytes)?)
    }

    pub fn tx_hash(&self) -> Result<Txid, RecordError> {
        Ok(self.tx()?.compute_txid())
    }

    pub fn staking_tx_hash(&self) -> Txid {
        Txid::from_byte_array(self.staking_tx_hash)
    }

    pub fn inclusion_height(&self) -> u64 {
        self.inclusion_height
    }

    pub fn inclusion_timestamp(&self) -> u64 {
        self.inclusion_timestamp
    }
}

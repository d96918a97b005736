use bitcoin::Txid;
use borsh::{BorshDeserialize, BorshSerialize};
use sidx_types::{StoredStakingTx, StoredUnbondingTx};

use crate::macros::{
    define_table, impl_borsh_key, impl_borsh_value, impl_txid_key, impl_txid_value,
};

define_table!(
    /// Staking records keyed by staking transaction hash.
    (StakingTxTable) Txid => StoredStakingTx
);
impl_txid_key!(StakingTxTable);
impl_borsh_value!(StakingTxTable, StoredStakingTx);

define_table!(
    /// Unbonding records keyed by unbonding transaction hash.
    (UnbondingTxTable) Txid => StoredUnbondingTx
);
impl_txid_key!(UnbondingTxTable);
impl_borsh_value!(UnbondingTxTable, StoredUnbondingTx);

define_table!(
    /// Secondary index: staking hash to the unbonding hash that spent it.
    (UnbondingIndexTable) Txid => Txid
);
impl_txid_key!(UnbondingIndexTable);
impl_txid_value!(UnbondingIndexTable);

/// Keys of the meta table.
#[derive(Clone, Copy, Debug, BorshSerialize, BorshDeserialize)]
pub(crate) enum MetaKey {
    LastProcessedHeight,
    SchemaVersion,
}

define_table!(
    /// Store-wide bookkeeping: last processed height, schema version.
    (MetaTable) MetaKey => u64
);
impl_borsh_key!(MetaTable, MetaKey);
impl_borsh_value!(MetaTable, u64);

use bitcoin::Txid;
use sidx_types::{StoredStakingTx, StoredUnbondingTx};

use crate::DbResult;

/// Durable store for staking and unbonding records.
///
/// Records are written once and never mutated.  Writers are serialized
/// through the ingest worker; readers may be concurrent.  Multi-key
/// writes are atomic so a crash never exposes a half-written state.
pub trait IndexerDatabase: Send + Sync + 'static {
    /// Persists a staking record keyed by its transaction hash.  Returns
    /// [`DbError::AlreadyExists`](crate::DbError::AlreadyExists) if the
    /// hash is already indexed; replaying callers treat that as success.
    fn put_staking_tx(&self, record: &StoredStakingTx) -> DbResult<()>;

    fn get_staking_tx(&self, tx_hash: &Txid) -> DbResult<Option<StoredStakingTx>>;

    /// Persists an unbonding record and the reverse index from its
    /// staking hash, atomically.  Returns `AlreadyExists` if either the
    /// unbonding hash is already indexed or the staking hash already has
    /// an unbonding (first one wins).
    fn put_unbonding_tx(&self, record: &StoredUnbondingTx) -> DbResult<()>;

    fn get_unbonding_tx(&self, tx_hash: &Txid) -> DbResult<Option<StoredUnbondingTx>>;

    /// Reverse lookup through the secondary index.
    fn get_unbonding_tx_by_staking(&self, staking_tx_hash: &Txid) -> DbResult<Option<Txid>>;

    fn get_last_processed_height(&self) -> DbResult<Option<u64>>;

    /// Monotonic: writing a height below the current one fails with
    /// `NonMonotonicHeight`.  Rewriting the current height is permitted
    /// (block replay after a crash).
    fn set_last_processed_height(&self, height: u64) -> DbResult<()>;
}

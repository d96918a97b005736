use sidx_btcstaking::StakingTxError;
use sidx_db::DbError;
use sidx_params::ParamsError;
use sidx_types::RecordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    /// The candidate spends a known staking output but does not match the
    /// canonical unbonding template.  Distinguishes a forged or
    /// misconfigured unbonding from an unrelated transaction.
    #[error("unbonding transaction does not match the canonical template")]
    InvalidUnbondingTx,

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("params error: {0}")]
    Params(#[from] ParamsError),

    #[error("staking script error: {0}")]
    StakingTx(#[from] StakingTxError),

    #[error("corrupted record: {0}")]
    Record(#[from] RecordError),

    #[error("corrupted record: {0}")]
    CorruptedRecord(String),

    #[error("event emission failed after {attempts} attempts: {reason}")]
    EmissionFailed { attempts: u32, reason: String },

    #[error("indexer is shutting down")]
    ShuttingDown,

    #[error("indexer was already started")]
    AlreadyStarted,

    #[error("scanner did not hand over the confirmed-block channel")]
    BlockChannelUnavailable,

    #[error("scanner error: {0}")]
    Scanner(String),

    #[error("event consumer error: {0}")]
    Consumer(String),

    #[error("failed to spawn ingest worker: {0}")]
    WorkerSpawn(String),
}

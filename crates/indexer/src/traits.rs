use sidx_types::{
    ActiveStakingEvent, IndexedBlock, UnbondingStakingEvent, WithdrawStakingEvent,
};
use tokio::sync::mpsc;

/// Producer of confirmed blocks.
///
/// Blocks are delivered in non-decreasing height order and are final at
/// the scanner's confirmation depth; the indexer performs no reorg
/// handling of its own.  The channel is bounded so a stalled consumer
/// back-pressures the scanner.
pub trait BtcScanner: Send + Sync + 'static {
    fn start(&self, start_height: u64) -> anyhow::Result<()>;

    /// Stops block production and closes the confirmed-block channel,
    /// which is what unblocks the ingest worker.
    fn stop(&self) -> anyhow::Result<()>;

    /// Hands over the receiving end of the confirmed-block channel.
    /// Returns `None` once taken.
    fn confirmed_blocks_chan(&self) -> Option<mpsc::Receiver<IndexedBlock>>;
}

/// Downstream sink for indexer events.
///
/// A push returning `Ok` is the consumer's acknowledgement.  Delivery is
/// at-least-once; consumers deduplicate by the primary hash carried in
/// each event.
pub trait EventConsumer: Send + Sync + 'static {
    fn start(&self) -> anyhow::Result<()>;

    fn stop(&self) -> anyhow::Result<()>;

    fn push_staking_event(&self, event: &ActiveStakingEvent) -> anyhow::Result<()>;

    fn push_unbonding_event(&self, event: &UnbondingStakingEvent) -> anyhow::Result<()>;

    fn push_withdraw_event(&self, event: &WithdrawStakingEvent) -> anyhow::Result<()>;
}

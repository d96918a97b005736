use std::{
    sync::{Arc, Mutex},
    thread,
};

use bitcoin::{Transaction, Txid};
use serde::Serialize;
use sidx_db::{DbError, IndexerDatabase};
use sidx_params::ParamsVersions;
use sidx_types::{IndexedBlock, StoredStakingTx, StoredUnbondingTx};
use tokio::sync::{mpsc, watch};
use tracing::*;

use crate::{
    classifier::{classify_tx, SpendInfo, StakingData, TxKind},
    config::IndexerConfig,
    emitter::EventEmitter,
    error::IndexerError,
    shutdown::{shutdown_pair, ShutdownGuard, ShutdownSignal},
    traits::{BtcScanner, EventConsumer},
    validator::{check_unbonding_tx, is_timelock_path_spend},
};

/// Observable lifecycle of the ingest worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IndexerStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Shared state the worker needs per block; immutable after `new`.
struct IndexerContext<D> {
    db: Arc<D>,
    params: Arc<ParamsVersions>,
    emitter: EventEmitter,
}

/// The staking indexer service handle.
///
/// Owns a single ingest worker thread that drains the confirmed-block
/// channel.  The store handle is shared, not owned: `stop` never closes
/// the database.
pub struct StakingIndexer<D> {
    ctx: Arc<IndexerContext<D>>,
    scanner: Arc<dyn BtcScanner>,
    consumer: Arc<dyn EventConsumer>,
    shutdown: ShutdownSignal,
    guard: ShutdownGuard,
    status_tx: watch::Sender<IndexerStatus>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<D: IndexerDatabase> StakingIndexer<D> {
    pub fn new(
        cfg: IndexerConfig,
        consumer: Arc<dyn EventConsumer>,
        db: Arc<D>,
        params: Arc<ParamsVersions>,
        scanner: Arc<dyn BtcScanner>,
    ) -> Result<Self, IndexerError> {
        let emitter = EventEmitter::new(consumer.clone(), cfg.emitter);
        let (shutdown, guard) = shutdown_pair();
        let (status_tx, _status_rx) = watch::channel(IndexerStatus::Idle);

        Ok(Self {
            ctx: Arc::new(IndexerContext {
                db,
                params,
                emitter,
            }),
            scanner,
            consumer,
            shutdown,
            guard,
            status_tx,
            worker: Mutex::new(None),
        })
    }

    pub fn status(&self) -> IndexerStatus {
        *self.status_tx.borrow()
    }

    /// Subscribes to status transitions.
    pub fn status_chan(&self) -> watch::Receiver<IndexerStatus> {
        self.status_tx.subscribe()
    }

    /// Starts the consumer, the scanner and the ingest worker.
    ///
    /// The scanner is started at `max(start_height, last_processed + 1)`
    /// so a restart never re-requests blocks the store has fully
    /// committed.
    pub fn start(&self, start_height: u64) -> Result<(), IndexerError> {
        if self.status() != IndexerStatus::Idle {
            return Err(IndexerError::AlreadyStarted);
        }

        let effective_height = match self.ctx.db.get_last_processed_height()? {
            Some(last) => start_height.max(last + 1),
            None => start_height,
        };

        self.consumer
            .start()
            .map_err(|e| IndexerError::Consumer(e.to_string()))?;

        let block_rx = self
            .scanner
            .confirmed_blocks_chan()
            .ok_or(IndexerError::BlockChannelUnavailable)?;
        self.scanner
            .start(effective_height)
            .map_err(|e| IndexerError::Scanner(e.to_string()))?;

        let ctx = self.ctx.clone();
        let guard = self.guard.clone();
        let status_tx = self.status_tx.clone();
        let handle = thread::Builder::new()
            .name("staking-indexer".into())
            .spawn(move || {
                if let Err(e) = run_worker(&ctx, block_rx, &guard) {
                    error!(err = %e, "ingest worker failed");
                }
                let _ = status_tx.send(IndexerStatus::Stopped);
            })
            .map_err(|e| IndexerError::WorkerSpawn(e.to_string()))?;

        *self.worker.lock().expect("indexer: worker lock poisoned") = Some(handle);
        let _ = self.status_tx.send(IndexerStatus::Running);
        info!(start_height = %effective_height, "staking indexer started");
        Ok(())
    }

    /// Idempotent.  Lets the worker finish the block it is processing,
    /// then stops the scanner and the consumer.  The database stays open.
    pub fn stop(&self) -> Result<(), IndexerError> {
        if self.status() == IndexerStatus::Idle {
            let _ = self.status_tx.send(IndexerStatus::Stopped);
            return Ok(());
        }

        let handle = self
            .worker
            .lock()
            .expect("indexer: worker lock poisoned")
            .take();
        // A previous stop already tore everything down.  A worker that
        // wound down on its own (channel close, fatal error) still needs
        // the teardown below.
        if handle.is_none() && self.status() == IndexerStatus::Stopped {
            return Ok(());
        }

        let _ = self.status_tx.send(IndexerStatus::Stopping);
        self.shutdown.trigger();

        // Closing the block channel is what unblocks a worker parked on
        // recv.
        self.scanner
            .stop()
            .map_err(|e| IndexerError::Scanner(e.to_string()))?;

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("ingest worker panicked");
            }
        }

        self.consumer
            .stop()
            .map_err(|e| IndexerError::Consumer(e.to_string()))?;

        let _ = self.status_tx.send(IndexerStatus::Stopped);
        info!("staking indexer stopped");
        Ok(())
    }

    pub fn get_staking_tx_by_hash(
        &self,
        tx_hash: &Txid,
    ) -> Result<Option<StoredStakingTx>, IndexerError> {
        Ok(self.ctx.db.get_staking_tx(tx_hash)?)
    }

    pub fn get_unbonding_tx_by_hash(
        &self,
        tx_hash: &Txid,
    ) -> Result<Option<StoredUnbondingTx>, IndexerError> {
        Ok(self.ctx.db.get_unbonding_tx(tx_hash)?)
    }

    /// Inspection primitive: checks a candidate against the canonical
    /// unbonding template of `staking`, under the params active at the
    /// staking inclusion height.
    pub fn is_valid_unbonding_tx(
        &self,
        tx: &Transaction,
        staking: &StoredStakingTx,
    ) -> Result<bool, IndexerError> {
        let params = self.ctx.params.params_at(staking.inclusion_height())?;
        check_unbonding_tx(tx, staking, params)
    }

    /// Stores and emits one recognized staking transaction.  Exposed for
    /// replay tooling and tests; the worker goes through the same path.
    pub fn process_staking_tx(
        &self,
        tx: &Transaction,
        data: &StakingData,
        inclusion_height: u64,
        inclusion_timestamp: u64,
    ) -> Result<(), IndexerError> {
        process_staking(
            &self.ctx,
            &self.guard,
            tx,
            data,
            inclusion_height,
            inclusion_timestamp,
        )
    }
}

fn run_worker<D: IndexerDatabase>(
    ctx: &IndexerContext<D>,
    mut block_rx: mpsc::Receiver<IndexedBlock>,
    guard: &ShutdownGuard,
) -> anyhow::Result<()> {
    while let Some(block) = block_rx.blocking_recv() {
        if guard.should_shutdown() {
            debug!("got shutdown notification");
            break;
        }

        process_block(ctx, guard, &block)?;

        if guard.should_shutdown() {
            debug!("got shutdown notification");
            break;
        }
    }

    Ok(())
}

fn process_block<D: IndexerDatabase>(
    ctx: &IndexerContext<D>,
    guard: &ShutdownGuard,
    block: &IndexedBlock,
) -> Result<(), IndexerError> {
    let height = block.height();
    let params = ctx.params.params_at(height)?;
    debug!(%height, txs = block.txs().len(), "processing confirmed block");

    for tx in block.txs() {
        if guard.should_shutdown() {
            // The block stays uncommitted; a restart replays it and the
            // per-record writes below are idempotent.
            warn!(%height, "shutdown mid-block, leaving block uncommitted");
            return Ok(());
        }

        match classify_tx(tx, params) {
            TxKind::Staking(data) => {
                process_staking(ctx, guard, tx, &data, height, block.timestamp())?
            }
            TxKind::PossibleSpend(spend) => {
                process_spend(ctx, guard, tx, &spend, height, block.timestamp())?
            }
            TxKind::Irrelevant => (),
        }
    }

    ctx.db.set_last_processed_height(height)?;
    Ok(())
}

fn process_staking<D: IndexerDatabase>(
    ctx: &IndexerContext<D>,
    guard: &ShutdownGuard,
    tx: &Transaction,
    data: &StakingData,
    inclusion_height: u64,
    inclusion_timestamp: u64,
) -> Result<(), IndexerError> {
    let tx_hash = tx.compute_txid();
    let record = StoredStakingTx::new(
        tx,
        &data.parsed.op_return.staker_pk,
        &data.parsed.op_return.finality_provider_pk,
        u32::from(data.parsed.op_return.staking_time),
        data.parsed.staking_output.value,
        data.parsed.staking_output_idx,
        inclusion_height,
        inclusion_timestamp,
        data.is_overflow,
    );

    match ctx.db.put_staking_tx(&record) {
        Ok(()) => {
            info!(%tx_hash, height = %inclusion_height, overflow = data.is_overflow,
                "indexed staking transaction");
        }
        // Block replay after a crash: the record is present, the event
        // may not have reached the consumer, so it goes out again.
        Err(DbError::AlreadyExists) => {
            debug!(%tx_hash, "staking transaction already indexed, re-emitting");
        }
        Err(e) => return Err(e.into()),
    }

    ctx.emitter.emit_staking(&record, guard)
}

fn process_spend<D: IndexerDatabase>(
    ctx: &IndexerContext<D>,
    guard: &ShutdownGuard,
    tx: &Transaction,
    spend: &SpendInfo,
    inclusion_height: u64,
    inclusion_timestamp: u64,
) -> Result<(), IndexerError> {
    let Some(staking) = ctx.db.get_staking_tx(&spend.outpoint.txid)? else {
        return Ok(());
    };
    if spend.outpoint.vout != staking.staking_output_idx() {
        return Ok(());
    }

    let staking_tx_hash = spend.outpoint.txid;
    // Params of the staking era, not the spend era, so honest unbondings
    // survive a parameter rotation.
    let params = ctx.params.params_at(staking.inclusion_height())?;

    match check_unbonding_tx(tx, &staking, params) {
        Ok(true) => process_unbonding(
            ctx,
            guard,
            tx,
            staking_tx_hash,
            inclusion_height,
            inclusion_timestamp,
        ),
        Err(IndexerError::InvalidUnbondingTx) => {
            warn!(tx_hash = %tx.compute_txid(), staking = %staking_tx_hash,
                "ignoring unbonding transaction that deviates from the template");
            Ok(())
        }
        Err(e) => Err(e),
        Ok(false) => {
            let Some(leaf) = &spend.revealed_leaf else {
                return Ok(());
            };
            if is_timelock_path_spend(leaf, &staking, params)? {
                info!(staking = %staking_tx_hash, height = %inclusion_height,
                    "staking output withdrawn through the timelock path");
                ctx.emitter.emit_withdraw(staking_tx_hash, guard)?;
            }
            Ok(())
        }
    }
}

fn process_unbonding<D: IndexerDatabase>(
    ctx: &IndexerContext<D>,
    guard: &ShutdownGuard,
    tx: &Transaction,
    staking_tx_hash: Txid,
    inclusion_height: u64,
    inclusion_timestamp: u64,
) -> Result<(), IndexerError> {
    let tx_hash = tx.compute_txid();
    let record = StoredUnbondingTx::new(tx, staking_tx_hash, inclusion_height, inclusion_timestamp);

    // Replay of an already-indexed unbonding re-emits; a *different*
    // unbonding of the same staking output is double-spend noise and the
    // first one wins.
    if ctx.db.get_unbonding_tx(&tx_hash)?.is_some() {
        debug!(%tx_hash, "unbonding transaction already indexed, re-emitting");
        return ctx.emitter.emit_unbonding(&record, guard);
    }

    match ctx.db.put_unbonding_tx(&record) {
        Ok(()) => {
            info!(%tx_hash, staking = %staking_tx_hash, height = %inclusion_height,
                "indexed unbonding transaction");
            ctx.emitter.emit_unbonding(&record, guard)
        }
        Err(DbError::AlreadyExists) => {
            warn!(%tx_hash, staking = %staking_tx_hash,
                "staking output already unbonded, dropping double spend");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

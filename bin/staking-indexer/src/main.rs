//! Staking indexer binary entrypoint.

use std::sync::Arc;

use anyhow::Context;
use argh::from_env;
use sidx_db_store_sled::SledIndexerStore;
use sidx_indexer::{BtcScanner, EventConsumer, IndexerStatus, StakingIndexer};
use sidx_params::ParamsVersions;
use tracing::info;

use crate::{
    args::Args,
    config::load_config,
    scanner::{FileBlockScanner, IdleScanner},
    sink::TracingEventSink,
};

mod args;
mod config;
mod logging;
mod scanner;
mod sink;

fn main() -> anyhow::Result<()> {
    let args: Args = from_env();
    let config = load_config(args.config.as_deref(), &args)?;

    logging::init(&config.logging);

    let params = Arc::new(
        ParamsVersions::load(&args.params)
            .with_context(|| format!("loading params {}", args.params.display()))?,
    );
    info!(versions = params.versions().len(), "loaded protocol params");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let db = sled::open(config.data_dir.join("indexer-db")).context("opening database")?;
    let store = Arc::new(SledIndexerStore::open(&db)?);

    let scanner: Arc<dyn BtcScanner> = match &config.blocks_file {
        Some(path) => Arc::new(FileBlockScanner::new(path.clone(), 64)),
        None => Arc::new(IdleScanner::new(64)),
    };
    let consumer: Arc<dyn EventConsumer> = Arc::new(TracingEventSink);

    let indexer = StakingIndexer::new(
        config.indexer.clone(),
        consumer,
        store,
        params,
        scanner,
    )?;
    let mut status_rx = indexer.status_chan();

    indexer.start(config.start_height)?;

    // Run until interrupted or until the worker winds down on its own
    // (end of a block replay).
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    rt.block_on(async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received shutdown signal"),
            _ = status_rx.wait_for(|s| *s == IndexerStatus::Stopped) => {
                info!("ingest worker finished")
            }
        }
    });

    indexer.stop()?;
    db.flush().context("flushing database")?;

    info!("exiting");
    Ok(())
}

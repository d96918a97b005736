//! Local scanner implementations.
//!
//! The real network scanner is an external collaborator; these two cover
//! the binary's own needs: replaying confirmed blocks from a file, and
//! idling with the channel held open until shutdown.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
    thread,
};

use anyhow::{anyhow, Context};
use bitcoin::{consensus, Block};
use sidx_indexer::BtcScanner;
use sidx_types::IndexedBlock;
use tokio::sync::mpsc;
use tracing::*;

/// Feeds blocks parsed from a `height:blockhex` file, one per line.
/// Blank lines and `#` comments are skipped.  The channel closes when
/// the file is exhausted, which winds the indexer down cleanly.
pub(crate) struct FileBlockScanner {
    path: PathBuf,
    sender: Mutex<Option<mpsc::Sender<IndexedBlock>>>,
    receiver: Mutex<Option<mpsc::Receiver<IndexedBlock>>>,
    feeder: Mutex<Option<thread::JoinHandle<()>>>,
}

impl FileBlockScanner {
    pub(crate) fn new(path: PathBuf, channel_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(channel_capacity);
        Self {
            path,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            feeder: Mutex::new(None),
        }
    }
}

fn parse_blocks_file(path: &Path) -> anyhow::Result<Vec<IndexedBlock>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading blocks file {}", path.display()))?;

    let mut blocks = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (height, block_hex) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("line {}: expected height:blockhex", lineno + 1))?;
        let height: u64 = height
            .parse()
            .with_context(|| format!("line {}: invalid height", lineno + 1))?;
        let block_bytes = hex::decode(block_hex)
            .with_context(|| format!("line {}: invalid hex", lineno + 1))?;
        let block: Block = consensus::deserialize(&block_bytes)
            .with_context(|| format!("line {}: invalid block", lineno + 1))?;

        blocks.push(IndexedBlock::new(
            height,
            u64::from(block.header.time),
            block.txdata,
        ));
    }

    Ok(blocks)
}

impl BtcScanner for FileBlockScanner {
    fn start(&self, start_height: u64) -> anyhow::Result<()> {
        // Parse eagerly so malformed input fails startup instead of
        // surfacing mid-replay.
        let blocks = parse_blocks_file(&self.path)?;

        let sender = self
            .sender
            .lock()
            .expect("scanner: sender lock poisoned")
            .take()
            .ok_or_else(|| anyhow!("scanner already started"))?;

        let handle = thread::Builder::new()
            .name("block-replay".into())
            .spawn(move || {
                let mut sent = 0usize;
                for block in blocks {
                    if block.height() < start_height {
                        continue;
                    }
                    if sender.blocking_send(block).is_err() {
                        debug!("block channel closed, stopping replay");
                        return;
                    }
                    sent += 1;
                }
                info!(%sent, "block replay finished");
            })?;

        *self.feeder.lock().expect("scanner: feeder lock poisoned") = Some(handle);
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.sender
            .lock()
            .expect("scanner: sender lock poisoned")
            .take();
        let handle = self
            .feeder
            .lock()
            .expect("scanner: feeder lock poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("block replay thread panicked");
            }
        }
        Ok(())
    }

    fn confirmed_blocks_chan(&self) -> Option<mpsc::Receiver<IndexedBlock>> {
        self.receiver
            .lock()
            .expect("scanner: receiver lock poisoned")
            .take()
    }
}

/// Produces nothing; holds the channel open until `stop`.  Used when no
/// block source is configured so the service wiring can still be
/// exercised.
pub(crate) struct IdleScanner {
    sender: Mutex<Option<mpsc::Sender<IndexedBlock>>>,
    receiver: Mutex<Option<mpsc::Receiver<IndexedBlock>>>,
}

impl IdleScanner {
    pub(crate) fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(channel_capacity);
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }
}

impl BtcScanner for IdleScanner {
    fn start(&self, start_height: u64) -> anyhow::Result<()> {
        warn!(%start_height, "no block source configured, indexer will idle");
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.sender
            .lock()
            .expect("scanner: sender lock poisoned")
            .take();
        Ok(())
    }

    fn confirmed_blocks_chan(&self) -> Option<mpsc::Receiver<IndexedBlock>> {
        self.receiver
            .lock()
            .expect("scanner: receiver lock poisoned")
            .take()
    }
}

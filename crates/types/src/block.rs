use bitcoin::Transaction;

/// A confirmed block as delivered by the scanner, carrying only the parts
/// the indexer cares about.
///
/// Blocks arrive over the confirmed-block channel in non-decreasing height
/// order and are final at the scanner's confirmation depth.
#[derive(Clone, Debug)]
pub struct IndexedBlock {
    /// Block height.
    height: u64,

    /// Header timestamp, unix seconds.
    timestamp: u64,

    /// Transactions in block order.
    txs: Vec<Transaction>,
}

impl IndexedBlock {
    pub fn new(height: u64, timestamp: u64, txs: Vec<Transaction>) -> Self {
        Self {
            height,
            timestamp,
            txs,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn txs(&self) -> &[Transaction] {
        &self.txs
    }
}

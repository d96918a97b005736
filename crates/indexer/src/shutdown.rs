//! Cooperative shutdown signalling between the indexer handle and its
//! worker thread.

use tokio::sync::watch;

pub(crate) fn shutdown_pair() -> (ShutdownSignal, ShutdownGuard) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSignal(tx), ShutdownGuard(rx))
}

#[derive(Debug)]
pub(crate) struct ShutdownSignal(watch::Sender<bool>);

impl ShutdownSignal {
    pub(crate) fn trigger(&self) {
        // Receiver may already be gone if the worker exited on its own.
        let _ = self.0.send(true);
    }
}

/// Checked by the worker between transactions and between emission
/// retries, never mid-atomic-write.
#[derive(Clone, Debug)]
pub(crate) struct ShutdownGuard(watch::Receiver<bool>);

impl ShutdownGuard {
    pub(crate) fn should_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

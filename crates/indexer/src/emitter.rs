use std::{sync::Arc, thread, time::Duration};

use serde::{Deserialize, Serialize};
use sidx_types::{
    ActiveStakingEvent, StoredStakingTx, StoredUnbondingTx, UnbondingStakingEvent,
    WithdrawStakingEvent,
};
use tracing::*;

use crate::{error::IndexerError, shutdown::ShutdownGuard, traits::EventConsumer};

/// Bounded exponential retry budget for pushes to the event consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Translates stored records into events and pushes them downstream.
///
/// Pushes are synchronous from the worker's point of view and return only
/// once the consumer has acknowledged or the retry budget is exhausted;
/// the latter is fatal to the ingestor (durability before progress).
/// Per-push timeouts are the consumer's concern.
pub(crate) struct EventEmitter {
    consumer: Arc<dyn EventConsumer>,
    retry: RetryConfig,
}

impl EventEmitter {
    pub(crate) fn new(consumer: Arc<dyn EventConsumer>, retry: RetryConfig) -> Self {
        Self { consumer, retry }
    }

    pub(crate) fn emit_staking(
        &self,
        record: &StoredStakingTx,
        guard: &ShutdownGuard,
    ) -> Result<(), IndexerError> {
        let event = ActiveStakingEvent::from_record(record)?;
        self.push_with_retry("staking", guard, || {
            self.consumer.push_staking_event(&event)
        })
    }

    pub(crate) fn emit_unbonding(
        &self,
        record: &StoredUnbondingTx,
        guard: &ShutdownGuard,
    ) -> Result<(), IndexerError> {
        let event = UnbondingStakingEvent::from_record(record)?;
        self.push_with_retry("unbonding", guard, || {
            self.consumer.push_unbonding_event(&event)
        })
    }

    pub(crate) fn emit_withdraw(
        &self,
        staking_tx_hash: bitcoin::Txid,
        guard: &ShutdownGuard,
    ) -> Result<(), IndexerError> {
        let event = WithdrawStakingEvent::new(staking_tx_hash);
        self.push_with_retry("withdraw", guard, || {
            self.consumer.push_withdraw_event(&event)
        })
    }

    fn push_with_retry(
        &self,
        kind: &str,
        guard: &ShutdownGuard,
        push: impl Fn() -> anyhow::Result<()>,
    ) -> Result<(), IndexerError> {
        let mut delay = Duration::from_millis(self.retry.base_delay_ms);
        let max_delay = Duration::from_millis(self.retry.max_delay_ms);
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            if guard.should_shutdown() {
                return Err(IndexerError::ShuttingDown);
            }

            match push() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(%kind, %attempt, err = %e, "event push failed");
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry.max_attempts {
                thread::sleep(delay);
                delay = (delay * 2).min(max_delay);
            }
        }

        Err(IndexerError::EmissionFailed {
            attempts: self.retry.max_attempts,
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::shutdown::shutdown_pair;

    /// Consumer that fails the first `failures` pushes of each kind.
    struct FlakyConsumer {
        failures: u32,
        staking_calls: AtomicU32,
    }

    impl FlakyConsumer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                staking_calls: AtomicU32::new(0),
            }
        }
    }

    impl EventConsumer for FlakyConsumer {
        fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn stop(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn push_staking_event(&self, _event: &ActiveStakingEvent) -> anyhow::Result<()> {
            let n = self.staking_calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                anyhow::bail!("transient failure {n}");
            }
            Ok(())
        }

        fn push_unbonding_event(&self, _event: &UnbondingStakingEvent) -> anyhow::Result<()> {
            Ok(())
        }

        fn push_withdraw_event(&self, _event: &WithdrawStakingEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    fn sample_record() -> StoredStakingTx {
        use bitcoin::{
            absolute::LockTime,
            secp256k1::{Secp256k1, SecretKey},
            transaction::Version,
            Amount, OutPoint, Transaction, TxIn,
        };

        let sk = SecretKey::from_slice(&[1u8; 32]).unwrap();
        let pk = sk.x_only_public_key(&Secp256k1::new()).0;
        let tx = Transaction {
            version: Version(2),
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                ..Default::default()
            }],
            output: vec![],
        };
        StoredStakingTx::new(
            &tx,
            &pk,
            &pk,
            144,
            Amount::from_sat(50_000),
            0,
            100,
            1_700_000_000,
            false,
        )
    }

    #[test]
    fn retries_transient_failures() {
        let consumer = Arc::new(FlakyConsumer::new(2));
        let emitter = EventEmitter::new(consumer.clone(), retry(5));
        let (_signal, guard) = shutdown_pair();

        emitter.emit_staking(&sample_record(), &guard).unwrap();
        assert_eq!(consumer.staking_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausting_the_budget_is_fatal() {
        let consumer = Arc::new(FlakyConsumer::new(u32::MAX));
        let emitter = EventEmitter::new(consumer, retry(3));
        let (_signal, guard) = shutdown_pair();

        assert!(matches!(
            emitter.emit_staking(&sample_record(), &guard),
            Err(IndexerError::EmissionFailed { attempts: 3, .. })
        ));
    }

    #[test]
    fn shutdown_interrupts_retries() {
        let consumer = Arc::new(FlakyConsumer::new(u32::MAX));
        let emitter = EventEmitter::new(consumer, retry(100));
        let (signal, guard) = shutdown_pair();
        signal.trigger();

        assert!(matches!(
            emitter.emit_staking(&sample_record(), &guard),
            Err(IndexerError::ShuttingDown)
        ));
    }
}

use sidx_indexer::EventConsumer;
use sidx_types::{ActiveStakingEvent, UnbondingStakingEvent, WithdrawStakingEvent};
use tracing::*;

/// Event sink that logs each event as a JSON line.  Stands in for the
/// queue client in local runs; the log line is the acknowledgement.
pub(crate) struct TracingEventSink;

impl EventConsumer for TracingEventSink {
    fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn push_staking_event(&self, event: &ActiveStakingEvent) -> anyhow::Result<()> {
        info!(target: "events", payload = %serde_json::to_string(event)?, "staking");
        Ok(())
    }

    fn push_unbonding_event(&self, event: &UnbondingStakingEvent) -> anyhow::Result<()> {
        info!(target: "events", payload = %serde_json::to_string(event)?, "unbonding");
        Ok(())
    }

    fn push_withdraw_event(&self, event: &WithdrawStakingEvent) -> anyhow::Result<()> {
        info!(target: "events", payload = %serde_json::to_string(event)?, "withdraw");
        Ok(())
    }
}

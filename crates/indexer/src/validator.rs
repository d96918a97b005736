use bitcoin::{Script, Transaction, Witness};
use sidx_btcstaking::{build_unbonding_template, is_transfer_tx, StakingInfo, StakingTxError};
use sidx_params::ParamsVersion;
use sidx_types::StoredStakingTx;

use crate::error::IndexerError;

/// Checks a candidate against the canonical unbonding template for a
/// known staking record.
///
/// - `Ok(true)`: the candidate equals the template in all unsigned
///   fields (witness excluded).
/// - `Ok(false)`: the candidate is unrelated to the unbonding path: it
///   does not spend the staking output, is not transfer-shaped, or pays
///   a different script entirely (a withdrawal candidate).
/// - `Err(InvalidUnbondingTx)`: the candidate pays the canonical
///   unbonding script but deviates from the template elsewhere, e.g. a
///   tampered fee.
///
/// `params` must be the version active at the *staking* inclusion
/// height so honest unbondings that straddle a parameter rotation still
/// validate.
pub fn check_unbonding_tx(
    tx: &Transaction,
    staking: &StoredStakingTx,
    params: &ParamsVersion,
) -> Result<bool, IndexerError> {
    if !is_transfer_tx(tx) {
        return Ok(false);
    }

    let staking_tx_hash = staking.tx_hash()?;
    let spent = tx.input[0].previous_output;
    if spent.txid != staking_tx_hash || spent.vout != staking.staking_output_idx() {
        return Ok(false);
    }

    let template = match build_unbonding_template(
        staking_tx_hash,
        staking.staking_output_idx(),
        staking.staking_value(),
        &staking.staker_pk()?,
        &staking.finality_provider_pk()?,
        &params.covenant_pks,
        params.covenant_quorum,
        params.unbonding_time,
        params.unbonding_fee,
    ) {
        Ok(template) => template,
        // Params where the fee eats the whole stake admit no honest
        // unbonding, so whatever spent the output is not one.
        Err(StakingTxError::UnbondingFeeExceedsValue) => return Ok(false),
        Err(other) => return Err(other.into()),
    };

    // A spend paying some other script never claimed to be an unbonding;
    // the caller probes it as a withdrawal instead.
    if tx.output[0].script_pubkey != template.output[0].script_pubkey {
        return Ok(false);
    }

    if strip_witnesses(tx) == template {
        Ok(true)
    } else {
        Err(IndexerError::InvalidUnbondingTx)
    }
}

/// Whether a revealed taproot leaf is the timelock branch of the staking
/// output, i.e. the staker-only path that becomes spendable after the
/// staking period.
pub(crate) fn is_timelock_path_spend(
    revealed_leaf: &Script,
    staking: &StoredStakingTx,
    params: &ParamsVersion,
) -> Result<bool, IndexerError> {
    let staking_time = u16::try_from(staking.staking_time()).map_err(|_| {
        IndexerError::CorruptedRecord(format!(
            "staking time {} exceeds the carrier range",
            staking.staking_time()
        ))
    })?;

    let info = StakingInfo::new(
        &staking.staker_pk()?,
        &staking.finality_provider_pk()?,
        &params.covenant_pks,
        params.covenant_quorum,
        staking_time,
        staking.staking_value(),
    )?;

    Ok(revealed_leaf.as_bytes() == info.timelock_script.as_bytes())
}

fn strip_witnesses(tx: &Transaction) -> Transaction {
    let mut unsigned = tx.clone();
    for input in &mut unsigned.input {
        input.witness = Witness::new();
    }
    unsigned
}

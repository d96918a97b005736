use bitcoin::{OutPoint, ScriptBuf, Transaction};
use sidx_btcstaking::{parse_v0_staking_tx, revealed_taproot_leaf, ParsedStakingTx};
use sidx_params::ParamsVersion;

/// Classifier verdict for one transaction under one params version.
#[derive(Clone, Debug)]
pub enum TxKind {
    /// Carries the protocol tag and reproduces the canonical staking
    /// output.  Out-of-cap amounts still classify here, flagged overflow.
    Staking(StakingData),

    /// Single-input transaction that could be an unbonding or a
    /// withdrawal; only the store can tell.  Carries what the ingestor
    /// needs to resolve it.
    PossibleSpend(SpendInfo),

    Irrelevant,
}

#[derive(Clone, Debug)]
pub struct StakingData {
    pub parsed: ParsedStakingTx,
    pub is_overflow: bool,
}

#[derive(Clone, Debug)]
pub struct SpendInfo {
    /// The outpoint the single input spends.
    pub outpoint: OutPoint,

    /// The leaf script revealed by the witness, when the spend is a
    /// taproot script-path spend.
    pub revealed_leaf: Option<ScriptBuf>,
}

/// Pure recognition: no I/O, no store access.
pub fn classify_tx(tx: &Transaction, params: &ParamsVersion) -> TxKind {
    if let Ok(parsed) = parse_v0_staking_tx(
        tx,
        &params.tag,
        &params.covenant_pks,
        params.covenant_quorum,
    ) {
        let is_overflow = staking_is_overflow(&parsed, params);
        return TxKind::Staking(StakingData {
            parsed,
            is_overflow,
        });
    }

    if let [input] = tx.input.as_slice() {
        // Coinbase inputs spend the null outpoint and can never hit a
        // staking record.
        if !input.previous_output.is_null() {
            return TxKind::PossibleSpend(SpendInfo {
                outpoint: input.previous_output,
                revealed_leaf: revealed_taproot_leaf(input).map(|s| s.to_owned()),
            });
        }
    }

    TxKind::Irrelevant
}

fn staking_is_overflow(parsed: &ParsedStakingTx, params: &ParamsVersion) -> bool {
    let value = parsed.staking_output.value;
    let time = parsed.op_return.staking_time;

    value < params.min_staking_value
        || value > params.max_staking_value
        || time < params.min_staking_time
        || time > params.max_staking_time
}

use bitcoin::{Transaction, TxOut, XOnlyPublicKey};

use crate::{
    error::StakingTxError,
    op_return::{extract_op_return_payload, V0OpReturnData},
    scripts::StakingInfo,
};

/// A staking transaction decomposed into its protocol parts.
#[derive(Clone, Debug)]
pub struct ParsedStakingTx {
    pub staking_output: TxOut,
    pub staking_output_idx: u32,
    pub op_return: V0OpReturnData,
}

/// Recognizes a v0 staking transaction.
///
/// The transaction must carry exactly one OP_RETURN output whose payload
/// parses under `tag`, and some other output must be byte-equal to the
/// canonical staking output derived from the carrier fields and the
/// covenant configuration.  Value and time caps are *not* checked here;
/// the caller decides what to do with out-of-range amounts.
pub fn parse_v0_staking_tx(
    tx: &Transaction,
    tag: &[u8; 4],
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
) -> Result<ParsedStakingTx, StakingTxError> {
    let mut tagged: Option<(usize, V0OpReturnData)> = None;

    for (idx, out) in tx.output.iter().enumerate() {
        let Some(payload) = extract_op_return_payload(&out.script_pubkey) else {
            continue;
        };
        // Foreign OP_RETURN outputs are ignored; only payloads carrying
        // our tag participate in recognition.
        let data = match V0OpReturnData::parse(payload, tag) {
            Ok(data) => data,
            Err(StakingTxError::TagMismatch) | Err(StakingTxError::InvalidOpReturnLength(_)) => {
                continue
            }
            Err(e) => return Err(e),
        };

        if tagged.is_some() {
            return Err(StakingTxError::MultipleTaggedOutputs);
        }
        tagged = Some((idx, data));
    }

    let (op_return_idx, op_return) = tagged.ok_or(StakingTxError::NoTaggedOutput)?;

    let expected = StakingInfo::new(
        &op_return.staker_pk,
        &op_return.finality_provider_pk,
        covenant_pks,
        covenant_quorum,
        op_return.staking_time,
        // Placeholder value; only the script is compared below.
        bitcoin::Amount::ZERO,
    )?;

    let staking = tx
        .output
        .iter()
        .enumerate()
        .find(|(idx, out)| {
            *idx != op_return_idx
                && out.script_pubkey == expected.staking_output.script_pubkey
        })
        .ok_or(StakingTxError::StakingOutputNotFound)?;

    Ok(ParsedStakingTx {
        staking_output: staking.1.clone(),
        staking_output_idx: staking.0 as u32,
        op_return,
    })
}

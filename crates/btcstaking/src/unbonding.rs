use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, OutPoint, Script, ScriptBuf, Sequence,
    Transaction, TxIn, Txid, Witness, XOnlyPublicKey,
};

use crate::{error::StakingTxError, scripts::UnbondingInfo};

/// Builds the fully-determined unsigned unbonding transaction for a
/// staking output.
///
/// Single input spending `(staking_tx_hash, staking_output_idx)`, max
/// sequence, zero locktime, and one output of `staking_value -
/// unbonding_fee` paying the canonical unbonding script.  An honest
/// unbonding differs from this template only in its witness.
#[allow(clippy::too_many_arguments)]
pub fn build_unbonding_template(
    staking_tx_hash: Txid,
    staking_output_idx: u32,
    staking_value: Amount,
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
    unbonding_time: u16,
    unbonding_fee: Amount,
) -> Result<Transaction, StakingTxError> {
    let unbonding_value = staking_value
        .checked_sub(unbonding_fee)
        .ok_or(StakingTxError::UnbondingFeeExceedsValue)?;

    let info = UnbondingInfo::new(
        staker_pk,
        finality_provider_pk,
        covenant_pks,
        covenant_quorum,
        unbonding_time,
        unbonding_value,
    )?;

    Ok(Transaction {
        version: Version(2),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: staking_tx_hash,
                vout: staking_output_idx,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![info.unbonding_output],
    })
}

/// A transfer in the protocol sense: exactly one input and one output.
pub fn is_transfer_tx(tx: &Transaction) -> bool {
    tx.input.len() == 1 && tx.output.len() == 1
}

/// The leaf script revealed by a taproot script-path spend, if the
/// witness has that shape.
pub fn revealed_taproot_leaf(txin: &TxIn) -> Option<&Script> {
    txin.witness.tapscript()
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        hashes::Hash,
        secp256k1::{Secp256k1, SecretKey},
    };

    use super::*;

    fn pk(byte: u8) -> XOnlyPublicKey {
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        sk.x_only_public_key(&Secp256k1::new()).0
    }

    fn covenants() -> Vec<XOnlyPublicKey> {
        vec![pk(10), pk(11)]
    }

    #[test]
    fn template_is_deterministic_and_unsigned() {
        let hash = Txid::from_byte_array([3u8; 32]);
        let build = || {
            build_unbonding_template(
                hash,
                0,
                Amount::from_sat(50_000),
                &pk(1),
                &pk(2),
                &covenants(),
                2,
                101,
                Amount::from_sat(1_000),
            )
            .unwrap()
        };

        let a = build();
        let b = build();
        assert_eq!(a, b);
        assert_eq!(a.input.len(), 1);
        assert!(a.input[0].witness.is_empty());
        assert_eq!(a.output[0].value, Amount::from_sat(49_000));
        assert_eq!(a.input[0].previous_output.txid, hash);
    }

    #[test]
    fn fee_exceeding_value_is_rejected() {
        let result = build_unbonding_template(
            Txid::from_byte_array([3u8; 32]),
            0,
            Amount::from_sat(500),
            &pk(1),
            &pk(2),
            &covenants(),
            2,
            101,
            Amount::from_sat(1_000),
        );
        assert!(matches!(
            result,
            Err(StakingTxError::UnbondingFeeExceedsValue)
        ));
    }

    #[test]
    fn transfer_shape_check() {
        let template = build_unbonding_template(
            Txid::from_byte_array([3u8; 32]),
            0,
            Amount::from_sat(50_000),
            &pk(1),
            &pk(2),
            &covenants(),
            2,
            101,
            Amount::from_sat(1_000),
        )
        .unwrap();
        assert!(is_transfer_tx(&template));

        let mut two_outputs = template.clone();
        two_outputs.output.push(two_outputs.output[0].clone());
        assert!(!is_transfer_tx(&two_outputs));
    }
}

use bitcoin::{
    opcodes::all::{OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_CSV, OP_NUMEQUAL},
    script::Builder,
    secp256k1::Secp256k1,
    taproot::TaprootBuilder,
    Amount, ScriptBuf, TxOut, XOnlyPublicKey,
};

use crate::error::StakingTxError;

/// BIP-341 "nothing up my sleeve" point.  Using it as the internal key
/// makes the key-spend path provably unusable, leaving only the script
/// leaves.
const UNSPENDABLE_INTERNAL_KEY: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a,
    0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80,
    0x3a, 0xc0,
];

fn unspendable_internal_key() -> XOnlyPublicKey {
    XOnlyPublicKey::from_slice(&UNSPENDABLE_INTERNAL_KEY).expect("NUMS point is a valid key")
}

/// Concatenates script fragments byte-wise.  Fragments are built so that
/// every one but the last leaves the stack clean via VERIFY semantics.
fn aggregate_scripts(fragments: &[ScriptBuf]) -> ScriptBuf {
    let mut bytes = Vec::new();
    for fragment in fragments {
        bytes.extend_from_slice(fragment.as_bytes());
    }
    ScriptBuf::from_bytes(bytes)
}

fn single_key_fragment(pk: &XOnlyPublicKey, verify: bool) -> ScriptBuf {
    Builder::new()
        .push_x_only_key(pk)
        .push_opcode(if verify { OP_CHECKSIGVERIFY } else { OP_CHECKSIG })
        .into_script()
}

/// `k`-of-`n` fragment over the covenant set.  Keys participate sorted by
/// their serialization so every builder derives the same script.
fn covenant_multisig_fragment(
    covenant_pks: &[XOnlyPublicKey],
    quorum: u32,
) -> Result<ScriptBuf, StakingTxError> {
    if covenant_pks.is_empty() {
        return Err(StakingTxError::EmptyCovenantSet);
    }
    if quorum == 0 || quorum as usize > covenant_pks.len() {
        return Err(StakingTxError::InvalidCovenantQuorum {
            quorum,
            keys: covenant_pks.len(),
        });
    }

    let mut sorted = covenant_pks.to_vec();
    sorted.sort_by_key(|pk| pk.serialize());

    if let [only] = sorted.as_slice() {
        return Ok(single_key_fragment(only, false));
    }

    let mut builder = Builder::new();
    for (i, pk) in sorted.iter().enumerate() {
        builder = builder.push_x_only_key(pk);
        builder = builder.push_opcode(if i == 0 { OP_CHECKSIG } else { OP_CHECKSIGADD });
    }
    Ok(builder
        .push_int(i64::from(quorum))
        .push_opcode(OP_NUMEQUAL)
        .into_script())
}

fn timelock_fragment(pk: &XOnlyPublicKey, blocks: u16) -> ScriptBuf {
    aggregate_scripts(&[
        single_key_fragment(pk, true),
        Builder::new()
            .push_int(i64::from(blocks))
            .push_opcode(OP_CSV)
            .into_script(),
    ])
}

fn taproot_output_script(leaves: Vec<(u8, ScriptBuf)>) -> Result<ScriptBuf, StakingTxError> {
    let secp = Secp256k1::verification_only();
    let internal_key = unspendable_internal_key();

    let mut builder = TaprootBuilder::new();
    for (depth, leaf) in leaves {
        builder = builder.add_leaf(depth, leaf)?;
    }
    let spend_info = builder
        .finalize(&secp, internal_key)
        .map_err(|_| StakingTxError::TaprootFinalize)?;

    Ok(ScriptBuf::new_p2tr(
        &secp,
        internal_key,
        spend_info.merkle_root(),
    ))
}

/// The canonical staking output and its three leaf scripts.
#[derive(Clone, Debug)]
pub struct StakingInfo {
    pub staking_output: TxOut,
    /// Staker-only spend after `staking_time` blocks.
    pub timelock_script: ScriptBuf,
    /// Cooperative exit: staker plus covenant quorum.
    pub unbonding_path_script: ScriptBuf,
    /// Slashing path: staker, finality provider and covenant quorum.
    pub slashing_script: ScriptBuf,
}

impl StakingInfo {
    pub fn new(
        staker_pk: &XOnlyPublicKey,
        finality_provider_pk: &XOnlyPublicKey,
        covenant_pks: &[XOnlyPublicKey],
        covenant_quorum: u32,
        staking_time: u16,
        staking_value: Amount,
    ) -> Result<Self, StakingTxError> {
        let covenant = covenant_multisig_fragment(covenant_pks, covenant_quorum)?;

        let timelock_script = timelock_fragment(staker_pk, staking_time);
        let unbonding_path_script =
            aggregate_scripts(&[single_key_fragment(staker_pk, true), covenant.clone()]);
        let slashing_script = aggregate_scripts(&[
            single_key_fragment(staker_pk, true),
            single_key_fragment(finality_provider_pk, true),
            covenant,
        ]);

        let script_pubkey = taproot_output_script(vec![
            (1, timelock_script.clone()),
            (2, unbonding_path_script.clone()),
            (2, slashing_script.clone()),
        ])?;

        Ok(Self {
            staking_output: TxOut {
                value: staking_value,
                script_pubkey,
            },
            timelock_script,
            unbonding_path_script,
            slashing_script,
        })
    }
}

/// The canonical unbonding output and its two leaf scripts.
#[derive(Clone, Debug)]
pub struct UnbondingInfo {
    pub unbonding_output: TxOut,
    /// Staker-only spend after `unbonding_time` blocks.
    pub timelock_script: ScriptBuf,
    /// Slashing path, identical in shape to the staking one.
    pub slashing_script: ScriptBuf,
}

impl UnbondingInfo {
    pub fn new(
        staker_pk: &XOnlyPublicKey,
        finality_provider_pk: &XOnlyPublicKey,
        covenant_pks: &[XOnlyPublicKey],
        covenant_quorum: u32,
        unbonding_time: u16,
        unbonding_value: Amount,
    ) -> Result<Self, StakingTxError> {
        let covenant = covenant_multisig_fragment(covenant_pks, covenant_quorum)?;

        let timelock_script = timelock_fragment(staker_pk, unbonding_time);
        let slashing_script = aggregate_scripts(&[
            single_key_fragment(staker_pk, true),
            single_key_fragment(finality_provider_pk, true),
            covenant,
        ]);

        let script_pubkey = taproot_output_script(vec![
            (1, timelock_script.clone()),
            (1, slashing_script.clone()),
        ])?;

        Ok(Self {
            unbonding_output: TxOut {
                value: unbonding_value,
                script_pubkey,
            },
            timelock_script,
            slashing_script,
        })
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::{Secp256k1, SecretKey};

    use super::*;

    fn pk(byte: u8) -> XOnlyPublicKey {
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        sk.x_only_public_key(&Secp256k1::new()).0
    }

    fn covenants() -> Vec<XOnlyPublicKey> {
        vec![pk(10), pk(11), pk(12)]
    }

    #[test]
    fn staking_info_is_deterministic() {
        let a = StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 144, Amount::from_sat(50_000))
            .unwrap();
        let b = StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 144, Amount::from_sat(50_000))
            .unwrap();
        assert_eq!(a.staking_output, b.staking_output);
        assert_eq!(a.timelock_script, b.timelock_script);
    }

    #[test]
    fn covenant_order_does_not_matter() {
        let mut shuffled = covenants();
        shuffled.reverse();

        let a = StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 144, Amount::from_sat(50_000))
            .unwrap();
        let b =
            StakingInfo::new(&pk(1), &pk(2), &shuffled, 2, 144, Amount::from_sat(50_000)).unwrap();
        assert_eq!(a.staking_output, b.staking_output);
    }

    #[test]
    fn staking_time_changes_the_output() {
        let a = StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 144, Amount::from_sat(50_000))
            .unwrap();
        let b = StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 145, Amount::from_sat(50_000))
            .unwrap();
        assert_ne!(
            a.staking_output.script_pubkey,
            b.staking_output.script_pubkey
        );
    }

    #[test]
    fn unbonding_output_differs_from_staking_output() {
        let staking =
            StakingInfo::new(&pk(1), &pk(2), &covenants(), 2, 144, Amount::from_sat(50_000))
                .unwrap();
        let unbonding =
            UnbondingInfo::new(&pk(1), &pk(2), &covenants(), 2, 101, Amount::from_sat(49_000))
                .unwrap();
        assert_ne!(
            staking.staking_output.script_pubkey,
            unbonding.unbonding_output.script_pubkey
        );
    }

    #[test]
    fn rejects_invalid_covenant_configuration() {
        assert!(matches!(
            StakingInfo::new(&pk(1), &pk(2), &[], 1, 144, Amount::from_sat(50_000)),
            Err(StakingTxError::EmptyCovenantSet)
        ));
        assert!(matches!(
            StakingInfo::new(&pk(1), &pk(2), &covenants(), 4, 144, Amount::from_sat(50_000)),
            Err(StakingTxError::InvalidCovenantQuorum { quorum: 4, keys: 3 })
        ));
    }

    #[test]
    fn single_covenant_key_uses_plain_checksig() {
        let fragment = covenant_multisig_fragment(&[pk(10)], 1).unwrap();
        assert!(fragment
            .instructions()
            .any(|i| matches!(i, Ok(bitcoin::script::Instruction::Op(op)) if op == OP_CHECKSIG)));
    }
}

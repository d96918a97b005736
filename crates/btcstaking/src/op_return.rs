use bitcoin::{
    opcodes::all::OP_RETURN,
    script::{Instruction, PushBytesBuf, Script, ScriptBuf},
    XOnlyPublicKey,
};

use crate::error::StakingTxError;

/// Total length of the v0 carrier payload:
/// `tag(4) || version(1) || staker_pk(32) || finality_provider_pk(32) ||
/// staking_time(2 BE)`.
pub const V0_OP_RETURN_DATA_SIZE: usize = 71;

const TAG_LEN: usize = 4;
const PK_LEN: usize = 32;

/// Parsed v0 OP_RETURN carrier of a staking transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct V0OpReturnData {
    pub tag: [u8; 4],
    pub staker_pk: XOnlyPublicKey,
    pub finality_provider_pk: XOnlyPublicKey,
    /// Staking period in blocks.
    pub staking_time: u16,
}

impl V0OpReturnData {
    /// Parses a raw payload, checking length, tag and version.
    pub fn parse(data: &[u8], expected_tag: &[u8; 4]) -> Result<Self, StakingTxError> {
        if data.len() != V0_OP_RETURN_DATA_SIZE {
            return Err(StakingTxError::InvalidOpReturnLength(data.len()));
        }

        let (tag, rest) = data.split_at(TAG_LEN);
        if tag != expected_tag {
            return Err(StakingTxError::TagMismatch);
        }

        let (version, rest) = rest.split_at(1);
        if version[0] != 0 {
            return Err(StakingTxError::UnsupportedVersion(version[0]));
        }

        let (staker, rest) = rest.split_at(PK_LEN);
        let (provider, time) = rest.split_at(PK_LEN);

        Ok(Self {
            tag: *expected_tag,
            staker_pk: XOnlyPublicKey::from_slice(staker)?,
            finality_provider_pk: XOnlyPublicKey::from_slice(provider)?,
            staking_time: u16::from_be_bytes([time[0], time[1]]),
        })
    }

    /// Encodes the payload in carrier layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(V0_OP_RETURN_DATA_SIZE);
        out.extend_from_slice(&self.tag);
        out.push(0);
        out.extend_from_slice(&self.staker_pk.serialize());
        out.extend_from_slice(&self.finality_provider_pk.serialize());
        out.extend_from_slice(&self.staking_time.to_be_bytes());
        out
    }

    /// Builds the full OP_RETURN script for this payload.
    pub fn to_script(&self) -> ScriptBuf {
        let push = PushBytesBuf::try_from(self.encode()).expect("carrier payload fits a push");
        ScriptBuf::new_op_return(push)
    }
}

/// Returns the single pushed payload of an OP_RETURN script, if the script
/// has the `OP_RETURN <push>` shape.
pub fn extract_op_return_payload(script: &Script) -> Option<&[u8]> {
    let mut instructions = script.instructions();

    match instructions.next() {
        Some(Ok(Instruction::Op(op))) if op == OP_RETURN => (),
        _ => return None,
    }

    let payload = match instructions.next() {
        Some(Ok(Instruction::PushBytes(push))) => push.as_bytes(),
        _ => return None,
    };

    instructions.next().is_none().then_some(payload)
}

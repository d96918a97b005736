use bitcoin::taproot::TaprootBuilderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakingTxError {
    #[error("no output carries the protocol OP_RETURN tag")]
    NoTaggedOutput,

    #[error("more than one output carries the protocol OP_RETURN tag")]
    MultipleTaggedOutputs,

    #[error("OP_RETURN payload has invalid length {0}")]
    InvalidOpReturnLength(usize),

    #[error("OP_RETURN tag does not match the active params")]
    TagMismatch,

    #[error("unsupported OP_RETURN version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid public key in OP_RETURN payload: {0}")]
    InvalidPublicKey(#[from] bitcoin::secp256k1::Error),

    #[error("no output matches the canonical staking script")]
    StakingOutputNotFound,

    #[error("covenant set is empty")]
    EmptyCovenantSet,

    #[error("covenant quorum {quorum} invalid for covenant set of {keys}")]
    InvalidCovenantQuorum { quorum: u32, keys: usize },

    #[error("failed to assemble taproot tree: {0}")]
    TaprootBuild(#[from] TaprootBuilderError),

    #[error("failed to finalize taproot tree")]
    TaprootFinalize,

    #[error("unbonding fee exceeds the staking value")]
    UnbondingFeeExceedsValue,
}

//! Script algebra and transaction parsing for the staking protocol.
//!
//! Pure functions over `bitcoin` types: OP_RETURN carrier encoding, the
//! canonical staking/unbonding taproot outputs, the deterministic
//! unbonding template, and helpers for inspecting taproot spends.  No I/O
//! and no persistent state live here.

mod error;
mod op_return;
mod parse;
mod scripts;
mod unbonding;

pub use error::StakingTxError;
pub use op_return::{extract_op_return_payload, V0OpReturnData, V0_OP_RETURN_DATA_SIZE};
pub use parse::{parse_v0_staking_tx, ParsedStakingTx};
pub use scripts::{StakingInfo, UnbondingInfo};
pub use unbonding::{build_unbonding_template, is_transfer_tx, revealed_taproot_leaf};

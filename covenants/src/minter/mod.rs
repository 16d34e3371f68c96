//!
//! Issuance covenants. A minter descends from the outpoint its deploy
//! transaction spent (the genesis outpoint, which doubles as the asset id) and
//! from then on only from itself. Each mint emits the state output, the next
//! minters and the freshly minted asset, in that order. Outputs after them are
//! left to the caller but carry no state.
//!

pub mod cat20_closed;
pub mod cat20_open;
pub mod cat721_closed;
pub mod cat721_open;

use crate::{
    backtrace::{BacktraceInfo, BacktraceOrigin, Lineage, verify_backtrace},
    context::SpendContext,
    error::CovenantError,
    result::CovenantResult,
    state::{CovenantState, verify_state_binding},
};
use cat_consensus_core::tx::TransactionOutpoint;

/// Output of the deploy transaction holding the first minter. Output 0 is the state output.
pub const GENESIS_MINTER_OUTPUT_INDEX: u32 = 1;

/// Checks the provenance of a minter input and, for the first minter, that it starts
/// from `initial`.
pub(crate) fn verify_minter_lineage<S: CovenantState + PartialEq>(
    ctx: &SpendContext,
    genesis_outpoint: &TransactionOutpoint,
    backtrace: &BacktraceInfo,
    state: &S,
    initial: impl FnOnce() -> S,
) -> CovenantResult<()> {
    let trace = verify_backtrace(ctx, backtrace, Lineage::Genesis(genesis_outpoint))?;
    verify_state_binding(&trace.prev_tx, ctx.self_outpoint(), state.state_hash())?;
    if trace.origin == BacktraceOrigin::Genesis {
        let index = ctx.self_outpoint().index;
        if index != GENESIS_MINTER_OUTPUT_INDEX {
            return Err(CovenantError::GenesisOutputIndex(index));
        }
        if *state != initial() {
            return Err(CovenantError::NotInitialState);
        }
    }
    Ok(())
}

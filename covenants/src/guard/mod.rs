//!
//! Guards verify conservation of every asset of their kind across a whole
//! transaction. Token and NFT contracts only check ownership and that a guard
//! of the right kind vouches for their input.
//!

pub mod cat20;
pub mod cat721;

use crate::{
    constants::{NOT_ASSET_INDEX, STATE_OUTPUT_COUNT_MAX, TX_INPUT_COUNT_MAX},
    context::SpendContext,
    error::CovenantError,
    result::CovenantResult,
    state::{CovenantState, verify_state_binding},
    table::ScriptTable,
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::tx::{ScriptPublicKey, Transaction};
use cat_hashes::Hash160;
use serde::{Deserialize, Serialize};

/// Accessors shared by the constant states of both guard kinds.
pub trait GuardConstState: CovenantState {
    fn scripts(&self) -> &ScriptTable;
    fn script_indexes(&self) -> &[i8; TX_INPUT_COUNT_MAX];
    fn input_state_hashes(&self) -> &[Option<Hash160>; TX_INPUT_COUNT_MAX];
}

/// The guard an asset contract relies on, with what is needed to bind its state.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardInfo<S> {
    pub input_index: u8,
    /// Raw transaction that created the guard output.
    #[serde(with = "hex::serde")]
    pub prev_tx: Vec<u8>,
    pub state: S,
}

/// Checks, from an asset contract's input, that the guard at `guard.input_index` is the
/// configured guard, that its state is the one committed on chain, and that it declares
/// this input's state and script.
pub fn verify_guard_for_input<S: GuardConstState>(
    ctx: &SpendContext,
    guard_script: &ScriptPublicKey,
    guard: &GuardInfo<S>,
    my_state_hash: Hash160,
) -> CovenantResult<()> {
    let guard_index = guard.input_index as usize;
    if guard_index == ctx.input_index || ctx.input_script(guard_index)? != guard_script {
        return Err(CovenantError::GuardScriptMismatch(guard_index));
    }
    let guard_prev_tx = Transaction::deserialize(&guard.prev_tx)?;
    verify_state_binding(&guard_prev_tx, ctx.input_outpoint(guard_index)?, guard.state.state_hash())?;

    let my = ctx.input_index;
    if guard.state.input_state_hashes().get(my).copied().flatten() != Some(my_state_hash) {
        return Err(CovenantError::GuardStateHashMismatch(my));
    }
    let index = guard.state.script_indexes().get(my).copied().unwrap_or(NOT_ASSET_INDEX);
    match usize::try_from(index).ok().and_then(|index| guard.state.scripts().get(index)) {
        Some(script) if script == ctx.self_script() => Ok(()),
        _ => Err(CovenantError::GuardIndexMismatch(my)),
    }
}

/// Checks that the guard's own state is the one committed for its input and that it
/// does not claim its own input as an asset.
fn verify_guard_self<S: GuardConstState>(ctx: &SpendContext, state: &S, prev_tx: &[u8]) -> CovenantResult<()> {
    let prev_tx = Transaction::deserialize(prev_tx)?;
    verify_state_binding(&prev_tx, ctx.self_outpoint(), state.state_hash())?;
    let my = ctx.input_index;
    if my >= TX_INPUT_COUNT_MAX {
        return Err(CovenantError::TooManyInputs(ctx.input_count()));
    }
    if state.input_state_hashes()[my].is_some() || state.script_indexes()[my] != NOT_ASSET_INDEX {
        return Err(CovenantError::GuardSelfReference(my));
    }
    Ok(())
}

/// Validates the script index of an input slot and returns it as a table position.
/// Slots past the actual inputs must be declared empty.
fn asset_input_slot(
    ctx: &SpendContext,
    slot: usize,
    index: i8,
    active_types: usize,
    scripts: &ScriptTable,
    declared_hash: Option<Hash160>,
    actual_hash: Option<Hash160>,
) -> CovenantResult<Option<usize>> {
    if index == NOT_ASSET_INDEX {
        if declared_hash.is_some() || actual_hash.is_some() {
            return Err(CovenantError::NonAssetSlotNotEmpty(slot));
        }
        return Ok(None);
    }
    let position = usize::try_from(index).ok().filter(|position| *position < active_types);
    let Some(position) = position else {
        return Err(CovenantError::ScriptIndexOutOfRange { slot, index });
    };
    if slot >= ctx.input_count() || ctx.input_script(slot)? != &scripts[position] {
        return Err(CovenantError::InputScriptMismatch(slot));
    }
    match (declared_hash, actual_hash) {
        (Some(declared), Some(actual)) if declared == actual => Ok(Some(position)),
        _ => Err(CovenantError::InputStateMismatch(slot)),
    }
}

/// A plain output declared by a guard must not carry a script of the guard's table,
/// otherwise it would move assets out of the conservation check.
fn plain_output_script(slot: usize, raw_script: &[u8], scripts: &ScriptTable) -> CovenantResult<ScriptPublicKey> {
    let script = ScriptPublicKey::from_vec(raw_script.to_vec());
    if scripts.contains(&script) {
        return Err(CovenantError::OutputScriptCollision(slot));
    }
    Ok(script)
}

fn check_output_count(output_count: u8) -> CovenantResult<usize> {
    let count = output_count as usize;
    if count > STATE_OUTPUT_COUNT_MAX {
        return Err(CovenantError::InvalidOutputCount(count));
    }
    Ok(count)
}

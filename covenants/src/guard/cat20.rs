use super::{GuardConstState, asset_input_slot, check_output_count, plain_output_script, verify_guard_self};
use crate::{
    cat20::Cat20State,
    constants::{GUARD_TOKEN_TYPE_MAX, NOT_ASSET_INDEX, STATE_OUTPUT_COUNT_MAX, TX_INPUT_COUNT_MAX},
    context::SpendContext,
    error::CovenantError,
    result::CovenantResult,
    state::{CovenantState, SynthesizedOutputs},
    table::{ScriptTable, active_type_count},
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::hashing::HasherExtensions;
use cat_hashes::{Hash160, HasherBase};
use serde::{Deserialize, Serialize};

/// Conservation ledger a CAT20 guard is created with.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20GuardConstState {
    pub token_scripts: ScriptTable,
    /// Declared per-type sum of the input amounts.
    pub token_amounts: [i32; GUARD_TOKEN_TYPE_MAX],
    pub token_burn_amounts: [i32; GUARD_TOKEN_TYPE_MAX],
    pub input_state_hashes: [Option<Hash160>; TX_INPUT_COUNT_MAX],
    pub token_script_indexes: [i8; TX_INPUT_COUNT_MAX],
}

impl CovenantState for Cat20GuardConstState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        for script in self.token_scripts.iter() {
            hasher.write_var_bytes(script.script());
        }
        for amount in self.token_amounts.iter() {
            hasher.write_i32(*amount);
        }
        for amount in self.token_burn_amounts.iter() {
            hasher.write_i32(*amount);
        }
        for hash in self.input_state_hashes.iter() {
            hasher.write_var_bytes(hash.as_ref().map(|hash| hash.as_slice()).unwrap_or_default());
        }
        for index in self.token_script_indexes.iter() {
            hasher.write_u8(*index as u8);
        }
    }
}

impl GuardConstState for Cat20GuardConstState {
    fn scripts(&self) -> &ScriptTable {
        &self.token_scripts
    }

    fn script_indexes(&self) -> &[i8; TX_INPUT_COUNT_MAX] {
        &self.token_script_indexes
    }

    fn input_state_hashes(&self) -> &[Option<Hash160>; TX_INPUT_COUNT_MAX] {
        &self.input_state_hashes
    }
}

/// Everything a CAT20 guard needs to re-derive the transaction outputs.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20GuardUnlock {
    pub state: Cat20GuardConstState,
    /// Raw transaction that created the guard output.
    pub prev_tx: Vec<u8>,
    /// Per output slot: the owner address of a token output, or the raw script of a plain output.
    pub owner_addr_or_scripts: [Vec<u8>; STATE_OUTPUT_COUNT_MAX],
    pub output_tokens: [i32; STATE_OUTPUT_COUNT_MAX],
    pub output_type_indexes: [i8; STATE_OUTPUT_COUNT_MAX],
    pub output_satoshis: [u64; STATE_OUTPUT_COUNT_MAX],
    pub input_states: [Option<Cat20State>; TX_INPUT_COUNT_MAX],
    pub output_count: u8,
}

pub fn unlock(ctx: &SpendContext, call: &Cat20GuardUnlock) -> CovenantResult<()> {
    let state = &call.state;
    verify_guard_self(ctx, state, &call.prev_tx)?;

    let active_types = active_type_count(&state.token_scripts)?;

    // inputs
    let mut sum_input = [0i32; GUARD_TOKEN_TYPE_MAX];
    let mut max_index = NOT_ASSET_INDEX;
    for slot in 0..TX_INPUT_COUNT_MAX {
        let index = state.token_script_indexes[slot];
        let input_state = call.input_states[slot].as_ref();
        let actual_hash = match input_state {
            Some(input_state) => {
                input_state.validate()?;
                Some(input_state.state_hash())
            }
            None => None,
        };
        let position =
            asset_input_slot(ctx, slot, index, active_types, &state.token_scripts, state.input_state_hashes[slot], actual_hash)?;
        if let (Some(position), Some(input_state)) = (position, input_state) {
            sum_input[position] = sum_input[position].checked_add(input_state.amount).ok_or(CovenantError::AmountOverflow)?;
            max_index = max_index.max(index);
        }
    }
    // the number of active types is caller supplied; it is only trusted once every one of them is seen among the inputs
    if max_index != active_types as i8 - 1 {
        return Err(CovenantError::MaxIndexMismatch { observed: max_index, expected: active_types as i8 - 1 });
    }

    // outputs
    let output_count = check_output_count(call.output_count)?;
    let mut sum_output = [0i32; GUARD_TOKEN_TYPE_MAX];
    let mut synthesized = SynthesizedOutputs::new();
    for slot in 0..STATE_OUTPUT_COUNT_MAX {
        let owner_or_script = &call.owner_addr_or_scripts[slot];
        let amount = call.output_tokens[slot];
        let index = call.output_type_indexes[slot];
        let satoshis = call.output_satoshis[slot];
        if slot >= output_count {
            if !owner_or_script.is_empty() || amount != 0 || index != NOT_ASSET_INDEX || satoshis != 0 {
                return Err(CovenantError::UndeclaredSlotNotEmpty(slot));
            }
            continue;
        }
        if index == NOT_ASSET_INDEX {
            if amount != 0 {
                return Err(CovenantError::NonAssetSlotNotEmpty(slot));
            }
            synthesized.push(satoshis, plain_output_script(slot, owner_or_script, &state.token_scripts)?, None)?;
            continue;
        }
        let Some(position) = usize::try_from(index).ok().filter(|position| *position < active_types) else {
            return Err(CovenantError::ScriptIndexOutOfRange { slot, index });
        };
        let output_state = Cat20State::new(owner_or_script.clone(), amount);
        output_state.validate()?;
        sum_output[position] = sum_output[position].checked_add(amount).ok_or(CovenantError::AmountOverflow)?;
        synthesized.push(satoshis, state.token_scripts[position].clone(), Some(output_state.state_hash()))?;
    }

    // conservation
    for position in 0..GUARD_TOKEN_TYPE_MAX {
        let declared = state.token_amounts[position];
        let burn = state.token_burn_amounts[position];
        if position < active_types {
            let balanced = sum_output[position].checked_add(burn).ok_or(CovenantError::AmountOverflow)?;
            if sum_input[position] <= 0 || sum_input[position] != declared || burn < 0 || declared != balanced {
                return Err(CovenantError::ConservationViolated(position));
            }
        } else if declared != 0 || burn != 0 || sum_input[position] != 0 || sum_output[position] != 0 {
            return Err(CovenantError::ConservationViolated(position));
        }
    }

    synthesized.require_matches(ctx)
}

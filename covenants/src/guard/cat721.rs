use super::{GuardConstState, asset_input_slot, check_output_count, plain_output_script, verify_guard_self};
use crate::{
    cat721::Cat721State,
    constants::{NOT_ASSET_INDEX, STATE_OUTPUT_COUNT_MAX, TX_INPUT_COUNT_MAX},
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

/// Ledger a CAT721 guard is created with.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721GuardConstState {
    pub nft_scripts: ScriptTable,
    /// Inputs whose nft is burned rather than carried to an output.
    pub nft_burn_masks: [bool; TX_INPUT_COUNT_MAX],
    pub input_state_hashes: [Option<Hash160>; TX_INPUT_COUNT_MAX],
    pub nft_script_indexes: [i8; TX_INPUT_COUNT_MAX],
}

impl CovenantState for Cat721GuardConstState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        for script in self.nft_scripts.iter() {
            hasher.write_var_bytes(script.script());
        }
        for mask in self.nft_burn_masks.iter() {
            hasher.write_bool(*mask);
        }
        for hash in self.input_state_hashes.iter() {
            hasher.write_var_bytes(hash.as_ref().map(|hash| hash.as_slice()).unwrap_or_default());
        }
        for index in self.nft_script_indexes.iter() {
            hasher.write_u8(*index as u8);
        }
    }
}

impl GuardConstState for Cat721GuardConstState {
    fn scripts(&self) -> &ScriptTable {
        &self.nft_scripts
    }

    fn script_indexes(&self) -> &[i8; TX_INPUT_COUNT_MAX] {
        &self.nft_script_indexes
    }

    fn input_state_hashes(&self) -> &[Option<Hash160>; TX_INPUT_COUNT_MAX] {
        &self.input_state_hashes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721GuardUnlock {
    pub state: Cat721GuardConstState,
    /// Raw transaction that created the guard output.
    pub prev_tx: Vec<u8>,
    /// Per output slot: the owner address of an nft output, or the raw script of a plain output.
    pub owner_addr_or_scripts: [Vec<u8>; STATE_OUTPUT_COUNT_MAX],
    pub output_local_ids: [i32; STATE_OUTPUT_COUNT_MAX],
    pub output_type_indexes: [i8; STATE_OUTPUT_COUNT_MAX],
    pub output_satoshis: [u64; STATE_OUTPUT_COUNT_MAX],
    pub input_states: [Option<Cat721State>; TX_INPUT_COUNT_MAX],
    pub output_count: u8,
}

/// An input nft that must reappear among the outputs.
#[derive(Clone, Copy)]
struct PendingNft {
    position: usize,
    local_id: i32,
    consumed: bool,
}

pub fn unlock(ctx: &SpendContext, call: &Cat721GuardUnlock) -> CovenantResult<()> {
    let state = &call.state;
    verify_guard_self(ctx, state, &call.prev_tx)?;

    let active_types = active_type_count(&state.nft_scripts)?;

    // inputs
    let mut pending: [Option<PendingNft>; TX_INPUT_COUNT_MAX] = [None; TX_INPUT_COUNT_MAX];
    let mut next_nft_count = 0usize;
    let mut max_index = NOT_ASSET_INDEX;
    for slot in 0..TX_INPUT_COUNT_MAX {
        let index = state.nft_script_indexes[slot];
        let input_state = call.input_states[slot].as_ref();
        let actual_hash = match input_state {
            Some(input_state) => {
                input_state.validate()?;
                Some(input_state.state_hash())
            }
            None => None,
        };
        let position =
            asset_input_slot(ctx, slot, index, active_types, &state.nft_scripts, state.input_state_hashes[slot], actual_hash)?;
        match (position, input_state) {
            (Some(position), Some(input_state)) => {
                if !state.nft_burn_masks[slot] {
                    pending[slot] = Some(PendingNft { position, local_id: input_state.local_id, consumed: false });
                    next_nft_count += 1;
                }
                max_index = max_index.max(index);
            }
            _ if state.nft_burn_masks[slot] => return Err(CovenantError::NonAssetSlotNotEmpty(slot)),
            _ => {}
        }
    }
    if max_index != active_types as i8 - 1 {
        return Err(CovenantError::MaxIndexMismatch { observed: max_index, expected: active_types as i8 - 1 });
    }

    // outputs
    let output_count = check_output_count(call.output_count)?;
    let mut output_nft_count = 0usize;
    let mut synthesized = SynthesizedOutputs::new();
    for slot in 0..STATE_OUTPUT_COUNT_MAX {
        let owner_or_script = &call.owner_addr_or_scripts[slot];
        let local_id = call.output_local_ids[slot];
        let index = call.output_type_indexes[slot];
        let satoshis = call.output_satoshis[slot];
        if slot >= output_count {
            if !owner_or_script.is_empty() || local_id != 0 || index != NOT_ASSET_INDEX || satoshis != 0 {
                return Err(CovenantError::UndeclaredSlotNotEmpty(slot));
            }
            continue;
        }
        if index == NOT_ASSET_INDEX {
            if local_id != 0 {
                return Err(CovenantError::NonAssetSlotNotEmpty(slot));
            }
            synthesized.push(satoshis, plain_output_script(slot, owner_or_script, &state.nft_scripts)?, None)?;
            continue;
        }
        let Some(position) = usize::try_from(index).ok().filter(|position| *position < active_types) else {
            return Err(CovenantError::ScriptIndexOutOfRange { slot, index });
        };
        let output_state = Cat721State::new(owner_or_script.clone(), local_id);
        output_state.validate()?;
        let matching = pending.iter_mut().flatten().find(|nft| !nft.consumed && nft.position == position && nft.local_id == local_id);
        match matching {
            Some(nft) => nft.consumed = true,
            None => return Err(CovenantError::NftNotFound(slot)),
        }
        output_nft_count += 1;
        synthesized.push(satoshis, state.nft_scripts[position].clone(), Some(output_state.state_hash()))?;
    }

    if next_nft_count != output_nft_count {
        return Err(CovenantError::NftCountMismatch { inputs: next_nft_count, outputs: output_nft_count });
    }

    synthesized.require_matches(ctx)
}

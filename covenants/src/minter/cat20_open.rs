//!
//! Open CAT20 minter: anyone may mint `limit` tokens per call until
//! `max_count` mints were made. The first mint may instead issue the premine,
//! `premine_count * limit` tokens, with the signature of the premine owner.
//! The remaining count can be split over up to two next minters so mints can
//! proceed in parallel.
//!

use super::verify_minter_lineage;
use crate::{
    backtrace::BacktraceInfo,
    cat20::Cat20State,
    constants::MAX_NEXT_MINTERS,
    context::SpendContext,
    descriptor::CovenantDescriptor,
    error::CovenantError,
    owner::{ContractUnlockArgs, OwnerAddr, check_owner},
    result::CovenantResult,
    state::{CovenantState, SynthesizedOutputs},
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::{
    hashing::HasherExtensions,
    tx::{ScriptPublicKey, TransactionOutpoint},
};
use cat_hashes::HasherBase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20OpenMinterParams {
    pub genesis_outpoint: TransactionOutpoint,
    pub max_count: i32,
    pub premine_count: i32,
    pub limit: i32,
    #[serde(with = "hex::serde")]
    pub premine_addr: OwnerAddr,
}

impl Cat20OpenMinterParams {
    pub fn premine_amount(&self) -> CovenantResult<i32> {
        self.premine_count.checked_mul(self.limit).ok_or(CovenantError::AmountOverflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20OpenMinterState {
    pub token_script: ScriptPublicKey,
    pub has_minted_before: bool,
    pub remaining_count: i32,
}

impl Cat20OpenMinterState {
    pub fn initial(params: &Cat20OpenMinterParams, token_script: ScriptPublicKey) -> Self {
        Self { token_script, has_minted_before: false, remaining_count: params.max_count.saturating_sub(params.premine_count) }
    }
}

impl CovenantState for Cat20OpenMinterState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(self.token_script.script()).write_bool(self.has_minted_before).write_i32(self.remaining_count);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20OpenMinterMint {
    pub state: Cat20OpenMinterState,
    /// Remaining counts of the next minters. Zero entries produce no minter.
    pub next_remaining_counts: [i32; MAX_NEXT_MINTERS],
    pub token: Cat20State,
    /// Signature of the premine owner, only checked on the premine.
    pub premine_args: ContractUnlockArgs,
    pub minter_satoshis: u64,
    pub token_satoshis: u64,
    pub backtrace: BacktraceInfo,
}

/// Token script issued by the minter locked with `minter_script`.
pub fn token_script_for(minter_script: &ScriptPublicKey) -> CovenantResult<ScriptPublicKey> {
    CovenantDescriptor::cat20(minter_script.clone())?.locking_script()
}

pub fn mint(ctx: &SpendContext, params: &Cat20OpenMinterParams, call: &Cat20OpenMinterMint) -> CovenantResult<()> {
    let state = &call.state;
    if state.token_script != token_script_for(ctx.self_script())? {
        return Err(CovenantError::TokenScriptMismatch);
    }
    verify_minter_lineage(ctx, &params.genesis_outpoint, &call.backtrace, state, || {
        Cat20OpenMinterState::initial(params, state.token_script.clone())
    })?;

    call.token.validate()?;
    let is_premine = !state.has_minted_before && params.premine_count > 0;
    let minted_count = if is_premine {
        check_owner(ctx, &params.premine_addr, &call.premine_args)?;
        let expected = params.premine_amount()?;
        if call.token.amount != expected {
            return Err(CovenantError::MintAmountMismatch { expected, actual: call.token.amount });
        }
        0
    } else {
        if state.remaining_count <= 0 {
            return Err(CovenantError::SupplyExhausted);
        }
        if call.token.amount != params.limit {
            return Err(CovenantError::MintAmountMismatch { expected: params.limit, actual: call.token.amount });
        }
        1
    };

    let mut next_total = 0i32;
    for count in call.next_remaining_counts {
        if count < 0 {
            return Err(CovenantError::RemainingCountMismatch);
        }
        next_total = next_total.checked_add(count).ok_or(CovenantError::AmountOverflow)?;
    }
    if Some(next_total) != state.remaining_count.checked_sub(minted_count) {
        return Err(CovenantError::RemainingCountMismatch);
    }

    let mut outputs = SynthesizedOutputs::new();
    for count in call.next_remaining_counts.into_iter().filter(|count| *count > 0) {
        let next = Cat20OpenMinterState { token_script: state.token_script.clone(), has_minted_before: true, remaining_count: count };
        outputs.push(call.minter_satoshis, ctx.self_script().clone(), Some(next.state_hash()))?;
    }
    outputs.push(call.token_satoshis, state.token_script.clone(), Some(call.token.state_hash()))?;
    outputs.require_prefix(ctx)
}

//!
//! Closed CAT20 minter: only the issuer mints, any positive amount per call,
//! for at most `max_count` calls.
//!

use super::{cat20_open::token_script_for, verify_minter_lineage};
use crate::{
    backtrace::BacktraceInfo,
    cat20::Cat20State,
    context::SpendContext,
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
pub struct Cat20ClosedMinterParams {
    pub genesis_outpoint: TransactionOutpoint,
    #[serde(with = "hex::serde")]
    pub issuer_addr: OwnerAddr,
    pub max_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20ClosedMinterState {
    pub token_script: ScriptPublicKey,
    pub remaining_count: i32,
}

impl Cat20ClosedMinterState {
    pub fn initial(params: &Cat20ClosedMinterParams, token_script: ScriptPublicKey) -> Self {
        Self { token_script, remaining_count: params.max_count }
    }
}

impl CovenantState for Cat20ClosedMinterState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(self.token_script.script()).write_i32(self.remaining_count);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20ClosedMinterMint {
    pub state: Cat20ClosedMinterState,
    pub token: Cat20State,
    pub issuer_args: ContractUnlockArgs,
    pub minter_satoshis: u64,
    pub token_satoshis: u64,
    pub backtrace: BacktraceInfo,
}

pub fn mint(ctx: &SpendContext, params: &Cat20ClosedMinterParams, call: &Cat20ClosedMinterMint) -> CovenantResult<()> {
    let state = &call.state;
    if state.token_script != token_script_for(ctx.self_script())? {
        return Err(CovenantError::TokenScriptMismatch);
    }
    verify_minter_lineage(ctx, &params.genesis_outpoint, &call.backtrace, state, || {
        Cat20ClosedMinterState::initial(params, state.token_script.clone())
    })?;
    check_owner(ctx, &params.issuer_addr, &call.issuer_args)?;

    if state.remaining_count <= 0 {
        return Err(CovenantError::SupplyExhausted);
    }
    call.token.validate()?;

    let mut outputs = SynthesizedOutputs::new();
    let remaining_count = state.remaining_count - 1;
    if remaining_count > 0 {
        let next = Cat20ClosedMinterState { token_script: state.token_script.clone(), remaining_count };
        outputs.push(call.minter_satoshis, ctx.self_script().clone(), Some(next.state_hash()))?;
    }
    outputs.push(call.token_satoshis, state.token_script.clone(), Some(call.token.state_hash()))?;
    outputs.require_prefix(ctx)
}

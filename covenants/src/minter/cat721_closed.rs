//!
//! Closed CAT721 minter: the issuer mints local ids `0..max_local_id` in order.
//!

use super::verify_minter_lineage;
use crate::{
    backtrace::BacktraceInfo,
    cat721::Cat721State,
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
pub struct Cat721ClosedMinterParams {
    pub genesis_outpoint: TransactionOutpoint,
    #[serde(with = "hex::serde")]
    pub issuer_addr: OwnerAddr,
    pub max_local_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721ClosedMinterState {
    pub nft_script: ScriptPublicKey,
    pub max_local_id: i32,
    pub next_local_id: i32,
}

impl Cat721ClosedMinterState {
    pub fn initial(params: &Cat721ClosedMinterParams, nft_script: ScriptPublicKey) -> Self {
        Self { nft_script, max_local_id: params.max_local_id, next_local_id: 0 }
    }
}

impl CovenantState for Cat721ClosedMinterState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(self.nft_script.script()).write_i32(self.max_local_id).write_i32(self.next_local_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721ClosedMinterMint {
    pub state: Cat721ClosedMinterState,
    pub nft: Cat721State,
    pub issuer_args: ContractUnlockArgs,
    pub minter_satoshis: u64,
    pub nft_satoshis: u64,
    pub backtrace: BacktraceInfo,
}

/// Collection script issued by the minter locked with `minter_script`.
pub fn nft_script_for(minter_script: &ScriptPublicKey) -> CovenantResult<ScriptPublicKey> {
    CovenantDescriptor::cat721(minter_script.clone())?.locking_script()
}

pub fn mint(ctx: &SpendContext, params: &Cat721ClosedMinterParams, call: &Cat721ClosedMinterMint) -> CovenantResult<()> {
    let state = &call.state;
    if state.nft_script != nft_script_for(ctx.self_script())? {
        return Err(CovenantError::TokenScriptMismatch);
    }
    verify_minter_lineage(ctx, &params.genesis_outpoint, &call.backtrace, state, || {
        Cat721ClosedMinterState::initial(params, state.nft_script.clone())
    })?;
    check_owner(ctx, &params.issuer_addr, &call.issuer_args)?;

    if state.next_local_id >= state.max_local_id {
        return Err(CovenantError::SupplyExhausted);
    }
    call.nft.validate()?;
    if call.nft.local_id != state.next_local_id {
        return Err(CovenantError::LeafMismatch);
    }

    let mut outputs = SynthesizedOutputs::new();
    let next_local_id = state.next_local_id + 1;
    if next_local_id < state.max_local_id {
        let next = Cat721ClosedMinterState { next_local_id, ..state.clone() };
        outputs.push(call.minter_satoshis, ctx.self_script().clone(), Some(next.state_hash()))?;
    }
    outputs.push(call.nft_satoshis, state.nft_script.clone(), Some(call.nft.state_hash()))?;
    outputs.require_prefix(ctx)
}

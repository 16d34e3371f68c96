//!
//! CAT721 non-fungible token contract.
//!

use crate::{
    backtrace::{BacktraceInfo, Lineage, verify_backtrace},
    context::SpendContext,
    error::CovenantError,
    guard::{GuardInfo, cat721::Cat721GuardConstState, verify_guard_for_input},
    owner::{ContractUnlockArgs, OwnerAddr, check_owner, owner_kind},
    result::CovenantResult,
    state::{CovenantState, verify_state_binding},
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::{hashing::HasherExtensions, tx::ScriptPublicKey};
use cat_hashes::HasherBase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721State {
    #[serde(with = "hex::serde")]
    pub owner_addr: OwnerAddr,
    pub local_id: i32,
}

impl Cat721State {
    pub fn new(owner_addr: OwnerAddr, local_id: i32) -> Self {
        Self { owner_addr, local_id }
    }

    pub fn validate(&self) -> CovenantResult<()> {
        owner_kind(&self.owner_addr)?;
        if self.local_id < 0 {
            return Err(CovenantError::InvalidState("nft local id must not be negative"));
        }
        Ok(())
    }
}

impl CovenantState for Cat721State {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(&self.owner_addr).write_i32(self.local_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721Unlock {
    pub state: Cat721State,
    pub args: ContractUnlockArgs,
    pub guard: GuardInfo<Cat721GuardConstState>,
    pub backtrace: BacktraceInfo,
}

pub fn unlock(
    ctx: &SpendContext,
    minter_script: &ScriptPublicKey,
    guard_script: &ScriptPublicKey,
    call: &Cat721Unlock,
) -> CovenantResult<()> {
    let state = &call.state;
    state.validate()?;
    let state_hash = state.state_hash();

    let backtrace = verify_backtrace(ctx, &call.backtrace, Lineage::Ancestor(minter_script))?;
    verify_state_binding(&backtrace.prev_tx, ctx.self_outpoint(), state_hash)?;

    verify_guard_for_input(ctx, guard_script, &call.guard, state_hash)?;
    check_owner(ctx, &state.owner_addr, &call.args)
}

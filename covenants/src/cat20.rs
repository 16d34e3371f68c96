//!
//! CAT20 fungible token contract.
//!

use crate::{
    backtrace::{BacktraceInfo, Lineage, verify_backtrace},
    context::SpendContext,
    error::CovenantError,
    guard::{GuardInfo, cat20::Cat20GuardConstState, verify_guard_for_input},
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
pub struct Cat20State {
    #[serde(with = "hex::serde")]
    pub owner_addr: OwnerAddr,
    pub amount: i32,
}

impl Cat20State {
    pub fn new(owner_addr: OwnerAddr, amount: i32) -> Self {
        Self { owner_addr, amount }
    }

    pub fn validate(&self) -> CovenantResult<()> {
        owner_kind(&self.owner_addr)?;
        if self.amount <= 0 {
            return Err(CovenantError::InvalidState("token amount must be positive"));
        }
        Ok(())
    }
}

impl CovenantState for Cat20State {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(&self.owner_addr).write_i32(self.amount);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat20Unlock {
    pub state: Cat20State,
    pub args: ContractUnlockArgs,
    pub guard: GuardInfo<Cat20GuardConstState>,
    pub backtrace: BacktraceInfo,
}

/// Spends a token output. Conservation is left to the guard the call points at.
pub fn unlock(
    ctx: &SpendContext,
    minter_script: &ScriptPublicKey,
    guard_script: &ScriptPublicKey,
    call: &Cat20Unlock,
) -> CovenantResult<()> {
    let state = &call.state;
    state.validate()?;
    let state_hash = state.state_hash();

    let backtrace = verify_backtrace(ctx, &call.backtrace, Lineage::Ancestor(minter_script))?;
    verify_state_binding(&backtrace.prev_tx, ctx.self_outpoint(), state_hash)?;

    verify_guard_for_input(ctx, guard_script, &call.guard, state_hash)?;
    check_owner(ctx, &state.owner_addr, &call.args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cat_hashes::hash160;

    #[test]
    fn test_state_hash_is_field_serialization() {
        let owner = vec![0x51, 0x20].into_iter().chain([7u8; 32]).collect::<Vec<_>>();
        let state = Cat20State::new(owner.clone(), 1000);
        let mut expected = vec![34u8];
        expected.extend_from_slice(&owner);
        expected.extend_from_slice(&1000i32.to_le_bytes());
        assert_eq!(state.serialize_state(), expected);
        assert_eq!(state.state_hash(), hash160(&expected));
        // value-equal states hash equally
        assert_eq!(Cat20State::new(owner, 1000).state_hash(), state.state_hash());
    }

    #[test]
    fn test_validate() {
        let owner = vec![0x00, 0x14].into_iter().chain([1u8; 20]).collect::<Vec<_>>();
        assert!(Cat20State::new(owner.clone(), 1).validate().is_ok());
        assert_eq!(Cat20State::new(owner.clone(), 0).validate(), Err(CovenantError::InvalidState("token amount must be positive")));
        assert!(Cat20State::new(owner, -5).validate().is_err());
        assert_eq!(Cat20State::new(vec![1; 21], 5).validate(), Err(CovenantError::InvalidOwnerAddr(21)));
    }
}

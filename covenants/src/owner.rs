//!
//! Owner addresses. A user owner is the locking script of the user's key
//! (P2WPKH or P2TR), a contract owner is the sha256 of the owning contract's
//! locking script. Lengths tell the two apart.
//!

use crate::{
    constants::{OWNER_ADDR_CONTRACT_HASH_LEN, OWNER_ADDR_P2TR_LEN, OWNER_ADDR_P2WPKH_LEN},
    context::SpendContext,
    error::CovenantError,
    result::CovenantResult,
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::tx::ScriptPublicKey;
use cat_hashes::sha256;
use serde::{Deserialize, Serialize};

pub type OwnerAddr = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    User,
    Contract,
}

/// Classifies a well-formed owner address.
pub fn owner_kind(owner_addr: &[u8]) -> CovenantResult<OwnerKind> {
    match owner_addr.len() {
        OWNER_ADDR_CONTRACT_HASH_LEN => Ok(OwnerKind::Contract),
        OWNER_ADDR_P2WPKH_LEN | OWNER_ADDR_P2TR_LEN => {
            let script = ScriptPublicKey::from_vec(owner_addr.to_vec());
            if script.is_p2wpkh() || script.is_p2tr() {
                Ok(OwnerKind::User)
            } else {
                Err(CovenantError::InvalidOwnerAddr(owner_addr.len()))
            }
        }
        len => Err(CovenantError::InvalidOwnerAddr(len)),
    }
}

/// Owner address of assets held by the contract locked with `script`.
pub fn contract_owner_addr(script: &ScriptPublicKey) -> OwnerAddr {
    sha256(script.script()).as_slice().to_vec()
}

/// Owner address of assets held by the key locking `script`.
pub fn user_owner_addr(script: &ScriptPublicKey) -> OwnerAddr {
    script.script().to_vec()
}

/// Proof that the spender controls the owner address of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractUnlockArgs {
    /// Compressed public key of a user owner, empty for a contract owner.
    #[serde(with = "hex::serde")]
    pub user_pubkey: Vec<u8>,
    /// Signature of a user owner over the spending input, empty for a contract owner.
    #[serde(with = "hex::serde")]
    pub user_sig: Vec<u8>,
    /// Input spending the owning contract, `-1` for a user owner.
    pub contract_input_index: i8,
}

impl ContractUnlockArgs {
    pub fn user(user_pubkey: Vec<u8>, user_sig: Vec<u8>) -> Self {
        Self { user_pubkey, user_sig, contract_input_index: -1 }
    }

    pub fn contract(contract_input_index: i8) -> Self {
        Self { user_pubkey: vec![], user_sig: vec![], contract_input_index }
    }
}

/// Checks that the spender of the current input controls `owner_addr`.
pub fn check_owner(ctx: &SpendContext, owner_addr: &[u8], args: &ContractUnlockArgs) -> CovenantResult<()> {
    match owner_kind(owner_addr)? {
        OwnerKind::Contract => {
            let index = usize::try_from(args.contract_input_index)
                .map_err(|_| CovenantError::IndexOutOfRange(args.contract_input_index as usize, "contract input"))?;
            let script = ctx.input_script(index)?;
            if contract_owner_addr(script) != owner_addr {
                return Err(CovenantError::ContractOwnerMismatch);
            }
            Ok(())
        }
        OwnerKind::User => ctx.verify_signature(&args.user_pubkey, &args.user_sig, &ScriptPublicKey::from_vec(owner_addr.to_vec())),
    }
}

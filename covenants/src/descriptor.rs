//!
//! Covenant descriptors and calls.
//!
//! A descriptor names a covenant kind together with its constructor parameters.
//! Its locking script is P2TR shaped, with the program committing to the borsh
//! encoding of the descriptor. Spending a covenant output reveals the descriptor
//! and the call in the witness:
//!
//! `[borsh(CovenantCall), borsh(CovenantDescriptor)]`
//!

use crate::{
    cat20::Cat20Unlock,
    cat721::Cat721Unlock,
    error::CovenantError,
    guard::{cat20::Cat20GuardUnlock, cat721::Cat721GuardUnlock},
    minter::{
        cat20_closed::{Cat20ClosedMinterMint, Cat20ClosedMinterParams},
        cat20_open::{Cat20OpenMinterMint, Cat20OpenMinterParams},
        cat721_closed::{Cat721ClosedMinterMint, Cat721ClosedMinterParams},
        cat721_open::{Cat721OpenMinterMint, Cat721OpenMinterParams},
    },
    result::CovenantResult,
};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::{script::pay_to_taproot_program, tx::ScriptPublicKey};
use cat_hashes::{CovenantProgramHash, Hasher, HasherBase};
use serde::{Deserialize, Serialize};

/// Number of witness items of a covenant spend.
pub const COVENANT_WITNESS_ITEMS: usize = 2;

/// Scripts an asset contract is bound to.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetParams {
    pub minter_script: ScriptPublicKey,
    pub guard_script: ScriptPublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CovenantDescriptor {
    Cat20OpenMinter(Cat20OpenMinterParams),
    Cat20ClosedMinter(Cat20ClosedMinterParams),
    Cat20(AssetParams),
    Cat20Guard,
    Cat721OpenMinter(Cat721OpenMinterParams),
    Cat721ClosedMinter(Cat721ClosedMinterParams),
    Cat721(AssetParams),
    Cat721Guard,
}

impl CovenantDescriptor {
    /// CAT20 token minted by `minter_script`, conserved by the CAT20 guard.
    pub fn cat20(minter_script: ScriptPublicKey) -> CovenantResult<Self> {
        Ok(Self::Cat20(AssetParams { minter_script, guard_script: Self::Cat20Guard.locking_script()? }))
    }

    /// CAT721 collection minted by `minter_script`, conserved by the CAT721 guard.
    pub fn cat721(minter_script: ScriptPublicKey) -> CovenantResult<Self> {
        Ok(Self::Cat721(AssetParams { minter_script, guard_script: Self::Cat721Guard.locking_script()? }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cat20OpenMinter(_) => "cat20-open-minter",
            Self::Cat20ClosedMinter(_) => "cat20-closed-minter",
            Self::Cat20(_) => "cat20",
            Self::Cat20Guard => "cat20-guard",
            Self::Cat721OpenMinter(_) => "cat721-open-minter",
            Self::Cat721ClosedMinter(_) => "cat721-closed-minter",
            Self::Cat721(_) => "cat721",
            Self::Cat721Guard => "cat721-guard",
        }
    }

    pub fn to_bytes(&self) -> CovenantResult<Vec<u8>> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> CovenantResult<Self> {
        Self::try_from_slice(bytes).map_err(|err| CovenantError::Decode("covenant descriptor", err.to_string()))
    }

    pub fn program(&self) -> CovenantResult<[u8; 32]> {
        let mut hasher = CovenantProgramHash::new();
        hasher.update(self.to_bytes()?);
        Ok(hasher.finalize().as_bytes())
    }

    pub fn locking_script(&self) -> CovenantResult<ScriptPublicKey> {
        Ok(pay_to_taproot_program(self.program()?))
    }
}

/// The method invoked on a covenant, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum CovenantCall {
    Cat20OpenMinterMint(Box<Cat20OpenMinterMint>),
    Cat20ClosedMinterMint(Box<Cat20ClosedMinterMint>),
    Cat20Unlock(Box<Cat20Unlock>),
    Cat20GuardUnlock(Box<Cat20GuardUnlock>),
    Cat721OpenMinterMint(Box<Cat721OpenMinterMint>),
    Cat721ClosedMinterMint(Box<Cat721ClosedMinterMint>),
    Cat721Unlock(Box<Cat721Unlock>),
    Cat721GuardUnlock(Box<Cat721GuardUnlock>),
}

impl CovenantCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cat20OpenMinterMint(_) => "cat20-open-minter.mint",
            Self::Cat20ClosedMinterMint(_) => "cat20-closed-minter.mint",
            Self::Cat20Unlock(_) => "cat20.unlock",
            Self::Cat20GuardUnlock(_) => "cat20-guard.unlock",
            Self::Cat721OpenMinterMint(_) => "cat721-open-minter.mint",
            Self::Cat721ClosedMinterMint(_) => "cat721-closed-minter.mint",
            Self::Cat721Unlock(_) => "cat721.unlock",
            Self::Cat721GuardUnlock(_) => "cat721-guard.unlock",
        }
    }

    pub fn to_bytes(&self) -> CovenantResult<Vec<u8>> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> CovenantResult<Self> {
        Self::try_from_slice(bytes).map_err(|err| CovenantError::Decode("covenant call", err.to_string()))
    }

    /// Witness spending a covenant described by `descriptor` with this call.
    pub fn to_witness(&self, descriptor: &CovenantDescriptor) -> CovenantResult<Vec<Vec<u8>>> {
        Ok(vec![self.to_bytes()?, descriptor.to_bytes()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scripts_are_distinct_and_stable() {
        let cat20_guard = CovenantDescriptor::Cat20Guard.locking_script().unwrap();
        let cat721_guard = CovenantDescriptor::Cat721Guard.locking_script().unwrap();
        assert!(cat20_guard.is_p2tr());
        assert_ne!(cat20_guard, cat721_guard);
        assert_eq!(cat20_guard, CovenantDescriptor::Cat20Guard.locking_script().unwrap());
    }

    #[test]
    fn test_descriptor_round_trip() {
        let minter = ScriptPublicKey::from_vec(vec![0x51, 0x20].into_iter().chain([5u8; 32]).collect());
        let descriptor = CovenantDescriptor::cat20(minter.clone()).unwrap();
        let decoded = CovenantDescriptor::from_bytes(&descriptor.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, descriptor);
        assert_eq!(descriptor.kind(), "cat20");
        // the token script depends on its minter
        let other = CovenantDescriptor::cat721(minter).unwrap();
        assert_ne!(descriptor.locking_script().unwrap(), other.locking_script().unwrap());
    }
}

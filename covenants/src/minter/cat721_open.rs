//!
//! Open CAT721 minter. The collection is fixed up front as a Merkle tree of
//! leaves `{commit_script, local_id, is_mined}`. Minting local id `n` proves
//! the unmined leaf `n` against the current root and replaces it with its
//! mined version; the resulting root goes to the next minter. Local ids below
//! `premine_count` need the premine owner's signature.
//!

use super::{cat721_closed::nft_script_for, verify_minter_lineage};
use crate::{
    backtrace::BacktraceInfo,
    cat721::Cat721State,
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
use cat_hashes::{Hash160, HasherBase};
use cat_merkle::{MerkleProof, update_leaf};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721OpenMinterParams {
    pub genesis_outpoint: TransactionOutpoint,
    pub max_count: i32,
    pub premine_count: i32,
    #[serde(with = "hex::serde")]
    pub premine_addr: OwnerAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721OpenMinterState {
    pub nft_script: ScriptPublicKey,
    pub merkle_root: Hash160,
    pub next_local_id: i32,
}

impl CovenantState for Cat721OpenMinterState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(self.nft_script.script()).write_var_bytes(self.merkle_root.as_slice()).write_i32(self.next_local_id);
    }
}

/// A leaf of the collection tree. `commit_script` is opaque to the minter.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721MerkleLeaf {
    #[serde(with = "hex::serde")]
    pub commit_script: Vec<u8>,
    pub local_id: i32,
    pub is_mined: bool,
}

impl Cat721MerkleLeaf {
    pub fn new(commit_script: Vec<u8>, local_id: i32) -> Self {
        Self { commit_script, local_id, is_mined: false }
    }

    pub fn mined(&self) -> Self {
        Self { is_mined: true, ..self.clone() }
    }
}

impl CovenantState for Cat721MerkleLeaf {
    fn write_state<H: HasherBase>(&self, hasher: &mut H) {
        hasher.write_var_bytes(&self.commit_script).write_i32(self.local_id).write_bool(self.is_mined);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat721OpenMinterMint {
    pub state: Cat721OpenMinterState,
    pub nft: Cat721State,
    /// The leaf being minted, as it stands in the current tree.
    pub leaf: Cat721MerkleLeaf,
    pub proof: MerkleProof,
    pub premine_args: ContractUnlockArgs,
    pub minter_satoshis: u64,
    pub nft_satoshis: u64,
    pub backtrace: BacktraceInfo,
}

pub fn mint(ctx: &SpendContext, params: &Cat721OpenMinterParams, call: &Cat721OpenMinterMint) -> CovenantResult<()> {
    let state = &call.state;
    if state.nft_script != nft_script_for(ctx.self_script())? {
        return Err(CovenantError::TokenScriptMismatch);
    }
    // the deployer chooses the collection, so only the counter is fixed at genesis
    verify_minter_lineage(ctx, &params.genesis_outpoint, &call.backtrace, state, || Cat721OpenMinterState {
        next_local_id: 0,
        ..state.clone()
    })?;

    if state.next_local_id >= params.max_count {
        return Err(CovenantError::SupplyExhausted);
    }
    call.nft.validate()?;
    let local_id = state.next_local_id;
    if call.nft.local_id != local_id || call.leaf.local_id != local_id || call.leaf.is_mined {
        return Err(CovenantError::LeafMismatch);
    }
    if call.proof.leaf_index() != local_id as usize {
        return Err(CovenantError::LeafMismatch);
    }
    let merkle_root = update_leaf(call.leaf.state_hash(), call.leaf.mined().state_hash(), &call.proof, state.merkle_root)
        .ok_or(CovenantError::MerkleProofInvalid)?;

    if local_id < params.premine_count {
        check_owner(ctx, &params.premine_addr, &call.premine_args)?;
    }

    let mut outputs = SynthesizedOutputs::new();
    let next_local_id = local_id + 1;
    if next_local_id < params.max_count {
        let next = Cat721OpenMinterState { nft_script: state.nft_script.clone(), merkle_root, next_local_id };
        outputs.push(call.minter_satoshis, ctx.self_script().clone(), Some(next.state_hash()))?;
    }
    outputs.push(call.nft_satoshis, state.nft_script.clone(), Some(call.nft.state_hash()))?;
    outputs.require_prefix(ctx)
}

//!
//! A fixed-height binary Merkle tree over [`Hash160`] leaves.
//!
//! Nodes are `hash160(left || right)`. Proofs carry one sibling per level together
//! with the side the sibling sits on, so that the concatenation order used while
//! verifying always matches the order used while building the tree.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use cat_hashes::{Hash160, Hasher, HasherBase, StateHash, ZERO_HASH160};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of levels including the leaves and the root.
pub const MERKLE_TREE_HEIGHT: usize = 15;
/// Number of siblings in a proof.
pub const MERKLE_PROOF_DEPTH: usize = MERKLE_TREE_HEIGHT - 1;
/// Leaf capacity of the tree.
pub const MERKLE_LEAF_CAPACITY: usize = 1 << MERKLE_PROOF_DEPTH;
/// Value of a leaf slot that was never populated.
pub const EMPTY_LEAF: Hash160 = ZERO_HASH160;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("too many leaves: {0} exceeds the capacity of {MERKLE_LEAF_CAPACITY}")]
    TooManyLeaves(usize),

    #[error("leaf index {0} is out of range")]
    IndexOutOfRange(usize),
}

pub fn merkle_hash(left: Hash160, right: Hash160) -> Hash160 {
    let mut hasher = StateHash::new();
    hasher.update(left).update(right);
    hasher.finalize()
}

/// Authentication path for a single leaf, ordered from the leaf level upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: [Hash160; MERKLE_PROOF_DEPTH],
    /// `true` when the sibling at that level is the left child.
    pub sibling_is_left: [bool; MERKLE_PROOF_DEPTH],
}

impl MerkleProof {
    /// Folds `leaf` up the path and returns the implied root.
    pub fn root_for(&self, leaf: Hash160) -> Hash160 {
        self.siblings.iter().zip(self.sibling_is_left.iter()).fold(leaf, |node, (sibling, is_left)| {
            if *is_left { merkle_hash(*sibling, node) } else { merkle_hash(node, *sibling) }
        })
    }

    /// Leaf index encoded by the direction flags.
    pub fn leaf_index(&self) -> usize {
        self.sibling_is_left.iter().enumerate().fold(0, |acc, (level, is_left)| if *is_left { acc | (1 << level) } else { acc })
    }
}

pub fn verify_leaf(leaf: Hash160, proof: &MerkleProof, root: Hash160) -> bool {
    proof.root_for(leaf) == root
}

/// Replaces `old_leaf` by `new_leaf` under `root`. Returns the new root, or `None`
/// if `old_leaf` is not authenticated by `proof` against `root`.
pub fn update_leaf(old_leaf: Hash160, new_leaf: Hash160, proof: &MerkleProof, root: Hash160) -> Option<Hash160> {
    verify_leaf(old_leaf, proof, root).then(|| proof.root_for(new_leaf))
}

/// Full in-memory tree, used by the issuing side to produce proofs.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    // levels[0] are the leaves, levels[MERKLE_PROOF_DEPTH] holds the root alone
    levels: Vec<Vec<Hash160>>,
}

impl MerkleTree {
    pub fn new(leaves: &[Hash160]) -> Result<Self, MerkleError> {
        if leaves.len() > MERKLE_LEAF_CAPACITY {
            return Err(MerkleError::TooManyLeaves(leaves.len()));
        }
        let mut level = vec![EMPTY_LEAF; MERKLE_LEAF_CAPACITY];
        level[..leaves.len()].copy_from_slice(leaves);

        let mut levels = Vec::with_capacity(MERKLE_TREE_HEIGHT);
        while level.len() > 1 {
            let next = level.chunks_exact(2).map(|pair| merkle_hash(pair[0], pair[1])).collect();
            levels.push(std::mem::replace(&mut level, next));
        }
        levels.push(level);
        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash160 {
        self.levels[MERKLE_PROOF_DEPTH][0]
    }

    pub fn leaf(&self, index: usize) -> Option<Hash160> {
        self.levels[0].get(index).copied()
    }

    pub fn merkle_path(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= MERKLE_LEAF_CAPACITY {
            return Err(MerkleError::IndexOutOfRange(index));
        }
        let mut siblings = [EMPTY_LEAF; MERKLE_PROOF_DEPTH];
        let mut sibling_is_left = [false; MERKLE_PROOF_DEPTH];
        let mut position = index;
        for level in 0..MERKLE_PROOF_DEPTH {
            siblings[level] = self.levels[level][position ^ 1];
            sibling_is_left[level] = position & 1 == 1;
            position >>= 1;
        }
        Ok(MerkleProof { siblings, sibling_is_left })
    }

    /// Replaces the leaf at `index` and recomputes its path to the root.
    pub fn update_leaf(&mut self, index: usize, leaf: Hash160) -> Result<Hash160, MerkleError> {
        if index >= MERKLE_LEAF_CAPACITY {
            return Err(MerkleError::IndexOutOfRange(index));
        }
        self.levels[0][index] = leaf;
        let mut position = index;
        for level in 0..MERKLE_PROOF_DEPTH {
            let base = position & !1;
            let parent = merkle_hash(self.levels[level][base], self.levels[level][base + 1]);
            position >>= 1;
            self.levels[level + 1][position] = parent;
        }
        Ok(self.root())
    }
}

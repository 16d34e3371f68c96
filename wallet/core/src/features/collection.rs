use crate::imports::*;
use cat_covenants::{minter::cat721_open::Cat721MerkleLeaf, state::CovenantState};
use cat_hashes::Hash160;
use cat_merkle::{MerkleProof, MerkleTree};

/// Issuer-side copy of an open collection's Merkle tree. Leaf `i` holds the
/// commit script of local id `i`.
#[derive(Clone, Debug)]
pub struct CollectionTree {
    leaves: Vec<Cat721MerkleLeaf>,
    tree: MerkleTree,
}

impl CollectionTree {
    pub fn new(commit_scripts: Vec<Vec<u8>>) -> Result<Self> {
        let leaves = commit_scripts
            .into_iter()
            .enumerate()
            .map(|(local_id, script)| {
                let local_id = i32::try_from(local_id).map_err(|_| Error::InvalidAmount(local_id as i64))?;
                Ok(Cat721MerkleLeaf::new(script, local_id))
            })
            .collect::<Result<Vec<_>>>()?;
        let hashes = leaves.iter().map(|leaf| leaf.state_hash()).collect::<Vec<_>>();
        let tree = MerkleTree::new(&hashes)?;
        Ok(Self { leaves, tree })
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn root(&self) -> Hash160 {
        self.tree.root()
    }

    pub fn leaf(&self, local_id: i32) -> Result<&Cat721MerkleLeaf> {
        usize::try_from(local_id)
            .ok()
            .and_then(|index| self.leaves.get(index))
            .ok_or_else(|| Error::custom(format!("local id {local_id} is not part of the collection")))
    }

    pub fn proof(&self, local_id: i32) -> Result<MerkleProof> {
        self.leaf(local_id)?;
        Ok(self.tree.merkle_path(local_id as usize)?)
    }

    /// Flags `local_id` as mined and returns the new root.
    pub fn mark_mined(&mut self, local_id: i32) -> Result<Hash160> {
        let mined = self.leaf(local_id)?.mined();
        let root = self.tree.update_leaf(local_id as usize, mined.state_hash())?;
        self.leaves[local_id as usize] = mined;
        Ok(root)
    }
}

//!
//! Token operations: deploy, mint, guarded transfer, send and burn for CAT20
//! tokens and CAT721 collections.
//!

pub mod collection;
pub mod deploy;
pub mod mint;
pub mod send;
pub mod transfer;

use crate::imports::*;
use cat_covenants::state::TxStateOutput;
use cat_hashes::Hash160;

pub use collection::CollectionTree;
pub use deploy::{Cat20ClosedDeploy, Cat20OpenDeploy, Cat721ClosedDeploy, Cat721OpenDeploy, Deployment, TokenMetadata};
pub use mint::Minted;
pub use transfer::{AssetOutput, Transfer};

/// State output committing to `hashes`, the first one belonging to output 1.
pub(crate) fn state_output(hashes: &[Option<Hash160>]) -> Result<TransactionOutput> {
    let mut state = TxStateOutput::default();
    for (position, hash) in hashes.iter().enumerate() {
        state.set(position + 1, *hash)?;
    }
    Ok(state.to_output())
}

//!
//! # CAT wallet core
//!
//! Builds, signs and broadcasts the transactions of the CAT20 and CAT721
//! protocols: deploying minters, minting, guarded transfers, sends and burns.
//!
//! Key management, UTXO discovery and access to the chain are capabilities
//! supplied by the caller ([`Signer`], [`UtxoProvider`], [`ChainProvider`]).
//! Every transaction is checked with the covenant verification engine before
//! it is broadcast.
//!

pub mod backtrace;
pub mod cache;
pub mod error;
pub mod features;
mod imports;
pub mod provider;
pub mod psbt;
pub mod registry;
pub mod result;
pub mod retry;
pub mod selection;
pub mod settings;
pub mod signer;
pub mod tracker;
pub mod tx;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use backtrace::CovenantUtxo;
pub use error::Error;
pub use provider::{ChainProvider, Utxo, UtxoFilter, UtxoProvider};
pub use registry::{CovenantRegistry, TokenInfo};
pub use result::Result;
pub use settings::WalletSettings;
pub use signer::{AddressKind, KeypairSigner, Signer};
pub use tracker::{TrackerClient, TrackerTransport};
pub use wallet::Wallet;

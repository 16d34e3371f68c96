//!
//! # CAT covenants
//!
//! Verification of CAT20 fungible tokens and CAT721 non-fungible tokens on a
//! UTXO chain. Assets live in covenant outputs whose state is committed by the
//! state output of the transaction that created them. Asset contracts check
//! ownership and provenance, guards check conservation across a whole
//! transaction, and minters issue new assets under a supply cap.
//!

pub mod backtrace;
pub mod cat20;
pub mod cat721;
pub mod constants;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod guard;
pub mod minter;
pub mod owner;
pub mod result;
pub mod state;
pub mod table;

#[cfg(test)]
mod tests;

pub use descriptor::{CovenantCall, CovenantDescriptor};
pub use engine::TransactionValidator;
pub use error::CovenantError;
pub use result::CovenantResult;

//!
//! Transaction assembly with exact fees.
//!

pub mod draft;

pub use draft::{CallBuilder, FinalizedTransaction, InputUnlock, TransactionDraft, UnlockContext};

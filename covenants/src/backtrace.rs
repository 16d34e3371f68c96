//!
//! One-hop provenance. The transaction that created the current input
//! (`prev_tx`) is recomputed from its raw bytes; the input of `prev_tx` named by
//! `prev_tx_input_index` is then resolved against `prev_prev_tx` to recover the
//! script it spent. That script must be the covenant itself, its configured
//! ancestor, or the spent outpoint must be the genesis outpoint.
//!

use crate::{context::SpendContext, error::CovenantError, result::CovenantResult};
use borsh::{BorshDeserialize, BorshSerialize};
use cat_consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutpoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktraceInfo {
    /// Raw transaction that created the spent output.
    #[serde(with = "hex::serde")]
    pub prev_tx: Vec<u8>,
    /// Raw transaction that created the output spent by `prev_tx` at `prev_tx_input_index`.
    #[serde(with = "hex::serde")]
    pub prev_prev_tx: Vec<u8>,
    pub prev_tx_input_index: u32,
}

/// What the traced input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktraceOrigin {
    /// The previous transaction spent an output of this very covenant.
    Continuation,
    /// The previous transaction spent the configured ancestor.
    Ancestor,
    /// The previous transaction spent the genesis outpoint.
    Genesis,
}

/// Accepted ancestry of a covenant.
#[derive(Debug, Clone, Copy)]
pub enum Lineage<'a> {
    /// Tokens descend from their minter.
    Ancestor(&'a ScriptPublicKey),
    /// Minters descend from the outpoint spent by their deploy transaction.
    Genesis(&'a TransactionOutpoint),
}

pub struct Backtrace {
    pub prev_tx: Transaction,
    pub origin: BacktraceOrigin,
}

pub fn verify_backtrace(ctx: &SpendContext, info: &BacktraceInfo, lineage: Lineage) -> CovenantResult<Backtrace> {
    let prev_tx = Transaction::deserialize(&info.prev_tx)?;
    if prev_tx.id() != ctx.self_outpoint().transaction_id {
        return Err(CovenantError::PrevTxIdMismatch);
    }

    let traced_input = prev_tx
        .inputs
        .get(info.prev_tx_input_index as usize)
        .ok_or(CovenantError::IndexOutOfRange(info.prev_tx_input_index as usize, "previous transaction inputs"))?;
    let traced_outpoint = traced_input.previous_outpoint;

    let prev_prev_tx = Transaction::deserialize(&info.prev_prev_tx)?;
    if prev_prev_tx.id() != traced_outpoint.transaction_id {
        return Err(CovenantError::PrevPrevTxIdMismatch);
    }
    let traced_script = &prev_prev_tx
        .outputs
        .get(traced_outpoint.index as usize)
        .ok_or(CovenantError::IndexOutOfRange(traced_outpoint.index as usize, "previous-previous transaction outputs"))?
        .script_public_key;

    let origin = if traced_script == ctx.self_script() {
        BacktraceOrigin::Continuation
    } else {
        match lineage {
            Lineage::Ancestor(ancestor) if traced_script == ancestor => BacktraceOrigin::Ancestor,
            Lineage::Genesis(genesis) if &traced_outpoint == genesis => BacktraceOrigin::Genesis,
            _ => return Err(CovenantError::BacktraceScriptMismatch),
        }
    };

    Ok(Backtrace { prev_tx, origin })
}

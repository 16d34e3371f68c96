//!
//! UTXO selection. The fee-paying UTXO is the largest candidate, which keeps
//! the number of fee outputs small over time. Token UTXOs are chosen to
//! cover an amount with as few inputs as possible: a single exact match
//! first, then the smallest single output that covers the amount, then the
//! largest outputs accumulated in turn.
//!

use crate::backtrace::CovenantUtxo;
use crate::imports::*;
use cat_covenants::cat20::Cat20State;

pub fn pick_fee_utxo(utxos: &[Utxo]) -> Result<Utxo> {
    utxos.iter().max_by_key(|utxo| utxo.satoshis).cloned().ok_or(Error::NoFeeUtxo)
}

pub fn total_amount(utxos: &[CovenantUtxo<Cat20State>]) -> i64 {
    utxos.iter().map(|utxo| utxo.state.amount as i64).sum()
}

/// Selects at most `max_inputs` token UTXOs holding at least `amount`.
pub fn select_token_utxos(
    utxos: &[CovenantUtxo<Cat20State>],
    amount: i32,
    max_inputs: usize,
) -> Result<Vec<CovenantUtxo<Cat20State>>> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount as i64));
    }
    if let Some(exact) = utxos.iter().find(|utxo| utxo.state.amount == amount) {
        return Ok(vec![exact.clone()]);
    }
    if let Some(over) = utxos.iter().filter(|utxo| utxo.state.amount > amount).min_by_key(|utxo| utxo.state.amount) {
        return Ok(vec![over.clone()]);
    }

    let mut sorted = utxos.to_vec();
    sorted.sort_by_key(|utxo| std::cmp::Reverse(utxo.state.amount));
    let mut selected = vec![];
    let mut covered = 0i64;
    for utxo in sorted.into_iter().take(max_inputs) {
        covered += utxo.state.amount as i64;
        selected.push(utxo);
        if covered >= amount as i64 {
            return Ok(selected);
        }
    }
    Err(Error::InsufficientTokens { required: amount as i64, available: covered })
}

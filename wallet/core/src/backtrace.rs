//!
//! Gathers the backtrace arguments of covenant inputs: the transaction that
//! created the spent output and, among its inputs, one that spent either
//! the same covenant or its accepted ancestor.
//!

use crate::cache::TxCache;
use crate::imports::*;
use cat_covenants::{
    backtrace::{BacktraceInfo, Lineage},
    state::{CovenantState, verify_state_binding},
};

/// A covenant output together with the state committed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CovenantUtxo<S> {
    pub utxo: Utxo,
    pub state: S,
}

impl<S> CovenantUtxo<S> {
    pub fn new(utxo: Utxo, state: S) -> Self {
        Self { utxo, state }
    }

    /// Output `index` of `tx`, carrying `state`.
    pub fn from_tx(tx: &Transaction, index: u32, state: S) -> Result<Self> {
        let utxo = Utxo::from_tx(tx, index).ok_or_else(|| Error::custom(format!("transaction {} has no output {index}", tx.id())))?;
        Ok(Self { utxo, state })
    }
}

/// Resolves the backtrace of `utxo`, locked with `script`, and checks that its
/// claimed state is the one committed on chain.
pub async fn resolve_backtrace<S: CovenantState>(cache: &TxCache, utxo: &CovenantUtxo<S>, lineage: Lineage<'_>) -> Result<BacktraceInfo> {
    let outpoint = utxo.utxo.outpoint();
    let prev_tx = cache.get(outpoint.transaction_id).await?;
    verify_state_binding(&prev_tx, &outpoint, utxo.state.state_hash())?;

    let mut parents = vec![];
    for input in prev_tx.inputs.iter() {
        if !parents.contains(&input.previous_outpoint.transaction_id) {
            parents.push(input.previous_outpoint.transaction_id);
        }
    }
    let mut parents = cache.get_each(parents).await;

    // a parent that cannot be fetched only matters when no other one is accepted
    let mut unavailable = None;
    for (index, input) in prev_tx.inputs.iter().enumerate() {
        let traced = input.previous_outpoint;
        let prev_prev_tx = match parents.get(&traced.transaction_id) {
            Some(Ok(tx)) => tx,
            Some(Err(_)) => {
                unavailable.get_or_insert(traced.transaction_id);
                continue;
            }
            None => continue,
        };
        let Some(spent) = prev_prev_tx.outputs.get(traced.index as usize) else {
            continue;
        };
        let accepted = spent.script_public_key == utxo.utxo.script
            || match lineage {
                Lineage::Ancestor(ancestor) => &spent.script_public_key == ancestor,
                Lineage::Genesis(genesis) => &traced == genesis,
            };
        if accepted {
            return Ok(BacktraceInfo {
                prev_tx: Transaction::serialize(&prev_tx),
                prev_prev_tx: Transaction::serialize(prev_prev_tx),
                prev_tx_input_index: index as u32,
            });
        }
    }
    match unavailable.and_then(|tx_id| parents.remove(&tx_id)) {
        Some(Err(err)) => {
            warn!("backtrace of {outpoint} is incomplete: {err}");
            Err(err)
        }
        _ => Err(Error::BacktraceNotFound(outpoint)),
    }
}

/// Resolves the backtraces of several inputs of the same lineage concurrently.
pub async fn resolve_backtraces<S: CovenantState>(
    cache: &TxCache,
    utxos: &[CovenantUtxo<S>],
    lineage: Lineage<'_>,
) -> Result<Vec<BacktraceInfo>> {
    try_join_all(utxos.iter().map(|utxo| resolve_backtrace(cache, utxo, lineage))).await
}

//!
//! Capabilities the wallet consumes: a source of spendable outputs and
//! access to the chain. Implementations talk to nodes, indexers or, in
//! tests, an in-memory chain.
//!

use crate::imports::*;

/// A spendable output as reported by a UTXO provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub tx_id: TransactionId,
    pub output_index: u32,
    pub script: ScriptPublicKey,
    pub satoshis: u64,
}

impl Utxo {
    pub fn new(tx_id: TransactionId, output_index: u32, script: ScriptPublicKey, satoshis: u64) -> Self {
        Self { tx_id, output_index, script, satoshis }
    }

    /// Output `index` of `tx`, if it exists.
    pub fn from_tx(tx: &Transaction, index: u32) -> Option<Self> {
        let output = tx.outputs.get(index as usize)?;
        Some(Self::new(tx.id(), index, output.script_public_key.clone(), output.value))
    }

    pub fn outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.tx_id, self.output_index)
    }

    pub fn entry(&self) -> UtxoEntry {
        UtxoEntry::new(self.satoshis, self.script.clone())
    }

    pub fn output(&self) -> TransactionOutput {
        TransactionOutput::new(self.satoshis, self.script.clone())
    }
}

/// Bounds of a UTXO listing. `total` asks the provider to stop once the
/// listed value covers it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoFilter {
    pub total: Option<u64>,
    pub max_cnt: Option<usize>,
}

#[async_trait]
pub trait UtxoProvider: Send + Sync {
    async fn get_utxos(&self, address: &ScriptPublicKey, filter: UtxoFilter) -> Result<Vec<Utxo>>;

    /// Excludes an output from further listings once a spending transaction was broadcast.
    fn mark_spent(&self, tx_id: &TransactionId, vout: u32);

    /// Makes an output of a broadcast transaction available before it confirms.
    fn add_new_utxo(&self, utxo: Utxo);
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn broadcast(&self, tx_hex: &str) -> Result<TransactionId>;

    async fn get_raw_transaction(&self, tx_id: &TransactionId) -> Result<String>;

    async fn get_confirmations(&self, tx_id: &TransactionId) -> Result<u64>;
}

//!
//! Per-build cache of raw transactions. Tracing several asset inputs often
//! reaches the same previous transaction more than once; each transaction is
//! fetched at most once per build, and every fetch is bounded by a timeout.
//!

use crate::imports::*;

pub struct TxCache {
    chain: Arc<dyn ChainProvider>,
    timeout: Duration,
    txs: Mutex<HashMap<TransactionId, Arc<Transaction>>>,
}

impl TxCache {
    pub fn new(chain: Arc<dyn ChainProvider>, timeout: Duration) -> Self {
        Self { chain, timeout, txs: Mutex::new(HashMap::new()) }
    }

    /// Adds a transaction built locally, so it is never fetched.
    pub fn insert(&self, tx: Transaction) -> Arc<Transaction> {
        let tx = Arc::new(tx);
        self.txs.lock().unwrap().insert(tx.id(), tx.clone());
        tx
    }

    pub fn contains(&self, tx_id: &TransactionId) -> bool {
        self.txs.lock().unwrap().contains_key(tx_id)
    }

    pub async fn get(&self, tx_id: TransactionId) -> Result<Arc<Transaction>> {
        let cached = self.txs.lock().unwrap().get(&tx_id).cloned();
        if let Some(tx) = cached {
            return Ok(tx);
        }
        let tx_hex = tokio::time::timeout(self.timeout, self.chain.get_raw_transaction(&tx_id))
            .await
            .map_err(|_| Error::Timeout { what: format!("transaction {tx_id}"), millis: self.timeout.as_millis() as u64 })??;
        let tx = Transaction::from_hex(&tx_hex)?;
        if tx.id() != tx_id {
            return Err(Error::custom(format!("provider returned transaction {} for {tx_id}", tx.id())));
        }
        trace!("fetched transaction {tx_id}");
        Ok(self.insert(tx))
    }

    /// Fetches all of `tx_ids` concurrently. Each fetch keeps its own outcome, so one
    /// missing transaction does not hide the others.
    pub async fn get_each(&self, tx_ids: impl IntoIterator<Item = TransactionId>) -> HashMap<TransactionId, Result<Arc<Transaction>>> {
        let tx_ids = tx_ids.into_iter().collect::<Vec<_>>();
        let fetched = join_all(tx_ids.iter().map(|tx_id| self.get(*tx_id))).await;
        tx_ids.into_iter().zip(fetched).collect()
    }
}

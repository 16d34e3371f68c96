//!
//! Broadcast retry policy. Only transport failures that a later attempt can
//! plausibly overcome are retried; verification failures never are.
//!

use crate::imports::*;

const RETRYABLE_MESSAGES: &[&str] = &[
    "txn-mempool-conflict",
    "bad-txns-inputs-missingorspent",
    "transaction already in block chain",
    "txn-already-known",
    "min relay fee not met",
    "mempool min fee not met",
    "insufficient fee",
];

/// Whether a failed provider call is worth retrying.
pub fn need_retry(err: &Error) -> bool {
    match err {
        Error::Transport(msg) => {
            let msg = msg.to_lowercase();
            RETRYABLE_MESSAGES.iter().any(|pattern| msg.contains(pattern))
        }
        Error::Timeout { .. } => true,
        _ => false,
    }
}

/// Retries broadcasts rejected with a retryable message. Reads go straight through.
pub struct RetryChainProvider {
    inner: Arc<dyn ChainProvider>,
    attempts: u32,
    delay: Duration,
}

impl RetryChainProvider {
    pub fn new(inner: Arc<dyn ChainProvider>, attempts: u32, delay: Duration) -> Self {
        Self { inner, attempts: attempts.max(1), delay }
    }
}

#[async_trait]
impl ChainProvider for RetryChainProvider {
    async fn broadcast(&self, tx_hex: &str) -> Result<TransactionId> {
        let mut attempt = 1;
        loop {
            match self.inner.broadcast(tx_hex).await {
                Err(err) if attempt < self.attempts && need_retry(&err) => {
                    warn!("broadcast attempt {attempt}/{} failed: {err}", self.attempts);
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                result => return result,
            }
        }
    }

    async fn get_raw_transaction(&self, tx_id: &TransactionId) -> Result<String> {
        self.inner.get_raw_transaction(tx_id).await
    }

    async fn get_confirmations(&self, tx_id: &TransactionId) -> Result<u64> {
        self.inner.get_confirmations(tx_id).await
    }
}

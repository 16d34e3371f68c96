//!
//! [`Wallet`] binds a signer, the providers, the settings and the covenant
//! registry. Every feature builds its transactions through it.
//!

use crate::cache::TxCache;
use crate::imports::*;
use crate::retry::RetryChainProvider;
use crate::selection::pick_fee_utxo;
use crate::tx::FinalizedTransaction;
use cat_covenants::TransactionValidator;

struct Inner {
    signer: Arc<dyn Signer>,
    utxo_provider: Arc<dyn UtxoProvider>,
    chain: Arc<dyn ChainProvider>,
    settings: WalletSettings,
    registry: RwLock<CovenantRegistry>,
    validator: TransactionValidator,
}

#[derive(Clone)]
pub struct Wallet {
    inner: Arc<Inner>,
}

impl Wallet {
    /// Broadcasts go through a [`RetryChainProvider`] configured from `settings`.
    pub fn new(
        signer: Arc<dyn Signer>,
        utxo_provider: Arc<dyn UtxoProvider>,
        chain: Arc<dyn ChainProvider>,
        settings: WalletSettings,
        registry: CovenantRegistry,
    ) -> Self {
        let chain = Arc::new(RetryChainProvider::new(chain, settings.broadcast_retry_attempts, settings.broadcast_retry_delay()));
        let inner = Inner {
            signer,
            utxo_provider,
            chain,
            settings,
            registry: RwLock::new(registry),
            validator: TransactionValidator::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.inner.signer
    }

    pub fn chain(&self) -> &Arc<dyn ChainProvider> {
        &self.inner.chain
    }

    pub fn settings(&self) -> &WalletSettings {
        &self.inner.settings
    }

    pub fn register_token(&self, info: TokenInfo) -> Result<()> {
        self.inner.registry.write().unwrap().register_token(info)
    }

    pub fn token(&self, token_id: &str) -> Result<TokenInfo> {
        self.inner.registry.read().unwrap().token(token_id).cloned()
    }

    pub fn descriptor(&self, script: &ScriptPublicKey) -> Result<CovenantDescriptor> {
        self.inner.registry.read().unwrap().descriptor(script).cloned()
    }

    /// A fresh cache for one build.
    pub fn tx_cache(&self) -> TxCache {
        TxCache::new(self.inner.chain.clone(), self.inner.settings.fetch_timeout())
    }

    pub async fn address(&self) -> Result<ScriptPublicKey> {
        self.inner.signer.get_address().await
    }

    /// The largest plain UTXO of the signer.
    pub async fn fee_utxo(&self) -> Result<Utxo> {
        let address = self.address().await?;
        let listing = self.inner.utxo_provider.get_utxos(&address, UtxoFilter::default());
        let utxos = tokio::time::timeout(self.inner.settings.fetch_timeout(), listing).await.map_err(|_| Error::Timeout {
            what: format!("UTXOs of {address}"),
            millis: self.inner.settings.fetch_timeout_millis,
        })??;
        pick_fee_utxo(&utxos)
    }

    pub async fn finalize(&self, draft: &mut crate::tx::TransactionDraft) -> Result<FinalizedTransaction> {
        let settings = &self.inner.settings;
        draft.finalize(self.inner.signer.as_ref(), settings.fee_rate(), settings.dust_limit()).await
    }

    /// Runs the verification engine over `tx`.
    pub fn verify(&self, tx: &FinalizedTransaction) -> Result<()> {
        Ok(self.inner.validator.verify(&tx.tx, &tx.entries)?)
    }

    /// Broadcasts `tx`, then marks its inputs spent and makes its outputs available.
    pub async fn broadcast(&self, tx: &FinalizedTransaction) -> Result<TransactionId> {
        if self.inner.settings.verify_transactions {
            self.verify(tx)?;
        }
        let tx_id = self.inner.chain.broadcast(&tx.tx.to_hex()).await?;
        if tx_id != tx.id() {
            return Err(Error::custom(format!("broadcast of {} returned {tx_id}", tx.id())));
        }
        for input in tx.tx.inputs.iter() {
            self.inner.utxo_provider.mark_spent(&input.previous_outpoint.transaction_id, input.previous_outpoint.index);
        }
        for (index, output) in tx.tx.outputs.iter().enumerate() {
            if !output.script_public_key.is_op_return() {
                self.inner.utxo_provider.add_new_utxo(Utxo::new(tx_id, index as u32, output.script_public_key.clone(), output.value));
            }
        }
        info!("broadcast transaction {tx_id} paying a fee of {}", tx.fee);
        Ok(tx_id)
    }

    /// Broadcasts several dependent transactions in order.
    pub async fn broadcast_all(&self, txs: &[&FinalizedTransaction]) -> Result<Vec<TransactionId>> {
        // nothing is broadcast unless every transaction verifies
        if self.inner.settings.verify_transactions {
            for tx in txs {
                self.verify(tx)?;
            }
        }
        let mut tx_ids = Vec::with_capacity(txs.len());
        for tx in txs {
            tx_ids.push(self.broadcast(tx).await?);
        }
        Ok(tx_ids)
    }
}

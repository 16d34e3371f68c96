//!
//! Client of the tracker, the indexer that serves token metadata, token and
//! minter UTXOs and balances. Every response is wrapped in an envelope:
//! `{"code": 0, "data": ..}` on success, `{"code": <non zero>, "msg": ..}` on
//! failure. The HTTP layer is left to a [`TrackerTransport`].
//!

use crate::backtrace::CovenantUtxo;
use crate::imports::*;
use crate::wallet::Wallet;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait TrackerTransport: Send + Sync {
    /// Body of `GET <tracker>/<path>`.
    async fn get(&self, path: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    data: Option<T>,
    msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUtxos<S> {
    pub utxos: Vec<CovenantUtxo<S>>,
    #[serde(default)]
    pub tracker_block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token_id: String,
    pub confirmed: i64,
    #[serde(default)]
    pub tracker_block_height: u64,
}

#[derive(Clone)]
pub struct TrackerClient {
    transport: Arc<dyn TrackerTransport>,
}

impl TrackerClient {
    pub fn new(transport: Arc<dyn TrackerTransport>) -> Self {
        Self { transport }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.transport.get(path).await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.code != 0 {
            return Err(Error::Tracker { code: envelope.code, msg: envelope.msg.unwrap_or_default() });
        }
        trace!("tracker {path}: ok");
        envelope.data.ok_or_else(|| Error::Tracker { code: 0, msg: format!("{path} returned no data") })
    }

    pub async fn token_info(&self, token_id: &str) -> Result<TokenInfo> {
        self.get(&format!("api/tokens/{token_id}")).await
    }

    /// Token or nft UTXOs held by `owner_addr`, given as hex.
    pub async fn token_utxos<S: DeserializeOwned>(&self, token_id: &str, owner_addr: &str) -> Result<TrackerUtxos<S>> {
        self.get(&format!("api/tokens/{token_id}/addresses/{owner_addr}/utxos")).await
    }

    pub async fn balance(&self, token_id: &str, owner_addr: &str) -> Result<TokenBalance> {
        self.get(&format!("api/tokens/{token_id}/addresses/{owner_addr}/balance")).await
    }

    pub async fn minter_utxos<S: DeserializeOwned>(&self, token_id: &str) -> Result<TrackerUtxos<S>> {
        self.get(&format!("api/minters/{token_id}/utxos")).await
    }
}

impl Wallet {
    /// Looks `token_id` up on the tracker and registers its covenants.
    pub async fn import_token(&self, tracker: &TrackerClient, token_id: &str) -> Result<TokenInfo> {
        let info = tracker.token_info(token_id).await?;
        if info.token_id != token_id {
            return Err(Error::InvalidTokenId(info.token_id));
        }
        let genesis = info.genesis_outpoint()?;
        if crate::registry::token_id(&genesis) != token_id {
            return Err(Error::InvalidTokenId(token_id.to_string()));
        }
        self.register_token(info.clone())?;
        Ok(info)
    }
}

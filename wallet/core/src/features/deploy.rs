//!
//! Deploy transactions. The deploy spends the signer's fee UTXO, whose
//! outpoint becomes the genesis outpoint and token id, and creates the first
//! minter at output 1 with its initial state.
//!

use super::{CollectionTree, state_output};
use crate::backtrace::CovenantUtxo;
use crate::imports::*;
use crate::registry::token_id;
use crate::tx::{FinalizedTransaction, TransactionDraft};
use crate::wallet::Wallet;
use cat_covenants::{
    minter::{
        GENESIS_MINTER_OUTPUT_INDEX,
        cat20_closed::{Cat20ClosedMinterParams, Cat20ClosedMinterState},
        cat20_open::{Cat20OpenMinterParams, Cat20OpenMinterState, token_script_for},
        cat721_closed::{Cat721ClosedMinterParams, Cat721ClosedMinterState, nft_script_for},
        cat721_open::{Cat721OpenMinterParams, Cat721OpenMinterState},
    },
    owner::{OwnerAddr, owner_kind, user_owner_addr},
    state::CovenantState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
}

/// Open CAT20 mint: `limit` tokens per mint, `max_count` mints in total of which
/// the first `premine_count` go to the premine owner in a single mint.
#[derive(Debug, Clone)]
pub struct Cat20OpenDeploy {
    pub max_count: i32,
    pub premine_count: i32,
    pub limit: i32,
    /// Defaults to the signer.
    pub premine_addr: Option<OwnerAddr>,
}

/// Closed CAT20 mint: the signer issues up to `max_count` mints.
#[derive(Debug, Clone)]
pub struct Cat20ClosedDeploy {
    pub max_count: i32,
}

/// Closed collection: the signer issues local ids `0..max_local_id`.
#[derive(Debug, Clone)]
pub struct Cat721ClosedDeploy {
    pub max_local_id: i32,
}

/// Open collection: anyone mints the next leaf of the tree built from `commit_scripts`.
#[derive(Debug, Clone)]
pub struct Cat721OpenDeploy {
    pub premine_count: i32,
    pub premine_addr: Option<OwnerAddr>,
    pub commit_scripts: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Deployment<S> {
    pub token: TokenInfo,
    pub tx: FinalizedTransaction,
    pub minter: CovenantUtxo<S>,
}

fn require_positive(value: i32, what: &str) -> Result<()> {
    if value <= 0 {
        return Err(Error::custom(format!("{what} must be positive, got {value}")));
    }
    Ok(())
}

fn require_premine(premine_count: i32, max_count: i32) -> Result<()> {
    if premine_count < 0 || premine_count > max_count {
        return Err(Error::custom(format!("premine count {premine_count} is outside 0..={max_count}")));
    }
    Ok(())
}

impl Wallet {
    async fn signer_owner_addr(&self) -> Result<OwnerAddr> {
        Ok(user_owner_addr(&self.address().await?))
    }

    pub async fn deploy_cat20_open(&self, metadata: TokenMetadata, deploy: Cat20OpenDeploy) -> Result<Deployment<Cat20OpenMinterState>> {
        require_positive(deploy.max_count, "max count")?;
        require_positive(deploy.limit, "limit")?;
        require_premine(deploy.premine_count, deploy.max_count)?;
        let premine_addr = match deploy.premine_addr {
            Some(addr) => addr,
            None => self.signer_owner_addr().await?,
        };
        owner_kind(&premine_addr)?;

        let fee_utxo = self.fee_utxo().await?;
        let params = Cat20OpenMinterParams {
            genesis_outpoint: fee_utxo.outpoint(),
            max_count: deploy.max_count,
            premine_count: deploy.premine_count,
            limit: deploy.limit,
            premine_addr,
        };
        params.premine_amount()?;
        let descriptor = CovenantDescriptor::Cat20OpenMinter(params.clone());
        let state = Cat20OpenMinterState::initial(&params, token_script_for(&descriptor.locking_script()?)?);
        self.deploy_minter(metadata, fee_utxo, descriptor, state).await
    }

    pub async fn deploy_cat20_closed(&self, metadata: TokenMetadata, deploy: Cat20ClosedDeploy) -> Result<Deployment<Cat20ClosedMinterState>> {
        require_positive(deploy.max_count, "max count")?;
        let fee_utxo = self.fee_utxo().await?;
        let params = Cat20ClosedMinterParams {
            genesis_outpoint: fee_utxo.outpoint(),
            issuer_addr: self.signer_owner_addr().await?,
            max_count: deploy.max_count,
        };
        let descriptor = CovenantDescriptor::Cat20ClosedMinter(params.clone());
        let state = Cat20ClosedMinterState::initial(&params, token_script_for(&descriptor.locking_script()?)?);
        self.deploy_minter(metadata, fee_utxo, descriptor, state).await
    }

    pub async fn deploy_cat721_closed(
        &self,
        metadata: TokenMetadata,
        deploy: Cat721ClosedDeploy,
    ) -> Result<Deployment<Cat721ClosedMinterState>> {
        require_positive(deploy.max_local_id, "max local id")?;
        let fee_utxo = self.fee_utxo().await?;
        let params = Cat721ClosedMinterParams {
            genesis_outpoint: fee_utxo.outpoint(),
            issuer_addr: self.signer_owner_addr().await?,
            max_local_id: deploy.max_local_id,
        };
        let descriptor = CovenantDescriptor::Cat721ClosedMinter(params.clone());
        let state = Cat721ClosedMinterState::initial(&params, nft_script_for(&descriptor.locking_script()?)?);
        self.deploy_minter(TokenMetadata { decimals: 0, ..metadata }, fee_utxo, descriptor, state).await
    }

    /// Also returns the collection tree, which the issuer keeps to produce mint proofs.
    pub async fn deploy_cat721_open(
        &self,
        metadata: TokenMetadata,
        deploy: Cat721OpenDeploy,
    ) -> Result<(Deployment<Cat721OpenMinterState>, CollectionTree)> {
        let tree = CollectionTree::new(deploy.commit_scripts)?;
        let max_count = i32::try_from(tree.len()).map_err(|_| Error::InvalidAmount(tree.len() as i64))?;
        require_positive(max_count, "collection size")?;
        require_premine(deploy.premine_count, max_count)?;
        let premine_addr = match deploy.premine_addr {
            Some(addr) => addr,
            None => self.signer_owner_addr().await?,
        };
        owner_kind(&premine_addr)?;

        let fee_utxo = self.fee_utxo().await?;
        let params = Cat721OpenMinterParams { genesis_outpoint: fee_utxo.outpoint(), max_count, premine_count: deploy.premine_count, premine_addr };
        let descriptor = CovenantDescriptor::Cat721OpenMinter(params);
        let state = Cat721OpenMinterState {
            nft_script: nft_script_for(&descriptor.locking_script()?)?,
            merkle_root: tree.root(),
            next_local_id: 0,
        };
        let deployment = self.deploy_minter(TokenMetadata { decimals: 0, ..metadata }, fee_utxo, descriptor, state).await?;
        Ok((deployment, tree))
    }

    async fn deploy_minter<S: CovenantState>(
        &self,
        metadata: TokenMetadata,
        fee_utxo: Utxo,
        descriptor: CovenantDescriptor,
        state: S,
    ) -> Result<Deployment<S>> {
        let genesis = fee_utxo.outpoint();
        let mut draft = TransactionDraft::new();
        draft
            .add_key_spend(fee_utxo)
            .add_output(state_output(&[Some(state.state_hash())])?)
            .add_output(TransactionOutput::new(self.settings().minter_satoshis, descriptor.locking_script()?))
            .set_change(self.address().await?);
        let tx = self.finalize(&mut draft).await?;
        self.broadcast(&tx).await?;

        let token = TokenInfo {
            token_id: token_id(&genesis),
            name: metadata.name,
            symbol: metadata.symbol,
            decimals: metadata.decimals,
            minter: descriptor,
            reveal_tx_id: tx.id(),
        };
        self.register_token(token.clone())?;
        info!("deployed {} {} as {}", token.minter.kind(), token.symbol, token.token_id);
        let minter = CovenantUtxo::from_tx(&tx.tx, GENESIS_MINTER_OUTPUT_INDEX, state)?;
        Ok(Deployment { token, tx, minter })
    }
}

//!
//! Sending and burning on top of [`Wallet::transfer_cat20`] and
//! [`Wallet::transfer_cat721`].
//!

use super::transfer::{AssetOutput, MAX_ASSET_INPUTS, MAX_ASSET_OUTPUTS, Transfer};
use crate::backtrace::CovenantUtxo;
use crate::imports::*;
use crate::selection::{select_token_utxos, total_amount};
use crate::wallet::Wallet;
use cat_covenants::{
    cat20::Cat20State,
    cat721::Cat721State,
    owner::{OwnerAddr, owner_kind, user_owner_addr},
};

fn of_token<S: Clone>(token: &TokenInfo, utxos: &[CovenantUtxo<S>]) -> Result<Vec<CovenantUtxo<S>>> {
    let script = token.asset_script()?;
    Ok(utxos.iter().filter(|utxo| utxo.utxo.script == script).cloned().collect())
}

impl Wallet {
    /// Sends `amount` to each receiver out of `utxos`, returning the rest to the signer.
    pub async fn send_cat20(
        &self,
        token: &TokenInfo,
        utxos: &[CovenantUtxo<Cat20State>],
        receivers: &[(OwnerAddr, i32)],
    ) -> Result<Transfer<Cat20State>> {
        if receivers.is_empty() {
            return Err(Error::custom("no receivers"));
        }
        let mut amount = 0i32;
        for (owner, value) in receivers {
            owner_kind(owner)?;
            if *value <= 0 {
                return Err(Error::InvalidAmount(*value as i64));
            }
            amount = amount.checked_add(*value).ok_or(cat_covenants::CovenantError::AmountOverflow)?;
        }
        let candidates = of_token(token, utxos)?;
        let selected = select_token_utxos(&candidates, amount, MAX_ASSET_INPUTS)?;
        let script = token.asset_script()?;

        let mut outputs =
            receivers.iter().map(|(owner, value)| AssetOutput::new(script.clone(), Cat20State::new(owner.clone(), *value))).collect::<Vec<_>>();
        let change = total_amount(&selected) - amount as i64;
        if change > 0 {
            let owner = user_owner_addr(&self.address().await?);
            outputs.push(AssetOutput::new(script, Cat20State::new(owner, change as i32)));
        }
        if outputs.len() > MAX_ASSET_OUTPUTS {
            return Err(Error::TooManyOutputs(outputs.len(), MAX_ASSET_OUTPUTS));
        }
        info!("sending {amount} {} to {} receivers", token.symbol, receivers.len());
        self.transfer_cat20(selected, outputs).await
    }

    /// Burns `amount` tokens, or every given UTXO when `amount` is `None`.
    pub async fn burn_cat20(
        &self,
        token: &TokenInfo,
        utxos: &[CovenantUtxo<Cat20State>],
        amount: Option<i32>,
    ) -> Result<Transfer<Cat20State>> {
        let candidates = of_token(token, utxos)?;
        let Some(amount) = amount else {
            info!("burning {} {}", total_amount(&candidates), token.symbol);
            return self.transfer_cat20(candidates, vec![]).await;
        };
        let selected = select_token_utxos(&candidates, amount, MAX_ASSET_INPUTS)?;
        let change = total_amount(&selected) - amount as i64;
        let mut outputs = vec![];
        if change > 0 {
            let owner = user_owner_addr(&self.address().await?);
            outputs.push(AssetOutput::new(token.asset_script()?, Cat20State::new(owner, change as i32)));
        }
        info!("burning {amount} {}", token.symbol);
        self.transfer_cat20(selected, outputs).await
    }

    pub async fn send_cat721(
        &self,
        collection: &TokenInfo,
        nfts: &[CovenantUtxo<Cat721State>],
        receiver: OwnerAddr,
    ) -> Result<Transfer<Cat721State>> {
        owner_kind(&receiver)?;
        let inputs = of_token(collection, nfts)?;
        if inputs.len() != nfts.len() {
            return Err(Error::custom(format!("not every nft belongs to {}", collection.token_id)));
        }
        let outputs = inputs
            .iter()
            .map(|nft| AssetOutput::new(nft.utxo.script.clone(), Cat721State::new(receiver.clone(), nft.state.local_id)))
            .collect();
        info!("sending {} {} nfts", inputs.len(), collection.symbol);
        self.transfer_cat721(inputs, outputs).await
    }

    pub async fn burn_cat721(&self, collection: &TokenInfo, nfts: &[CovenantUtxo<Cat721State>]) -> Result<Transfer<Cat721State>> {
        let inputs = of_token(collection, nfts)?;
        if inputs.len() != nfts.len() {
            return Err(Error::custom(format!("not every nft belongs to {}", collection.token_id)));
        }
        info!("burning {} {} nfts", inputs.len(), collection.symbol);
        self.transfer_cat721(inputs, vec![]).await
    }

    pub async fn confirmations(&self, tx_id: &TransactionId) -> Result<u64> {
        self.chain().get_confirmations(tx_id).await
    }
}

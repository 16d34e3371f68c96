//!
//! Mint transactions. A mint spends a minter together with a fee UTXO and
//! emits the state output, the next minters, the minted asset and the change:
//!
//! `[state, next minters.., asset, change]`
//!

use super::{CollectionTree, state_output};
use crate::backtrace::{CovenantUtxo, resolve_backtrace};
use crate::imports::*;
use crate::tx::{FinalizedTransaction, TransactionDraft, UnlockContext};
use crate::wallet::Wallet;
use cat_covenants::{
    backtrace::{BacktraceInfo, Lineage},
    cat20::Cat20State,
    cat721::Cat721State,
    constants::MAX_NEXT_MINTERS,
    minter::{
        cat20_closed::{Cat20ClosedMinterMint, Cat20ClosedMinterState},
        cat20_open::{Cat20OpenMinterMint, Cat20OpenMinterState},
        cat721_closed::{Cat721ClosedMinterMint, Cat721ClosedMinterState},
        cat721_open::{Cat721OpenMinterMint, Cat721OpenMinterState},
    },
    owner::{ContractUnlockArgs, OwnerAddr, user_owner_addr},
    state::CovenantState,
};

/// Result of a mint: the broadcast transaction, the minted asset and the
/// minters that continue the issuance.
#[derive(Debug, Clone)]
pub struct Minted<M, A> {
    pub tx: FinalizedTransaction,
    pub asset: CovenantUtxo<A>,
    pub minters: Vec<CovenantUtxo<M>>,
}

/// Splits the remaining count of an open minter over up to two next minters.
pub fn split_remaining(total: i32) -> [i32; MAX_NEXT_MINTERS] {
    let total = total.max(0);
    [(total + 1) / 2, total / 2]
}

struct MintPlan<M, A> {
    minter: CovenantUtxo<M>,
    sign: bool,
    next_minters: Vec<M>,
    asset: A,
}

impl Wallet {
    async fn mint_with<M, A, F>(&self, token: &TokenInfo, plan: MintPlan<M, A>, build_call: F) -> Result<Minted<M, A>>
    where
        M: CovenantState + Clone,
        A: CovenantState + Clone,
        F: Fn(&UnlockContext<'_>, &BacktraceInfo) -> Result<CovenantCall> + Send + Sync + 'static,
    {
        let MintPlan { minter, sign, next_minters, asset } = plan;
        if minter.utxo.script != token.minter_script()? {
            return Err(Error::custom(format!("{} is not a minter of {}", minter.utxo.outpoint(), token.token_id)));
        }
        let genesis = token.genesis_outpoint()?;
        let backtrace = resolve_backtrace(&self.tx_cache(), &minter, Lineage::Genesis(&genesis)).await?;
        let fee_utxo = self.fee_utxo().await?;
        let settings = self.settings();

        let mut hashes = next_minters.iter().map(|state| Some(state.state_hash())).collect::<Vec<_>>();
        hashes.push(Some(asset.state_hash()));

        let mut draft = TransactionDraft::new();
        draft
            .add_covenant(minter.utxo.clone(), token.minter.clone(), sign, Box::new(move |ctx| build_call(ctx, &backtrace)))
            .add_key_spend(fee_utxo)
            .add_output(state_output(&hashes)?);
        for _ in next_minters.iter() {
            draft.add_output(TransactionOutput::new(settings.minter_satoshis, minter.utxo.script.clone()));
        }
        draft.add_output(TransactionOutput::new(settings.token_satoshis, token.asset_script()?)).set_change(self.address().await?);

        let tx = self.finalize(&mut draft).await?;
        self.broadcast(&tx).await?;

        let minters = next_minters
            .into_iter()
            .enumerate()
            .map(|(index, state)| CovenantUtxo::from_tx(&tx.tx, index as u32 + 1, state))
            .collect::<Result<Vec<_>>>()?;
        let asset = CovenantUtxo::from_tx(&tx.tx, minters.len() as u32 + 1, asset)?;
        info!("minted {} from {} in {}", token.symbol, minter.utxo.outpoint(), tx.id());
        Ok(Minted { tx, asset, minters })
    }

    /// Mints from an open CAT20 minter. The first mint of a token with a premine
    /// issues the premine to the premine owner, who must be the signer.
    pub async fn mint_cat20_open(
        &self,
        token: &TokenInfo,
        minter: CovenantUtxo<Cat20OpenMinterState>,
        receiver: Option<OwnerAddr>,
    ) -> Result<Minted<Cat20OpenMinterState, Cat20State>> {
        let CovenantDescriptor::Cat20OpenMinter(params) = &token.minter else {
            return Err(Error::custom(format!("{} is not an open CAT20 token", token.token_id)));
        };
        let state = minter.state.clone();
        let is_premine = !state.has_minted_before && params.premine_count > 0;
        let (amount, owner, next_total) = if is_premine {
            (params.premine_amount()?, params.premine_addr.clone(), state.remaining_count)
        } else {
            if state.remaining_count <= 0 {
                return Err(Error::SupplyExhausted);
            }
            let owner = match receiver {
                Some(owner) => owner,
                None => user_owner_addr(&self.address().await?),
            };
            (params.limit, owner, state.remaining_count - 1)
        };

        let next_remaining_counts = split_remaining(next_total);
        let next_minters = next_remaining_counts
            .iter()
            .filter(|count| **count > 0)
            .map(|count| Cat20OpenMinterState { token_script: state.token_script.clone(), has_minted_before: true, remaining_count: *count })
            .collect();
        let minted = Cat20State::new(owner, amount);
        let (minter_satoshis, token_satoshis) = (self.settings().minter_satoshis, self.settings().token_satoshis);
        let plan = MintPlan { minter, sign: is_premine, next_minters, asset: minted.clone() };
        self.mint_with(token, plan, move |ctx, backtrace| {
            let premine_args = if is_premine { ctx.owner_args()? } else { ContractUnlockArgs::default() };
            Ok(CovenantCall::Cat20OpenMinterMint(Box::new(Cat20OpenMinterMint {
                state: state.clone(),
                next_remaining_counts,
                token: minted.clone(),
                premine_args,
                minter_satoshis,
                token_satoshis,
                backtrace: backtrace.clone(),
            })))
        })
        .await
    }

    /// Issues `amount` tokens from a closed CAT20 minter. Only the issuer can sign it.
    pub async fn mint_cat20_closed(
        &self,
        token: &TokenInfo,
        minter: CovenantUtxo<Cat20ClosedMinterState>,
        amount: i32,
        receiver: Option<OwnerAddr>,
    ) -> Result<Minted<Cat20ClosedMinterState, Cat20State>> {
        if !matches!(token.minter, CovenantDescriptor::Cat20ClosedMinter(_)) {
            return Err(Error::custom(format!("{} is not a closed CAT20 token", token.token_id)));
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount(amount as i64));
        }
        let state = minter.state.clone();
        if state.remaining_count <= 0 {
            return Err(Error::SupplyExhausted);
        }
        let owner = match receiver {
            Some(owner) => owner,
            None => user_owner_addr(&self.address().await?),
        };
        let remaining_count = state.remaining_count - 1;
        let next_minters =
            if remaining_count > 0 { vec![Cat20ClosedMinterState { token_script: state.token_script.clone(), remaining_count }] } else { vec![] };
        let minted = Cat20State::new(owner, amount);
        let (minter_satoshis, token_satoshis) = (self.settings().minter_satoshis, self.settings().token_satoshis);
        let plan = MintPlan { minter, sign: true, next_minters, asset: minted.clone() };
        self.mint_with(token, plan, move |ctx, backtrace| {
            Ok(CovenantCall::Cat20ClosedMinterMint(Box::new(Cat20ClosedMinterMint {
                state: state.clone(),
                token: minted.clone(),
                issuer_args: ctx.owner_args()?,
                minter_satoshis,
                token_satoshis,
                backtrace: backtrace.clone(),
            })))
        })
        .await
    }

    /// Issues the next local id of a closed collection.
    pub async fn mint_cat721_closed(
        &self,
        token: &TokenInfo,
        minter: CovenantUtxo<Cat721ClosedMinterState>,
        receiver: Option<OwnerAddr>,
    ) -> Result<Minted<Cat721ClosedMinterState, Cat721State>> {
        if !matches!(token.minter, CovenantDescriptor::Cat721ClosedMinter(_)) {
            return Err(Error::custom(format!("{} is not a closed collection", token.token_id)));
        }
        let state = minter.state.clone();
        if state.next_local_id >= state.max_local_id {
            return Err(Error::SupplyExhausted);
        }
        let owner = match receiver {
            Some(owner) => owner,
            None => user_owner_addr(&self.address().await?),
        };
        let next_local_id = state.next_local_id + 1;
        let next_minters =
            if next_local_id < state.max_local_id { vec![Cat721ClosedMinterState { next_local_id, ..state.clone() }] } else { vec![] };
        let nft = Cat721State::new(owner, state.next_local_id);
        let (minter_satoshis, nft_satoshis) = (self.settings().minter_satoshis, self.settings().token_satoshis);
        let plan = MintPlan { minter, sign: true, next_minters, asset: nft.clone() };
        self.mint_with(token, plan, move |ctx, backtrace| {
            Ok(CovenantCall::Cat721ClosedMinterMint(Box::new(Cat721ClosedMinterMint {
                state: state.clone(),
                nft: nft.clone(),
                issuer_args: ctx.owner_args()?,
                minter_satoshis,
                nft_satoshis,
                backtrace: backtrace.clone(),
            })))
        })
        .await
    }

    /// Mints the next leaf of an open collection. `tree` is updated once the
    /// mint is broadcast. Premined local ids require the premine owner's signature.
    pub async fn mint_cat721_open(
        &self,
        token: &TokenInfo,
        minter: CovenantUtxo<Cat721OpenMinterState>,
        tree: &mut CollectionTree,
        receiver: Option<OwnerAddr>,
    ) -> Result<Minted<Cat721OpenMinterState, Cat721State>> {
        let CovenantDescriptor::Cat721OpenMinter(params) = &token.minter else {
            return Err(Error::custom(format!("{} is not an open collection", token.token_id)));
        };
        let state = minter.state.clone();
        if state.next_local_id >= params.max_count {
            return Err(Error::SupplyExhausted);
        }
        if tree.root() != state.merkle_root {
            return Err(Error::custom(format!("collection tree does not match the minter root {}", state.merkle_root)));
        }
        let local_id = state.next_local_id;
        let leaf = tree.leaf(local_id)?.clone();
        let proof = tree.proof(local_id)?;
        let mut updated = tree.clone();
        let merkle_root = updated.mark_mined(local_id)?;

        let is_premine = local_id < params.premine_count;
        let owner = match (is_premine, receiver) {
            (true, _) => params.premine_addr.clone(),
            (false, Some(owner)) => owner,
            (false, None) => user_owner_addr(&self.address().await?),
        };
        let next_local_id = local_id + 1;
        let next_minters = if next_local_id < params.max_count {
            vec![Cat721OpenMinterState { nft_script: state.nft_script.clone(), merkle_root, next_local_id }]
        } else {
            vec![]
        };
        let nft = Cat721State::new(owner, local_id);
        let (minter_satoshis, nft_satoshis) = (self.settings().minter_satoshis, self.settings().token_satoshis);
        let plan = MintPlan { minter, sign: is_premine, next_minters, asset: nft.clone() };
        let minted = self
            .mint_with(token, plan, move |ctx, backtrace| {
                let premine_args = if is_premine { ctx.owner_args()? } else { ContractUnlockArgs::default() };
                Ok(CovenantCall::Cat721OpenMinterMint(Box::new(Cat721OpenMinterMint {
                    state: state.clone(),
                    nft: nft.clone(),
                    leaf: leaf.clone(),
                    proof: proof.clone(),
                    premine_args,
                    minter_satoshis,
                    nft_satoshis,
                    backtrace: backtrace.clone(),
                })))
            })
            .await?;
        *tree = updated;
        Ok(minted)
    }
}

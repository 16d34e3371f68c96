//!
//! Guarded transfers. Moving assets takes two transactions:
//!
//! 1. the guard transaction spends the fee UTXO and creates a guard output
//!    whose state declares the asset inputs of the transfer and what they hold;
//! 2. the transfer transaction spends the assets, the guard and the change of
//!    the guard transaction:
//!
//! `inputs:  [asset.., guard, fee]`
//! `outputs: [state, asset.., change]`
//!
//! The guard re-derives every output of the transfer, so the change output is
//! declared to it as a plain slot. Both transactions are signed before either
//! is broadcast.
//!

use super::state_output;
use crate::backtrace::{CovenantUtxo, resolve_backtrace};
use crate::imports::*;
use crate::tx::{FinalizedTransaction, TransactionDraft, UnlockContext};
use crate::wallet::Wallet;
use cat_covenants::{
    backtrace::{BacktraceInfo, Lineage},
    cat20::{Cat20State, Cat20Unlock},
    cat721::{Cat721State, Cat721Unlock},
    constants::{GUARD_TOKEN_TYPE_MAX, NOT_ASSET_INDEX, STATE_OUTPUT_COUNT_MAX, TX_INPUT_COUNT_MAX},
    descriptor::AssetParams,
    guard::{
        GuardInfo,
        cat20::{Cat20GuardConstState, Cat20GuardUnlock},
        cat721::{Cat721GuardConstState, Cat721GuardUnlock},
    },
    owner::{ContractUnlockArgs, user_owner_addr},
    state::CovenantState,
    table::{ScriptTable, build_script_table, script_index},
};

/// Asset inputs of one transfer: every input but the guard and the fee input.
pub const MAX_ASSET_INPUTS: usize = TX_INPUT_COUNT_MAX - 2;
/// Asset outputs of one transfer: every stateful output but the change.
pub const MAX_ASSET_OUTPUTS: usize = STATE_OUTPUT_COUNT_MAX - 1;

/// An asset output of a transfer: the asset contract script and the state it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOutput<S> {
    pub script: ScriptPublicKey,
    pub state: S,
}

impl<S> AssetOutput<S> {
    pub fn new(script: ScriptPublicKey, state: S) -> Self {
        Self { script, state }
    }
}

#[derive(Debug, Clone)]
pub struct Transfer<S> {
    pub guard_tx: FinalizedTransaction,
    pub tx: FinalizedTransaction,
    /// The asset outputs, in order.
    pub outputs: Vec<CovenantUtxo<S>>,
}

/// Output slots as declared to a guard.
pub struct GuardOutputs {
    pub owner_addr_or_scripts: [Vec<u8>; STATE_OUTPUT_COUNT_MAX],
    /// Token amount or nft local id, zero for a plain slot.
    pub values: [i32; STATE_OUTPUT_COUNT_MAX],
    pub type_indexes: [i8; STATE_OUTPUT_COUNT_MAX],
    pub satoshis: [u64; STATE_OUTPUT_COUNT_MAX],
    pub count: u8,
}

impl GuardOutputs {
    /// Declares every output of `tx` after the state output. The first ones are
    /// `assets`, given with their table index, the rest are plain.
    fn from_tx<S: GuardedAsset>(tx: &Transaction, assets: &[(i8, S)]) -> Result<Self> {
        let declared = tx.outputs.len().saturating_sub(1);
        if declared > STATE_OUTPUT_COUNT_MAX {
            return Err(Error::TooManyOutputs(declared, STATE_OUTPUT_COUNT_MAX));
        }
        let mut slots = Self {
            owner_addr_or_scripts: Default::default(),
            values: [0; STATE_OUTPUT_COUNT_MAX],
            type_indexes: [NOT_ASSET_INDEX; STATE_OUTPUT_COUNT_MAX],
            satoshis: [0; STATE_OUTPUT_COUNT_MAX],
            count: declared as u8,
        };
        for (slot, output) in tx.outputs.iter().skip(1).enumerate() {
            match assets.get(slot) {
                Some((index, state)) => {
                    slots.owner_addr_or_scripts[slot] = state.owner_addr().to_vec();
                    slots.values[slot] = state.slot_value();
                    slots.type_indexes[slot] = *index;
                }
                None => slots.owner_addr_or_scripts[slot] = output.script_public_key.script().to_vec(),
            }
            slots.satoshis[slot] = output.value;
        }
        Ok(slots)
    }
}

/// An asset kind moved under the watch of a guard.
pub trait GuardedAsset: CovenantState + Clone + Send + Sync + 'static {
    type GuardState: CovenantState + Clone + Send + Sync + 'static;

    fn guard_descriptor() -> CovenantDescriptor;

    /// Scripts the asset contract locked with `descriptor` is bound to.
    fn asset_params(descriptor: &CovenantDescriptor) -> Option<&AssetParams>;

    fn owner_addr(&self) -> &[u8];

    /// Amount of a token, local id of an nft.
    fn slot_value(&self) -> i32;

    fn asset_call(
        state: Self,
        args: ContractUnlockArgs,
        guard: GuardInfo<Self::GuardState>,
        backtrace: BacktraceInfo,
    ) -> CovenantCall;

    fn guard_call(
        state: Self::GuardState,
        prev_tx: Vec<u8>,
        outputs: GuardOutputs,
        input_states: [Option<Self>; TX_INPUT_COUNT_MAX],
    ) -> CovenantCall;
}

impl GuardedAsset for Cat20State {
    type GuardState = Cat20GuardConstState;

    fn guard_descriptor() -> CovenantDescriptor {
        CovenantDescriptor::Cat20Guard
    }

    fn asset_params(descriptor: &CovenantDescriptor) -> Option<&AssetParams> {
        match descriptor {
            CovenantDescriptor::Cat20(params) => Some(params),
            _ => None,
        }
    }

    fn owner_addr(&self) -> &[u8] {
        &self.owner_addr
    }

    fn slot_value(&self) -> i32 {
        self.amount
    }

    fn asset_call(state: Self, args: ContractUnlockArgs, guard: GuardInfo<Cat20GuardConstState>, backtrace: BacktraceInfo) -> CovenantCall {
        CovenantCall::Cat20Unlock(Box::new(Cat20Unlock { state, args, guard, backtrace }))
    }

    fn guard_call(
        state: Cat20GuardConstState,
        prev_tx: Vec<u8>,
        outputs: GuardOutputs,
        input_states: [Option<Self>; TX_INPUT_COUNT_MAX],
    ) -> CovenantCall {
        CovenantCall::Cat20GuardUnlock(Box::new(Cat20GuardUnlock {
            state,
            prev_tx,
            owner_addr_or_scripts: outputs.owner_addr_or_scripts,
            output_tokens: outputs.values,
            output_type_indexes: outputs.type_indexes,
            output_satoshis: outputs.satoshis,
            input_states,
            output_count: outputs.count,
        }))
    }
}

impl GuardedAsset for Cat721State {
    type GuardState = Cat721GuardConstState;

    fn guard_descriptor() -> CovenantDescriptor {
        CovenantDescriptor::Cat721Guard
    }

    fn asset_params(descriptor: &CovenantDescriptor) -> Option<&AssetParams> {
        match descriptor {
            CovenantDescriptor::Cat721(params) => Some(params),
            _ => None,
        }
    }

    fn owner_addr(&self) -> &[u8] {
        &self.owner_addr
    }

    fn slot_value(&self) -> i32 {
        self.local_id
    }

    fn asset_call(state: Self, args: ContractUnlockArgs, guard: GuardInfo<Cat721GuardConstState>, backtrace: BacktraceInfo) -> CovenantCall {
        CovenantCall::Cat721Unlock(Box::new(Cat721Unlock { state, args, guard, backtrace }))
    }

    fn guard_call(
        state: Cat721GuardConstState,
        prev_tx: Vec<u8>,
        outputs: GuardOutputs,
        input_states: [Option<Self>; TX_INPUT_COUNT_MAX],
    ) -> CovenantCall {
        CovenantCall::Cat721GuardUnlock(Box::new(Cat721GuardUnlock {
            state,
            prev_tx,
            owner_addr_or_scripts: outputs.owner_addr_or_scripts,
            output_local_ids: outputs.values,
            output_type_indexes: outputs.type_indexes,
            output_satoshis: outputs.satoshis,
            input_states,
            output_count: outputs.count,
        }))
    }
}

/// Distinct scripts of `inputs` in order of appearance.
fn input_table<S>(inputs: &[CovenantUtxo<S>]) -> Result<ScriptTable> {
    let mut scripts: Vec<ScriptPublicKey> = vec![];
    for input in inputs {
        if !scripts.contains(&input.utxo.script) {
            scripts.push(input.utxo.script.clone());
        }
    }
    if scripts.len() > GUARD_TOKEN_TYPE_MAX {
        return Err(Error::custom(format!("a transfer moves at most {GUARD_TOKEN_TYPE_MAX} asset types, got {}", scripts.len())));
    }
    Ok(build_script_table(&scripts)?)
}

fn table_index(table: &ScriptTable, script: &ScriptPublicKey) -> Result<i8> {
    script_index(table, script).map(|index| index as i8).ok_or_else(|| Error::custom(format!("output script {script} is not among the inputs")))
}

fn check_shape<S>(inputs: &[CovenantUtxo<S>], outputs: &[AssetOutput<S>]) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::custom("a transfer needs at least one asset input"));
    }
    if inputs.len() > MAX_ASSET_INPUTS {
        return Err(Error::TooManyInputs(inputs.len(), MAX_ASSET_INPUTS));
    }
    if outputs.len() > MAX_ASSET_OUTPUTS {
        return Err(Error::TooManyOutputs(outputs.len(), MAX_ASSET_OUTPUTS));
    }
    Ok(())
}

/// Per input slot: the table index and state hash of the asset inputs.
fn input_slots<S: CovenantState>(
    table: &ScriptTable,
    inputs: &[CovenantUtxo<S>],
) -> Result<([i8; TX_INPUT_COUNT_MAX], [Option<cat_hashes::Hash160>; TX_INPUT_COUNT_MAX])> {
    let mut indexes = [NOT_ASSET_INDEX; TX_INPUT_COUNT_MAX];
    let mut hashes = [None; TX_INPUT_COUNT_MAX];
    for (slot, input) in inputs.iter().enumerate() {
        indexes[slot] = table_index(table, &input.utxo.script)?;
        hashes[slot] = Some(input.state.state_hash());
    }
    Ok((indexes, hashes))
}

impl Wallet {
    /// Builds, signs and broadcasts the guard and transfer transactions moving
    /// `inputs` into `outputs`. Every input must be owned by the signer.
    pub(crate) async fn guarded_transfer<S: GuardedAsset>(
        &self,
        inputs: Vec<CovenantUtxo<S>>,
        guard_state: S::GuardState,
        outputs: Vec<(i8, AssetOutput<S>)>,
    ) -> Result<Transfer<S>> {
        let address = self.address().await?;
        let signer_owner = user_owner_addr(&address);
        let mut descriptors = Vec::with_capacity(inputs.len());
        for input in inputs.iter() {
            if input.state.owner_addr() != signer_owner.as_slice() {
                return Err(Error::custom(format!("{} is not owned by the signer", input.utxo.outpoint())));
            }
            descriptors.push(self.descriptor(&input.utxo.script)?);
        }
        let minter_scripts = descriptors
            .iter()
            .map(|descriptor| {
                S::asset_params(descriptor)
                    .map(|params| params.minter_script.clone())
                    .ok_or_else(|| Error::custom(format!("{} is not an asset of this kind", descriptor.kind())))
            })
            .collect::<Result<Vec<_>>>()?;
        let cache = self.tx_cache();
        let backtraces =
            try_join_all(inputs.iter().zip(minter_scripts.iter()).map(|(input, minter)| resolve_backtrace(&cache, input, Lineage::Ancestor(minter))))
                .await?;

        let settings = self.settings();
        let guard_descriptor = S::guard_descriptor();
        let guard_script = guard_descriptor.locking_script()?;

        // guard transaction
        let mut guard_draft = TransactionDraft::new();
        guard_draft
            .add_key_spend(self.fee_utxo().await?)
            .add_output(state_output(&[Some(guard_state.state_hash())])?)
            .add_output(TransactionOutput::new(settings.guard_satoshis, guard_script))
            .set_change(address.clone());
        let guard_tx = self.finalize(&mut guard_draft).await?;
        let guard_utxo = CovenantUtxo::from_tx(&guard_tx.tx, 1, guard_state.clone())?;
        let fee_utxo = guard_tx.change_utxo().ok_or(Error::NoFeeUtxo)?;
        let guard_prev_tx = guard_tx.tx.serialize();

        // transfer transaction
        let guard_index = inputs.len();
        let mut input_states: [Option<S>; TX_INPUT_COUNT_MAX] = Default::default();
        for (slot, input) in inputs.iter().enumerate() {
            input_states[slot] = Some(input.state.clone());
        }
        let mut hashes = vec![];
        let mut draft = TransactionDraft::new();
        for ((input, descriptor), backtrace) in inputs.iter().zip(descriptors).zip(backtraces) {
            let state = input.state.clone();
            let guard = GuardInfo { input_index: guard_index as u8, prev_tx: guard_prev_tx.clone(), state: guard_state.clone() };
            let call = move |ctx: &UnlockContext<'_>| Ok(S::asset_call(state.clone(), ctx.owner_args()?, guard.clone(), backtrace.clone()));
            draft.add_covenant(input.utxo.clone(), descriptor, true, Box::new(call));
        }
        let assets = outputs.iter().map(|(index, output)| (*index, output.state.clone())).collect::<Vec<_>>();
        let guard_call = move |ctx: &UnlockContext<'_>| {
            let slots = GuardOutputs::from_tx(ctx.tx, &assets)?;
            Ok(S::guard_call(guard_state.clone(), guard_prev_tx.clone(), slots, input_states.clone()))
        };
        draft.add_covenant(guard_utxo.utxo, guard_descriptor, false, Box::new(guard_call)).add_key_spend(fee_utxo);
        for (_, output) in outputs.iter() {
            hashes.push(Some(output.state.state_hash()));
        }
        draft.add_output(state_output(&hashes)?);
        for (_, output) in outputs.iter() {
            draft.add_output(TransactionOutput::new(settings.token_satoshis, output.script.clone()));
        }
        draft.set_change(address);
        let tx = self.finalize(&mut draft).await?;

        self.broadcast_all(&[&guard_tx, &tx]).await?;
        let outputs = outputs
            .into_iter()
            .enumerate()
            .map(|(index, (_, output))| CovenantUtxo::from_tx(&tx.tx, index as u32 + 1, output.state))
            .collect::<Result<Vec<_>>>()?;
        debug!("transfer {} guarded by {}", tx.id(), guard_tx.id());
        Ok(Transfer { guard_tx, tx, outputs })
    }

    /// Moves CAT20 tokens. Whatever the inputs hold beyond the outputs, per token
    /// type, is burned.
    pub async fn transfer_cat20(
        &self,
        inputs: Vec<CovenantUtxo<Cat20State>>,
        outputs: Vec<AssetOutput<Cat20State>>,
    ) -> Result<Transfer<Cat20State>> {
        check_shape(&inputs, &outputs)?;
        let table = input_table(&inputs)?;
        let (token_script_indexes, input_state_hashes) = input_slots(&table, &inputs)?;

        let mut token_amounts = [0i32; GUARD_TOKEN_TYPE_MAX];
        for (slot, input) in inputs.iter().enumerate() {
            let position = token_script_indexes[slot] as usize;
            token_amounts[position] =
                token_amounts[position].checked_add(input.state.amount).ok_or(cat_covenants::CovenantError::AmountOverflow)?;
        }
        let mut output_amounts = [0i32; GUARD_TOKEN_TYPE_MAX];
        let mut indexed = Vec::with_capacity(outputs.len());
        for output in outputs {
            output.state.validate()?;
            let index = table_index(&table, &output.script)?;
            let position = index as usize;
            output_amounts[position] =
                output_amounts[position].checked_add(output.state.amount).ok_or(cat_covenants::CovenantError::AmountOverflow)?;
            indexed.push((index, output));
        }
        let mut token_burn_amounts = [0i32; GUARD_TOKEN_TYPE_MAX];
        for position in 0..GUARD_TOKEN_TYPE_MAX {
            let burn = token_amounts[position] - output_amounts[position];
            if burn < 0 {
                return Err(Error::InsufficientTokens { required: output_amounts[position] as i64, available: token_amounts[position] as i64 });
            }
            token_burn_amounts[position] = burn;
        }

        let guard_state = Cat20GuardConstState { token_scripts: table, token_amounts, token_burn_amounts, input_state_hashes, token_script_indexes };
        self.guarded_transfer(inputs, guard_state, indexed).await
    }

    /// Moves CAT721 nfts. Each output carries the nft of a distinct input with
    /// the same collection and local id, inputs left unmatched are burned.
    pub async fn transfer_cat721(
        &self,
        inputs: Vec<CovenantUtxo<Cat721State>>,
        outputs: Vec<AssetOutput<Cat721State>>,
    ) -> Result<Transfer<Cat721State>> {
        check_shape(&inputs, &outputs)?;
        let table = input_table(&inputs)?;
        let (nft_script_indexes, input_state_hashes) = input_slots(&table, &inputs)?;

        let mut nft_burn_masks = [false; TX_INPUT_COUNT_MAX];
        for mask in nft_burn_masks.iter_mut().take(inputs.len()) {
            *mask = true;
        }
        let mut indexed = Vec::with_capacity(outputs.len());
        for output in outputs {
            output.state.validate()?;
            let index = table_index(&table, &output.script)?;
            let matching = inputs.iter().enumerate().position(|(slot, input)| {
                nft_burn_masks[slot] && input.utxo.script == output.script && input.state.local_id == output.state.local_id
            });
            let Some(slot) = matching else {
                return Err(Error::custom(format!("nft {} of {} is not among the inputs", output.state.local_id, output.script)));
            };
            nft_burn_masks[slot] = false;
            indexed.push((index, output));
        }

        let guard_state = Cat721GuardConstState { nft_scripts: table, nft_burn_masks, input_state_hashes, nft_script_indexes };
        self.guarded_transfer(inputs, guard_state, indexed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cat_hashes::Hash;

    fn script(byte: u8) -> ScriptPublicKey {
        ScriptPublicKey::from_vec(vec![0x51, 0x20].into_iter().chain([byte; 32]).collect())
    }

    fn token(script_byte: u8, amount: i32) -> CovenantUtxo<Cat20State> {
        let owner = vec![0x00, 0x14].into_iter().chain([9u8; 20]).collect();
        CovenantUtxo::new(Utxo::new(Hash::from_bytes([amount as u8; 32]), 1, script(script_byte), 330), Cat20State::new(owner, amount))
    }

    #[test]
    fn test_input_table_and_slots() {
        let inputs = vec![token(1, 10), token(2, 20), token(1, 30)];
        let table = input_table(&inputs).unwrap();
        assert_eq!(table[0], script(1));
        assert_eq!(table[1], script(2));
        let (indexes, hashes) = input_slots(&table, &inputs).unwrap();
        assert_eq!(indexes, [0, 1, 0, NOT_ASSET_INDEX, NOT_ASSET_INDEX, NOT_ASSET_INDEX]);
        assert_eq!(hashes[2], Some(inputs[2].state.state_hash()));
        assert_eq!(hashes[3], None);
        assert!(table_index(&table, &script(3)).is_err());
    }

    #[test]
    fn test_guard_outputs_declare_plain_change() {
        let owner: Vec<u8> = vec![0x00, 0x14].into_iter().chain([9u8; 20]).collect();
        let change = ScriptPublicKey::from_vec(owner.clone());
        let outputs = vec![
            TransactionOutput::new(0, ScriptPublicKey::from_vec(vec![0x6a])),
            TransactionOutput::new(330, script(1)),
            TransactionOutput::new(5_000, change),
        ];
        let tx = Transaction::new(Transaction::DEFAULT_VERSION, vec![], outputs, 0);
        let slots = GuardOutputs::from_tx(&tx, &[(0, Cat20State::new(owner.clone(), 70))]).unwrap();
        assert_eq!(slots.count, 2);
        assert_eq!(slots.values, [70, 0, 0, 0, 0]);
        assert_eq!(slots.type_indexes, [0, NOT_ASSET_INDEX, NOT_ASSET_INDEX, NOT_ASSET_INDEX, NOT_ASSET_INDEX]);
        assert_eq!(slots.satoshis, [330, 5_000, 0, 0, 0]);
        // the change slot carries its raw script
        assert_eq!(slots.owner_addr_or_scripts[1], owner);
        assert!(slots.owner_addr_or_scripts[2].is_empty());
    }

    #[test]
    fn test_shape_limits() {
        let inputs = (1..=5).map(|amount| token(1, amount)).collect::<Vec<_>>();
        assert!(matches!(check_shape(&inputs, &[]), Err(Error::TooManyInputs(5, MAX_ASSET_INPUTS))));
        assert!(check_shape::<Cat20State>(&[], &[]).is_err());
        let outputs = (1..=5).map(|amount| AssetOutput::new(script(1), token(1, amount).state)).collect::<Vec<_>>();
        assert!(matches!(check_shape(&inputs[..1], &outputs), Err(Error::TooManyOutputs(5, MAX_ASSET_OUTPUTS))));
    }
}

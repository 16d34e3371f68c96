//!
//! Transaction fixtures: funding, minter deploys and mints, and guarded
//! transfers built by hand so that individual fields can be tampered with
//! before the witnesses are sealed.
//!

mod cat721;
mod minter;

use crate::{
    backtrace::BacktraceInfo,
    cat20::{Cat20State, Cat20Unlock},
    cat721::{Cat721State, Cat721Unlock},
    constants::{NOT_ASSET_INDEX, STATE_OUTPUT_COUNT_MAX, TX_INPUT_COUNT_MAX},
    descriptor::{CovenantCall, CovenantDescriptor},
    engine::{TransactionValidator, verify_input},
    guard::{
        GuardInfo,
        cat20::{Cat20GuardConstState, Cat20GuardUnlock},
        cat721::{Cat721GuardConstState, Cat721GuardUnlock},
    },
    minter::{
        cat20_closed::{Cat20ClosedMinterMint, Cat20ClosedMinterParams, Cat20ClosedMinterState},
        cat721_closed::{Cat721ClosedMinterMint, Cat721ClosedMinterParams, Cat721ClosedMinterState},
    },
    owner::{ContractUnlockArgs, OwnerAddr, user_owner_addr},
    result::CovenantResult,
    state::{CovenantState, TxStateOutput},
    table::{build_script_table, script_index},
};
use cat_consensus_core::{
    hashing::{
        sighash::{SigHashReusedValues, calc_signature_hash},
        sighash_type::SIG_HASH_ALL,
    },
    script::{pay_to_taproot_key, pay_to_witness_pubkey},
    sign::{sign_message, sign_with_multiple},
    tx::{
        PopulatedTransaction, ScriptPublicKey, SignableTransaction, Transaction, TransactionInput, TransactionOutpoint,
        TransactionOutput, UtxoEntry,
    },
};
use cat_hashes::ZERO_HASH;
use secp256k1::{Keypair, SECP256K1, SecretKey};

pub(crate) const FUND_SATOSHIS: u64 = 1_000_000;
pub(crate) const COVENANT_SATOSHIS: u64 = 10_000;
pub(crate) const ASSET_SATOSHIS: u64 = 330;

pub(crate) fn keypair(seed: u8) -> Keypair {
    Keypair::from_secret_key(SECP256K1, &SecretKey::from_slice(&[seed; 32]).unwrap())
}

pub(crate) fn p2tr(key: &Keypair) -> ScriptPublicKey {
    pay_to_taproot_key(&key.public_key().x_only_public_key().0)
}

pub(crate) fn p2wpkh(key: &Keypair) -> ScriptPublicKey {
    pay_to_witness_pubkey(&key.public_key())
}

/// Signature of `key` over input `index`, as an owner unlock argument.
pub(crate) fn user_args(tx: &Transaction, entries: &[UtxoEntry], index: usize, key: &Keypair, owner: &ScriptPublicKey) -> ContractUnlockArgs {
    let populated = PopulatedTransaction::new(tx, entries);
    let sig_hash = calc_signature_hash(&populated, index, SIG_HASH_ALL, &mut SigHashReusedValues::new()).unwrap();
    let signature = sign_message(sig_hash, key, owner, SIG_HASH_ALL).unwrap();
    ContractUnlockArgs::user(key.public_key().serialize().to_vec(), signature.to_vec())
}

/// A covenant output together with what is needed to trace it back one hop.
#[derive(Clone, Debug)]
pub(crate) struct Utxo<S> {
    pub outpoint: TransactionOutpoint,
    pub output: TransactionOutput,
    pub descriptor: CovenantDescriptor,
    pub state: S,
    /// Transaction that created the output.
    pub tx: Transaction,
    /// Input of `tx` the backtrace follows, and the transaction that input spent.
    pub trace_input: u32,
    pub trace_tx: Transaction,
}

impl<S> Utxo<S> {
    pub fn entry(&self) -> UtxoEntry {
        UtxoEntry::from(&self.output)
    }

    pub fn input(&self) -> TransactionInput {
        TransactionInput::new(self.outpoint, vec![], 0)
    }

    pub fn backtrace(&self) -> BacktraceInfo {
        BacktraceInfo { prev_tx: self.tx.serialize(), prev_prev_tx: self.trace_tx.serialize(), prev_tx_input_index: self.trace_input }
    }
}

/// Key-spend funding outputs of a single transaction.
pub(crate) struct Funder {
    pub key: Keypair,
    pub tx: Transaction,
    next: u32,
}

impl Funder {
    pub fn new(seed: u8) -> Self {
        let key = keypair(seed);
        let input = TransactionInput::new(TransactionOutpoint::new(ZERO_HASH, seed as u32), vec![], 0);
        let outputs = (0..32).map(|_| TransactionOutput::new(FUND_SATOSHIS, p2wpkh(&key))).collect();
        Self { key, tx: Transaction::new(Transaction::DEFAULT_VERSION, vec![input], outputs, 0), next: 0 }
    }

    /// Outpoint the next `take` will return.
    pub fn next_outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.tx.id(), self.next)
    }

    pub fn take(&mut self) -> (TransactionInput, UtxoEntry) {
        let index = self.next;
        self.next += 1;
        let outpoint = TransactionOutpoint::new(self.tx.id(), index);
        (TransactionInput::new(outpoint, vec![], 0), UtxoEntry::from(&self.tx.outputs[index as usize]))
    }

    /// Signs the key-spend inputs `indexes` of `tx`.
    pub fn sign(&self, tx: Transaction, entries: &[UtxoEntry], indexes: &[usize]) -> Transaction {
        let signable = SignableTransaction::with_entries(tx, entries.to_vec());
        let inputs = indexes.iter().map(|index| (*index, SIG_HASH_ALL));
        sign_with_multiple(signable, &[self.key], inputs).unwrap().fully_signed().unwrap().tx
    }
}

fn state_output(hashes: &[Option<cat_hashes::Hash160>]) -> TransactionOutput {
    let mut state = TxStateOutput::default();
    for (position, hash) in hashes.iter().enumerate() {
        state.set(position + 1, *hash).unwrap();
    }
    state.to_output()
}

/// Deploys a covenant from a funding output: `[state, covenant, change]`.
pub(crate) fn deploy<S: CovenantState + Clone>(funder: &mut Funder, descriptor: CovenantDescriptor, state: S) -> Utxo<S> {
    let (input, entry) = funder.take();
    let script = descriptor.locking_script().unwrap();
    let output = TransactionOutput::new(COVENANT_SATOSHIS, script);
    let change = TransactionOutput::new(FUND_SATOSHIS - COVENANT_SATOSHIS - 1_000, p2wpkh(&funder.key));
    let tx = Transaction::new(Transaction::DEFAULT_VERSION, vec![input], vec![state_output(&[Some(state.state_hash())]), output.clone(), change], 0);
    let entries = [entry];
    let tx = funder.sign(tx, &entries, &[0]);
    TransactionValidator::default().verify(&tx, &entries).unwrap();
    Utxo { outpoint: TransactionOutpoint::new(tx.id(), 1), output, descriptor, state, tx, trace_input: 0, trace_tx: funder.tx.clone() }
}

/// A closed-minter CAT20 token, issued by key `seed`.
pub(crate) struct Cat20Token {
    pub funder: Funder,
    pub issuer: Keypair,
    pub minter: Utxo<Cat20ClosedMinterState>,
    pub token_descriptor: CovenantDescriptor,
    pub token_script: ScriptPublicKey,
}

impl Cat20Token {
    pub fn deploy(seed: u8) -> Self {
        let mut funder = Funder::new(seed);
        let issuer = keypair(seed.wrapping_add(100));
        let genesis = funder.next_outpoint();
        let params = Cat20ClosedMinterParams { genesis_outpoint: genesis, issuer_addr: user_owner_addr(&p2tr(&issuer)), max_count: 100 };
        let descriptor = CovenantDescriptor::Cat20ClosedMinter(params.clone());
        let minter_script = descriptor.locking_script().unwrap();
        let token_descriptor = CovenantDescriptor::cat20(minter_script).unwrap();
        let token_script = token_descriptor.locking_script().unwrap();
        let minter = deploy(&mut funder, descriptor, Cat20ClosedMinterState::initial(&params, token_script.clone()));
        Self { funder, issuer, minter, token_descriptor, token_script }
    }

    /// Mints `amount` to `owner`, keeping the next minter.
    pub fn mint(&mut self, owner: &ScriptPublicKey, amount: i32) -> Utxo<Cat20State> {
        let (tx, entries) = self.build_mint(owner, amount, |_| {});
        TransactionValidator::default().verify(&tx, &entries).unwrap();
        let next_state = Cat20ClosedMinterState { remaining_count: self.minter.state.remaining_count - 1, ..self.minter.state.clone() };
        let token = Utxo {
            outpoint: TransactionOutpoint::new(tx.id(), 2),
            output: tx.outputs[2].clone(),
            descriptor: self.token_descriptor.clone(),
            state: Cat20State::new(user_owner_addr(owner), amount),
            tx: tx.clone(),
            trace_input: 0,
            trace_tx: self.minter.tx.clone(),
        };
        self.minter = Utxo {
            outpoint: TransactionOutpoint::new(tx.id(), 1),
            output: tx.outputs[1].clone(),
            state: next_state,
            trace_tx: self.minter.tx.clone(),
            tx,
            ..self.minter.clone()
        };
        token
    }

    pub fn build_mint(
        &mut self,
        owner: &ScriptPublicKey,
        amount: i32,
        tamper: impl FnOnce(&mut Cat20ClosedMinterMint),
    ) -> (Transaction, Vec<UtxoEntry>) {
        let minter = &self.minter;
        let next = Cat20ClosedMinterState { remaining_count: minter.state.remaining_count - 1, ..minter.state.clone() };
        let token = Cat20State::new(user_owner_addr(owner), amount);
        let (fee_input, fee_entry) = self.funder.take();
        let outputs = vec![
            state_output(&[Some(next.state_hash()), Some(token.state_hash())]),
            TransactionOutput::new(COVENANT_SATOSHIS, minter.output.script_public_key.clone()),
            TransactionOutput::new(ASSET_SATOSHIS, self.token_script.clone()),
        ];
        let tx = Transaction::new(Transaction::DEFAULT_VERSION, vec![minter.input(), fee_input], outputs, 0);
        let entries = vec![minter.entry(), fee_entry];
        let issuer_args = user_args(&tx, &entries, 0, &self.issuer, &p2tr(&self.issuer));
        let mut call = Cat20ClosedMinterMint {
            state: minter.state.clone(),
            token,
            issuer_args,
            minter_satoshis: COVENANT_SATOSHIS,
            token_satoshis: ASSET_SATOSHIS,
            backtrace: minter.backtrace(),
        };
        tamper(&mut call);
        let mut tx = self.funder.sign(tx, &entries, &[1]);
        tx.inputs[0].witness = CovenantCall::Cat20ClosedMinterMint(Box::new(call)).to_witness(&minter.descriptor).unwrap();
        (tx, entries)
    }
}

/// A closed-minter CAT721 collection, issued by key `seed`.
pub(crate) struct Cat721Collection {
    pub funder: Funder,
    pub issuer: Keypair,
    pub minter: Utxo<Cat721ClosedMinterState>,
    pub nft_descriptor: CovenantDescriptor,
    pub nft_script: ScriptPublicKey,
}

impl Cat721Collection {
    pub fn deploy(seed: u8, max_local_id: i32) -> Self {
        let mut funder = Funder::new(seed);
        let issuer = keypair(seed.wrapping_add(100));
        let genesis = funder.next_outpoint();
        let params = Cat721ClosedMinterParams { genesis_outpoint: genesis, issuer_addr: user_owner_addr(&p2wpkh(&issuer)), max_local_id };
        let descriptor = CovenantDescriptor::Cat721ClosedMinter(params.clone());
        let nft_descriptor = CovenantDescriptor::cat721(descriptor.locking_script().unwrap()).unwrap();
        let nft_script = nft_descriptor.locking_script().unwrap();
        let minter = deploy(&mut funder, descriptor, Cat721ClosedMinterState::initial(&params, nft_script.clone()));
        Self { funder, issuer, minter, nft_descriptor, nft_script }
    }

    /// Mints the next local id to `owner`. The last mint leaves no next minter.
    pub fn mint(&mut self, owner: &ScriptPublicKey) -> Utxo<Cat721State> {
        let minter = self.minter.clone();
        let local_id = minter.state.next_local_id;
        let next = Cat721ClosedMinterState { next_local_id: local_id + 1, ..minter.state.clone() };
        let has_next = next.next_local_id < next.max_local_id;
        let nft = Cat721State::new(user_owner_addr(owner), local_id);

        let (fee_input, fee_entry) = self.funder.take();
        let mut hashes = vec![];
        let mut outputs = vec![];
        if has_next {
            hashes.push(Some(next.state_hash()));
            outputs.push(TransactionOutput::new(COVENANT_SATOSHIS, minter.output.script_public_key.clone()));
        }
        hashes.push(Some(nft.state_hash()));
        outputs.push(TransactionOutput::new(ASSET_SATOSHIS, self.nft_script.clone()));
        outputs.insert(0, state_output(&hashes));
        let nft_index = outputs.len() as u32 - 1;

        let tx = Transaction::new(Transaction::DEFAULT_VERSION, vec![minter.input(), fee_input], outputs, 0);
        let entries = vec![minter.entry(), fee_entry];
        let issuer_args = user_args(&tx, &entries, 0, &self.issuer, &p2wpkh(&self.issuer));
        let call = Cat721ClosedMinterMint {
            state: minter.state.clone(),
            nft: nft.clone(),
            issuer_args,
            minter_satoshis: COVENANT_SATOSHIS,
            nft_satoshis: ASSET_SATOSHIS,
            backtrace: minter.backtrace(),
        };
        let mut tx = self.funder.sign(tx, &entries, &[1]);
        tx.inputs[0].witness = CovenantCall::Cat721ClosedMinterMint(Box::new(call)).to_witness(&minter.descriptor).unwrap();
        TransactionValidator::default().verify(&tx, &entries).unwrap();

        if has_next {
            self.minter = Utxo {
                outpoint: TransactionOutpoint::new(tx.id(), 1),
                output: tx.outputs[1].clone(),
                state: next,
                trace_tx: minter.tx.clone(),
                tx: tx.clone(),
                ..minter.clone()
            };
        }
        Utxo {
            outpoint: TransactionOutpoint::new(tx.id(), nft_index),
            output: tx.outputs[nft_index as usize].clone(),
            descriptor: self.nft_descriptor.clone(),
            state: nft,
            tx,
            trace_input: 0,
            trace_tx: minter.tx,
        }
    }
}

/// An asset input of a guarded transfer and the key of its owner.
pub(crate) struct Owned<'a, S> {
    pub utxo: &'a Utxo<S>,
    pub owner: &'a Keypair,
}

/// A planned output of a guarded transfer.
#[derive(Clone, Debug)]
pub(crate) enum Planned<S> {
    Asset { script: ScriptPublicKey, state: S },
    Plain(TransactionOutput),
}

/// A guarded transfer before its witnesses are sealed. Every field can be altered.
pub(crate) struct Transfer<G, C> {
    pub guard: Utxo<G>,
    pub guard_call: C,
    pub asset_calls: Vec<CovenantCall>,
    pub descriptors: Vec<CovenantDescriptor>,
    pub tx: Transaction,
    pub entries: Vec<UtxoEntry>,
}

impl<G, C> Transfer<G, C> {
    pub fn guard_index(&self) -> usize {
        self.asset_calls.len()
    }

    /// Executes input `index` on its own.
    pub fn verify_input(&self, tx: &Transaction, index: usize) -> CovenantResult<()> {
        verify_input(&PopulatedTransaction::new(tx, &self.entries), index, &mut SigHashReusedValues::new())
    }
}

fn asset_outputs<S: CovenantState>(planned: &[Planned<S>]) -> Vec<TransactionOutput> {
    let hashes = planned
        .iter()
        .map(|planned| match planned {
            Planned::Asset { state, .. } => Some(state.state_hash()),
            Planned::Plain(_) => None,
        })
        .collect::<Vec<_>>();
    let outputs = planned.iter().map(|planned| match planned {
        Planned::Asset { script, .. } => TransactionOutput::new(ASSET_SATOSHIS, script.clone()),
        Planned::Plain(output) => output.clone(),
    });
    std::iter::once(state_output(&hashes)).chain(outputs).collect()
}

fn guard_output_fields<S, F: Fn(&S) -> (OwnerAddr, i32)>(
    planned: &[Planned<S>],
    table: &[ScriptPublicKey; 4],
    fields: F,
) -> ([Vec<u8>; STATE_OUTPUT_COUNT_MAX], [i32; STATE_OUTPUT_COUNT_MAX], [i8; STATE_OUTPUT_COUNT_MAX], [u64; STATE_OUTPUT_COUNT_MAX]) {
    let mut owners: [Vec<u8>; STATE_OUTPUT_COUNT_MAX] = Default::default();
    let mut values = [0i32; STATE_OUTPUT_COUNT_MAX];
    let mut indexes = [NOT_ASSET_INDEX; STATE_OUTPUT_COUNT_MAX];
    let mut satoshis = [0u64; STATE_OUTPUT_COUNT_MAX];
    for (slot, planned) in planned.iter().enumerate() {
        match planned {
            Planned::Asset { script, state } => {
                let (owner, value) = fields(state);
                owners[slot] = owner;
                values[slot] = value;
                indexes[slot] = script_index(table, script).unwrap() as i8;
                satoshis[slot] = ASSET_SATOSHIS;
            }
            Planned::Plain(output) => {
                owners[slot] = output.script_public_key.script().to_vec();
                satoshis[slot] = output.value;
            }
        }
    }
    (owners, values, indexes, satoshis)
}

/// Builds a guarded CAT20 transfer spending `inputs` then the guard, paying `outputs`.
/// Burn amounts default to what the outputs leave over.
pub(crate) fn cat20_transfer(
    funder: &mut Funder,
    inputs: &[Owned<Cat20State>],
    outputs: &[Planned<Cat20State>],
) -> Transfer<Cat20GuardConstState, Cat20GuardUnlock> {
    cat20_transfer_with(funder, inputs, outputs, |_| {})
}

/// Same as [`cat20_transfer`], with the guard state altered before the guard is created.
pub(crate) fn cat20_transfer_with(
    funder: &mut Funder,
    inputs: &[Owned<Cat20State>],
    outputs: &[Planned<Cat20State>],
    tamper: impl FnOnce(&mut Cat20GuardConstState),
) -> Transfer<Cat20GuardConstState, Cat20GuardUnlock> {
    let mut scripts: Vec<ScriptPublicKey> = vec![];
    for input in inputs {
        if !scripts.contains(&input.utxo.output.script_public_key) {
            scripts.push(input.utxo.output.script_public_key.clone());
        }
    }
    let table = build_script_table(&scripts).unwrap();
    let mut token_amounts = [0i32; 4];
    let mut input_state_hashes = [None; TX_INPUT_COUNT_MAX];
    let mut token_script_indexes = [NOT_ASSET_INDEX; TX_INPUT_COUNT_MAX];
    let mut input_states: [Option<Cat20State>; TX_INPUT_COUNT_MAX] = Default::default();
    for (slot, input) in inputs.iter().enumerate() {
        let position = script_index(&table, &input.utxo.output.script_public_key).unwrap();
        token_amounts[position] = token_amounts[position].saturating_add(input.utxo.state.amount);
        input_state_hashes[slot] = Some(input.utxo.state.state_hash());
        token_script_indexes[slot] = position as i8;
        input_states[slot] = Some(input.utxo.state.clone());
    }
    let mut token_burn_amounts = token_amounts;
    for planned in outputs {
        if let Planned::Asset { script, state } = planned {
            let position = script_index(&table, script).unwrap();
            token_burn_amounts[position] = token_burn_amounts[position].saturating_sub(state.amount);
        }
    }
    let mut guard_state =
        Cat20GuardConstState { token_scripts: table.clone(), token_amounts, token_burn_amounts, input_state_hashes, token_script_indexes };
    tamper(&mut guard_state);
    let guard = deploy(funder, CovenantDescriptor::Cat20Guard, guard_state);

    let (owner_addr_or_scripts, output_tokens, output_type_indexes, output_satoshis) =
        guard_output_fields(outputs, &table, |state: &Cat20State| (state.owner_addr.clone(), state.amount));
    let guard_call = Cat20GuardUnlock {
        state: guard.state.clone(),
        prev_tx: guard.tx.serialize(),
        owner_addr_or_scripts,
        output_tokens,
        output_type_indexes,
        output_satoshis,
        input_states,
        output_count: outputs.len() as u8,
    };

    let tx_inputs = inputs.iter().map(|input| input.utxo.input()).chain([guard.input()]).collect();
    let tx = Transaction::new(Transaction::DEFAULT_VERSION, tx_inputs, asset_outputs(outputs), 0);
    let entries = inputs.iter().map(|input| input.utxo.entry()).chain([guard.entry()]).collect::<Vec<_>>();
    let asset_calls = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let owner = ScriptPublicKey::from_vec(input.utxo.state.owner_addr.clone());
            CovenantCall::Cat20Unlock(Box::new(Cat20Unlock {
                state: input.utxo.state.clone(),
                args: user_args(&tx, &entries, index, input.owner, &owner),
                guard: GuardInfo { input_index: inputs.len() as u8, prev_tx: guard.tx.serialize(), state: guard.state.clone() },
                backtrace: input.utxo.backtrace(),
            }))
        })
        .collect();
    let descriptors = inputs.iter().map(|input| input.utxo.descriptor.clone()).collect();
    Transfer { guard, guard_call, asset_calls, descriptors, tx, entries }
}

impl Transfer<Cat20GuardConstState, Cat20GuardUnlock> {
    pub fn seal(&self) -> Transaction {
        let mut tx = self.tx.clone();
        for (index, call) in self.asset_calls.iter().enumerate() {
            tx.inputs[index].witness = call.to_witness(&self.descriptors[index]).unwrap();
        }
        let guard_call = CovenantCall::Cat20GuardUnlock(Box::new(self.guard_call.clone()));
        tx.inputs[self.guard_index()].witness = guard_call.to_witness(&self.guard.descriptor).unwrap();
        tx
    }

    pub fn token_call(&mut self, index: usize) -> &mut Cat20Unlock {
        match &mut self.asset_calls[index] {
            CovenantCall::Cat20Unlock(call) => call,
            _ => unreachable!(),
        }
    }

    /// Token output `output_index` of the sealed transaction, traced through the first
    /// input of the same token.
    pub fn token_utxo(&self, tx: &Transaction, inputs: &[&Utxo<Cat20State>], output_index: usize) -> Utxo<Cat20State> {
        let output = tx.outputs[output_index].clone();
        let (trace_input, traced) =
            inputs.iter().enumerate().find(|(_, utxo)| utxo.output.script_public_key == output.script_public_key).unwrap();
        let slot = output_index - 1;
        Utxo {
            outpoint: TransactionOutpoint::new(tx.id(), output_index as u32),
            state: Cat20State::new(self.guard_call.owner_addr_or_scripts[slot].clone(), self.guard_call.output_tokens[slot]),
            output,
            descriptor: traced.descriptor.clone(),
            tx: tx.clone(),
            trace_input: trace_input as u32,
            trace_tx: traced.tx.clone(),
        }
    }
}

/// Builds a guarded CAT721 transfer. Inputs whose index is in `burns` are burned.
pub(crate) fn cat721_transfer(
    funder: &mut Funder,
    inputs: &[Owned<Cat721State>],
    outputs: &[Planned<Cat721State>],
    burns: &[usize],
) -> Transfer<Cat721GuardConstState, Cat721GuardUnlock> {
    let mut scripts: Vec<ScriptPublicKey> = vec![];
    for input in inputs {
        if !scripts.contains(&input.utxo.output.script_public_key) {
            scripts.push(input.utxo.output.script_public_key.clone());
        }
    }
    let table = build_script_table(&scripts).unwrap();
    let mut nft_burn_masks = [false; TX_INPUT_COUNT_MAX];
    let mut input_state_hashes = [None; TX_INPUT_COUNT_MAX];
    let mut nft_script_indexes = [NOT_ASSET_INDEX; TX_INPUT_COUNT_MAX];
    let mut input_states: [Option<Cat721State>; TX_INPUT_COUNT_MAX] = Default::default();
    for (slot, input) in inputs.iter().enumerate() {
        nft_burn_masks[slot] = burns.contains(&slot);
        input_state_hashes[slot] = Some(input.utxo.state.state_hash());
        nft_script_indexes[slot] = script_index(&table, &input.utxo.output.script_public_key).unwrap() as i8;
        input_states[slot] = Some(input.utxo.state.clone());
    }
    let guard_state = Cat721GuardConstState { nft_scripts: table.clone(), nft_burn_masks, input_state_hashes, nft_script_indexes };
    let guard = deploy(funder, CovenantDescriptor::Cat721Guard, guard_state);

    let (owner_addr_or_scripts, output_local_ids, output_type_indexes, output_satoshis) =
        guard_output_fields(outputs, &table, |state: &Cat721State| (state.owner_addr.clone(), state.local_id));
    let guard_call = Cat721GuardUnlock {
        state: guard.state.clone(),
        prev_tx: guard.tx.serialize(),
        owner_addr_or_scripts,
        output_local_ids,
        output_type_indexes,
        output_satoshis,
        input_states,
        output_count: outputs.len() as u8,
    };

    let tx_inputs = inputs.iter().map(|input| input.utxo.input()).chain([guard.input()]).collect();
    let tx = Transaction::new(Transaction::DEFAULT_VERSION, tx_inputs, asset_outputs(outputs), 0);
    let entries = inputs.iter().map(|input| input.utxo.entry()).chain([guard.entry()]).collect::<Vec<_>>();
    let asset_calls = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let owner = ScriptPublicKey::from_vec(input.utxo.state.owner_addr.clone());
            CovenantCall::Cat721Unlock(Box::new(Cat721Unlock {
                state: input.utxo.state.clone(),
                args: user_args(&tx, &entries, index, input.owner, &owner),
                guard: GuardInfo { input_index: inputs.len() as u8, prev_tx: guard.tx.serialize(), state: guard.state.clone() },
                backtrace: input.utxo.backtrace(),
            }))
        })
        .collect();
    let descriptors = inputs.iter().map(|input| input.utxo.descriptor.clone()).collect();
    Transfer { guard, guard_call, asset_calls, descriptors, tx, entries }
}

impl Transfer<Cat721GuardConstState, Cat721GuardUnlock> {
    pub fn seal(&self) -> Transaction {
        let mut tx = self.tx.clone();
        for (index, call) in self.asset_calls.iter().enumerate() {
            tx.inputs[index].witness = call.to_witness(&self.descriptors[index]).unwrap();
        }
        let guard_call = CovenantCall::Cat721GuardUnlock(Box::new(self.guard_call.clone()));
        tx.inputs[self.guard_index()].witness = guard_call.to_witness(&self.guard.descriptor).unwrap();
        tx
    }
}

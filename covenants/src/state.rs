//!
//! State commitment. Every state-carrying output `j` (1..=5) of a covenant
//! transaction has its state hashed into the state output (output 0):
//!
//! `OP_RETURN <"cat"> <root> <h1> <h2> <h3> <h4> <h5>`
//!
//! where `h_j = hash160(serialize(state_j))`, or an empty push for an output
//! without state, and `root = hash160(h1 || h2 || h3 || h4 || h5)`.
//!

use crate::{
    constants::{STATE_MAGIC, STATE_OUTPUT_COUNT_MAX, STATE_OUTPUT_INDEX},
    context::SpendContext,
    error::CovenantError,
    result::CovenantResult,
};
use cat_consensus_core::{
    hashing::PreimageHasher,
    script::{op_return, parse_op_return},
    tx::{ScriptPublicKey, Transaction, TransactionOutpoint, TransactionOutput},
};
use cat_hashes::{Hash160, Hasher, HasherBase, StateHash};

/// A covenant state with an explicit, field-by-field serialization.
pub trait CovenantState {
    fn write_state<H: HasherBase>(&self, hasher: &mut H);

    fn state_hash(&self) -> Hash160 {
        let mut hasher = StateHash::new();
        self.write_state(&mut hasher);
        hasher.finalize()
    }

    fn serialize_state(&self) -> Vec<u8> {
        let mut hasher = PreimageHasher::default();
        self.write_state(&mut hasher);
        hasher.buff
    }
}

/// State hashes of outputs `1..=STATE_OUTPUT_COUNT_MAX`, `None` for outputs without state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxStateOutput {
    hashes: [Option<Hash160>; STATE_OUTPUT_COUNT_MAX],
}

impl TxStateOutput {
    pub fn new(hashes: [Option<Hash160>; STATE_OUTPUT_COUNT_MAX]) -> Self {
        Self { hashes }
    }

    pub fn hashes(&self) -> &[Option<Hash160>; STATE_OUTPUT_COUNT_MAX] {
        &self.hashes
    }

    /// Sets the state hash of transaction output `output_index` (1-based, output 0 being this one).
    pub fn set(&mut self, output_index: usize, hash: Option<Hash160>) -> CovenantResult<()> {
        let slot = Self::slot(output_index).ok_or(CovenantError::IndexOutOfRange(output_index, "state output slot"))?;
        self.hashes[slot] = hash;
        Ok(())
    }

    /// State hash committed for transaction output `output_index`.
    pub fn hash_at(&self, output_index: usize) -> Option<Hash160> {
        Self::slot(output_index).and_then(|slot| self.hashes[slot])
    }

    fn slot(output_index: usize) -> Option<usize> {
        (output_index > STATE_OUTPUT_INDEX && output_index <= STATE_OUTPUT_COUNT_MAX).then(|| output_index - 1)
    }

    pub fn root(&self) -> Hash160 {
        let mut hasher = StateHash::new();
        for hash in self.hashes.iter().flatten() {
            hasher.update(hash);
        }
        hasher.finalize()
    }

    pub fn to_script(&self) -> ScriptPublicKey {
        let root = self.root();
        let pushes = [STATE_MAGIC, root.as_slice()]
            .into_iter()
            .chain(self.hashes.iter().map(|hash| hash.as_ref().map(|h| h.as_slice()).unwrap_or(&[])));
        op_return(pushes)
    }

    pub fn to_output(&self) -> TransactionOutput {
        TransactionOutput::new(0, self.to_script())
    }

    /// Parses a state output script, verifying its root.
    pub fn parse(script: &ScriptPublicKey) -> CovenantResult<Self> {
        let pushes = parse_op_return(script.script())?;
        let [magic, root, hashes @ ..] = pushes.as_slice() else {
            return Err(CovenantError::InvalidStateOutput("missing magic or root"));
        };
        if *magic != STATE_MAGIC {
            return Err(CovenantError::InvalidStateOutput("bad magic"));
        }
        if hashes.len() != STATE_OUTPUT_COUNT_MAX {
            return Err(CovenantError::InvalidStateOutput("wrong number of state hashes"));
        }
        let mut state = Self::default();
        for (slot, hash) in hashes.iter().enumerate() {
            state.hashes[slot] = match hash.len() {
                0 => None,
                _ => Some(Hash160::try_from_slice(hash).ok_or(CovenantError::InvalidStateOutput("bad state hash length"))?),
            };
        }
        if state.root().as_slice() != *root {
            return Err(CovenantError::InvalidStateOutput("root mismatch"));
        }
        Ok(state)
    }

    /// Parses output 0 of `tx`.
    pub fn from_transaction(tx: &Transaction) -> CovenantResult<Self> {
        let output = tx.outputs.get(STATE_OUTPUT_INDEX).ok_or(CovenantError::InvalidStateOutput("missing state output"))?;
        if output.value != 0 {
            return Err(CovenantError::InvalidStateOutput("state output must carry no value"));
        }
        Self::parse(&output.script_public_key)
    }
}

/// Checks that `prev_tx` created `outpoint` and committed `state_hash` for it.
pub fn verify_state_binding(prev_tx: &Transaction, outpoint: &TransactionOutpoint, state_hash: Hash160) -> CovenantResult<()> {
    if prev_tx.id() != outpoint.transaction_id {
        return Err(CovenantError::PrevTxIdMismatch);
    }
    let state_output = TxStateOutput::from_transaction(prev_tx)?;
    if state_output.hash_at(outpoint.index as usize) != Some(state_hash) {
        return Err(CovenantError::StateHashMismatch(outpoint.index));
    }
    Ok(())
}

/// Outputs a covenant derives from its call, in order, after the state output.
pub(crate) struct SynthesizedOutputs {
    state: TxStateOutput,
    outputs: Vec<TransactionOutput>,
}

impl SynthesizedOutputs {
    pub(crate) fn new() -> Self {
        Self { state: TxStateOutput::default(), outputs: Vec::with_capacity(STATE_OUTPUT_COUNT_MAX) }
    }

    pub(crate) fn push(&mut self, value: u64, script: ScriptPublicKey, state_hash: Option<Hash160>) -> CovenantResult<()> {
        self.outputs.push(TransactionOutput::new(value, script));
        self.state.set(self.outputs.len(), state_hash)
    }

    fn into_outputs(self) -> Vec<TransactionOutput> {
        std::iter::once(self.state.to_output()).chain(self.outputs).collect()
    }

    /// Requires the transaction outputs to be exactly the synthesized ones.
    pub(crate) fn require_matches(self, ctx: &SpendContext) -> CovenantResult<()> {
        ctx.require_outputs(&self.into_outputs())
    }

    /// Requires the transaction outputs to start with the synthesized ones. The state
    /// output commits no state for any output past them.
    pub(crate) fn require_prefix(self, ctx: &SpendContext) -> CovenantResult<()> {
        ctx.require_output_prefix(&self.into_outputs())
    }
}

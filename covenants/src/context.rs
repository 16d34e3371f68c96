use crate::{error::CovenantError, result::CovenantResult};
use cat_consensus_core::{
    hashing::sighash::{SigHashReusedValues, calc_signature_hash},
    sign::{parse_signature, verify_message},
    tx::{PopulatedTransaction, ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput, UtxoEntry},
};
use secp256k1::PublicKey;

/// The transaction being verified, seen from the input currently executing.
#[derive(Clone, Copy)]
pub struct SpendContext<'a> {
    pub tx: &'a Transaction,
    pub entries: &'a [UtxoEntry],
    pub input_index: usize,
}

impl<'a> SpendContext<'a> {
    pub fn new(tx: &'a Transaction, entries: &'a [UtxoEntry], input_index: usize) -> CovenantResult<Self> {
        if tx.inputs.len() != entries.len() {
            return Err(CovenantError::EntriesLengthMismatch(entries.len(), tx.inputs.len()));
        }
        if input_index >= tx.inputs.len() {
            return Err(CovenantError::IndexOutOfRange(input_index, "inputs"));
        }
        Ok(Self { tx, entries, input_index })
    }

    pub fn self_input(&self) -> &'a TransactionInput {
        &self.tx.inputs[self.input_index]
    }

    pub fn self_outpoint(&self) -> &'a TransactionOutpoint {
        &self.self_input().previous_outpoint
    }

    pub fn self_script(&self) -> &'a ScriptPublicKey {
        &self.entries[self.input_index].script_public_key
    }

    pub fn input_count(&self) -> usize {
        self.tx.inputs.len()
    }

    pub fn input_script(&self, index: usize) -> CovenantResult<&'a ScriptPublicKey> {
        self.entries.get(index).map(|entry| &entry.script_public_key).ok_or(CovenantError::IndexOutOfRange(index, "inputs"))
    }

    pub fn input_outpoint(&self, index: usize) -> CovenantResult<&'a TransactionOutpoint> {
        self.tx.inputs.get(index).map(|input| &input.previous_outpoint).ok_or(CovenantError::IndexOutOfRange(index, "inputs"))
    }

    /// Verifies that `signature` over this input was made by `public_key`, the key controlling `owner_script`.
    pub fn verify_signature(&self, public_key: &[u8], signature: &[u8], owner_script: &ScriptPublicKey) -> CovenantResult<()> {
        let public_key = PublicKey::from_slice(public_key).map_err(|err| CovenantError::Signature(err.into()))?;
        let (hash_type, body) = parse_signature(signature)?;
        let populated = PopulatedTransaction::new(self.tx, self.entries);
        let sig_hash = calc_signature_hash(&populated, self.input_index, hash_type, &mut SigHashReusedValues::new())
            .ok_or(CovenantError::IndexOutOfRange(self.input_index, "inputs"))?;
        verify_message(sig_hash, body, &public_key, owner_script)?;
        Ok(())
    }

    /// Requires the transaction outputs to be exactly `expected`.
    pub fn require_outputs(&self, expected: &[TransactionOutput]) -> CovenantResult<()> {
        if self.tx.outputs.as_slice() != expected {
            return Err(CovenantError::OutputsMismatch);
        }
        Ok(())
    }

    /// Requires the transaction outputs to start with `expected`; outputs past them are free.
    pub fn require_output_prefix(&self, expected: &[TransactionOutput]) -> CovenantResult<()> {
        if !self.tx.outputs.starts_with(expected) {
            return Err(CovenantError::OutputsMismatch);
        }
        Ok(())
    }
}

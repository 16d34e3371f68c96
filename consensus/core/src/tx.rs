mod decode;
mod script_public_key;

use borsh::{BorshDeserialize, BorshSerialize};
use cat_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub use decode::decode_transaction;
pub use script_public_key::*;

use crate::{errors::TxDecodeError, hashing};

/// Represents the ID of a transaction
pub type TransactionId = Hash;

/// Represents a transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, BorshSerialize, BorshDeserialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Represents a transaction input. The witness is a stack of byte strings;
/// it is not covered by the transaction id. The legacy script sig is empty for
/// every input this workspace builds but is kept for transactions read from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    #[serde(default, with = "hex::serde")]
    pub script_sig: Vec<u8>,
    pub witness: Vec<Vec<u8>>,
    pub sequence: u32,
}

impl TransactionInput {
    pub const SEQUENCE_FINAL: u32 = u32::MAX;

    pub fn new(previous_outpoint: TransactionOutpoint, witness: Vec<Vec<u8>>, sequence: u32) -> Self {
        Self { previous_outpoint, script_sig: vec![], witness, sequence }
    }

    pub fn with_script_sig(mut self, script_sig: Vec<u8>) -> Self {
        self.script_sig = script_sig;
        self
    }
}

/// Represents a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// The output an input spends, as known to the spender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
}

impl UtxoEntry {
    pub fn new(amount: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { amount, script_public_key }
    }
}

impl From<&TransactionOutput> for UtxoEntry {
    fn from(output: &TransactionOutput) -> Self {
        Self { amount: output.value, script_public_key: output.script_public_key.clone() }
    }
}

/// Represents a base-chain transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub const DEFAULT_VERSION: u32 = 2;

    pub fn new(version: u32, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// Transaction id: double sha256 of the witness-stripped encoding.
    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Full wire encoding, including witnesses when present.
    pub fn serialize(&self) -> Vec<u8> {
        hashing::tx::serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, TxDecodeError> {
        decode_transaction(bytes)
    }

    pub fn to_hex(&self) -> String {
        faster_hex::hex_string(&self.serialize())
    }

    pub fn from_hex(hex: &str) -> Result<Self, TxDecodeError> {
        if hex.len() % 2 != 0 {
            return Err(TxDecodeError::Hex(format!("odd length {}", hex.len())));
        }
        let mut bytes = vec![0u8; hex.len() / 2];
        faster_hex::hex_decode(hex.as_bytes(), &mut bytes).map_err(|err| TxDecodeError::Hex(err.to_string()))?;
        decode_transaction(&bytes)
    }

    /// Weight units: base size counts four times, witness bytes once.
    pub fn weight(&self) -> u64 {
        let base = hashing::tx::base_size(self) as u64;
        let total = hashing::tx::total_size(self) as u64;
        base * 3 + total
    }

    pub fn vsize(&self) -> u64 {
        self.weight().div_ceil(4)
    }
}

/// A transaction together with the entries of the outputs it spends.
pub struct PopulatedTransaction<'a> {
    pub tx: &'a Transaction,
    pub entries: &'a [UtxoEntry],
}

impl<'a> PopulatedTransaction<'a> {
    pub fn new(tx: &'a Transaction, entries: &'a [UtxoEntry]) -> Self {
        assert_eq!(tx.inputs.len(), entries.len());
        Self { tx, entries }
    }

    pub fn populated_inputs(&self) -> impl ExactSizeIterator<Item = (&'a TransactionInput, &'a UtxoEntry)> {
        self.tx.inputs.iter().zip(self.entries.iter())
    }

    pub fn populated_input(&self, index: usize) -> Option<(&'a TransactionInput, &'a UtxoEntry)> {
        Some((self.tx.inputs.get(index)?, self.entries.get(index)?))
    }

    pub fn outputs(&self) -> &'a [TransactionOutput] {
        &self.tx.outputs
    }

    pub fn inputs(&self) -> &'a [TransactionInput] {
        &self.tx.inputs
    }
}

/// An owned transaction under construction, carrying the entries it spends so that
/// every input can be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignableTransaction {
    pub tx: Transaction,
    pub entries: Vec<UtxoEntry>,
}

impl SignableTransaction {
    pub fn with_entries(tx: Transaction, entries: Vec<UtxoEntry>) -> Self {
        assert_eq!(tx.inputs.len(), entries.len());
        Self { tx, entries }
    }

    pub fn as_populated(&self) -> PopulatedTransaction<'_> {
        PopulatedTransaction::new(&self.tx, &self.entries)
    }

    pub fn id(&self) -> TransactionId {
        self.tx.id()
    }
}

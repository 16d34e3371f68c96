//!
//! Partially signed transactions exchanged with a [`Signer`](crate::signer::Signer).
//!
//! A [`Psbt`] carries the unsigned transaction, the output each input spends
//! and the signatures collected so far. It travels as the hex of its borsh
//! encoding. Signatures are kept apart from the witnesses because covenant
//! inputs embed them in their call arguments rather than in a key-spend
//! witness.
//!

use crate::imports::*;
use cat_consensus_core::{
    hashing::{
        sighash::{SigHashReusedValues, calc_signature_hash},
        sighash_type::{SIG_HASH_ALL, SigHashType},
    },
    sign::{PUBLIC_KEY_SIZE, SIGNATURE_SIZE, key_spend_witness},
    tx::PopulatedTransaction,
};
use cat_covenants::owner::ContractUnlockArgs;
use cat_hashes::Hash;
use secp256k1::PublicKey;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PartialSig {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl PartialSig {
    /// Owner argument of a covenant call made by the signer of this signature.
    pub fn unlock_args(&self) -> ContractUnlockArgs {
        ContractUnlockArgs::user(self.public_key.clone(), self.signature.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PsbtInput {
    pub entry: UtxoEntry,
    pub partial_sig: Option<PartialSig>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Psbt {
    pub tx: Transaction,
    pub inputs: Vec<PsbtInput>,
}

impl Psbt {
    /// Strips the witnesses of `tx`; they are rebuilt once signatures are in.
    pub fn new(mut tx: Transaction, entries: Vec<UtxoEntry>) -> Result<Self> {
        if tx.inputs.len() != entries.len() {
            return Err(Error::custom(format!("{} entries for {} inputs", entries.len(), tx.inputs.len())));
        }
        tx.inputs.iter_mut().for_each(|input| input.witness.clear());
        let inputs = entries.into_iter().map(|entry| PsbtInput { entry, partial_sig: None }).collect();
        Ok(Self { tx, inputs })
    }

    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(borsh::to_vec(self)?))
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text)?;
        Ok(Self::try_from_slice(&bytes)?)
    }

    pub fn entries(&self) -> Vec<UtxoEntry> {
        self.inputs.iter().map(|input| input.entry.clone()).collect()
    }

    pub fn sighash(&self, index: usize, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Result<Hash> {
        let entries = self.entries();
        let populated = PopulatedTransaction::new(&self.tx, &entries);
        calc_signature_hash(&populated, index, hash_type, reused_values)
            .ok_or_else(|| Error::custom(format!("input {index} is out of range")))
    }

    pub fn partial_sig(&self, index: usize) -> Result<&PartialSig> {
        self.inputs.get(index).and_then(|input| input.partial_sig.as_ref()).ok_or(Error::MissingSignature(index))
    }

    /// Key-spend witness of input `index` from its collected signature.
    pub fn key_spend_witness(&self, index: usize) -> Result<Vec<Vec<u8>>> {
        let partial = self.partial_sig(index)?;
        let signature: [u8; SIGNATURE_SIZE] =
            partial.signature.as_slice().try_into().map_err(|_| Error::MissingSignature(index))?;
        let public_key = PublicKey::from_slice(&partial.public_key).map_err(|err| Error::Sign(err.into()))?;
        Ok(key_spend_witness(signature, &public_key, &self.inputs[index].entry.script_public_key))
    }
}

/// Placeholder owner argument with the size of a real one.
pub fn dummy_unlock_args() -> ContractUnlockArgs {
    ContractUnlockArgs::user(vec![0x02; PUBLIC_KEY_SIZE], cat_consensus_core::sign::DUMMY_SIGNATURE.to_vec())
}

/// An input the signer is asked to sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToSignInput {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sighash_types: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_tweak_signer: Option<bool>,
}

impl ToSignInput {
    pub fn new(index: usize) -> Self {
        Self { index, ..Default::default() }
    }

    pub fn with_public_key(index: usize, public_key: String) -> Self {
        Self { index, public_key: Some(public_key), disable_tweak_signer: Some(true), ..Default::default() }
    }

    /// First requested sighash type, `ALL` if none.
    pub fn sighash_type(&self) -> Result<SigHashType> {
        match self.sighash_types.as_ref().and_then(|types| types.first()) {
            Some(value) => SigHashType::from_u8(*value).map_err(Error::from),
            None => Ok(SIG_HASH_ALL),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    pub to_sign_inputs: Vec<ToSignInput>,
}

impl SignOptions {
    pub fn new(to_sign_inputs: Vec<ToSignInput>) -> Self {
        Self { to_sign_inputs }
    }
}

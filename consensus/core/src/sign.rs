use crate::{
    hashing::{
        sighash::{SigHashReusedValues, calc_signature_hash},
        sighash_type::SigHashType,
    },
    script::{pay_to_taproot_key, pay_to_witness_pubkey},
    tx::{PopulatedTransaction, ScriptPublicKey, SignableTransaction},
};
use cat_hashes::Hash;
use secp256k1::{Keypair, Message, PublicKey, SECP256K1, XOnlyPublicKey, ecdsa, schnorr};
use std::collections::BTreeMap;
use thiserror::Error;

/// 64-byte compact signature followed by the sighash type byte.
pub const SIGNATURE_SIZE: usize = 65;
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Placeholder of the exact final signature size, used to measure transactions before signing.
pub const DUMMY_SIGNATURE: [u8; SIGNATURE_SIZE] = [0u8; SIGNATURE_SIZE];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("Secp256k1 -> {0}")]
    Secp256k1Error(#[from] secp256k1::Error),

    #[error("The transaction is partially signed")]
    PartiallySigned,

    #[error("The transaction is fully signed")]
    FullySigned,

    #[error("signature must be {SIGNATURE_SIZE} bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("invalid sighash type {0:#04x}")]
    InvalidSigHashType(u8),

    #[error("script {0} is neither P2WPKH nor P2TR")]
    UnsupportedScript(ScriptPublicKey),

    #[error("public key does not match the locking script")]
    PublicKeyMismatch,

    #[error("input {0} is out of range")]
    InputIndexOutOfRange(usize),

    #[error("input {index} has a malformed key-spend witness of {items} items")]
    MalformedWitness { index: usize, items: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A wrapper enum that represents the transaction signed state. A transaction
/// contained by this enum can be either fully signed or partially signed.
pub enum Signed {
    Fully(SignableTransaction),
    Partially(SignableTransaction),
}

impl Signed {
    /// Returns the transaction if it is fully signed, otherwise returns an error
    pub fn fully_signed(self) -> Result<SignableTransaction> {
        match self {
            Signed::Fully(tx) => Ok(tx),
            Signed::Partially(_) => Err(Error::PartiallySigned),
        }
    }

    /// Returns the transaction regardless of whether it is fully or partially signed
    pub fn unwrap(self) -> SignableTransaction {
        match self {
            Signed::Fully(tx) => tx,
            Signed::Partially(tx) => tx,
        }
    }
}

/// Signs `sig_hash` with the scheme implied by `script`: schnorr for P2TR, compact ECDSA for P2WPKH.
pub fn sign_message(sig_hash: Hash, keypair: &Keypair, script: &ScriptPublicKey, hash_type: SigHashType) -> Result<[u8; SIGNATURE_SIZE]> {
    let msg = Message::from_digest(sig_hash.as_bytes());
    let body: [u8; 64] = if script.is_p2tr() {
        SECP256K1.sign_schnorr_no_aux_rand(&msg, keypair).serialize()
    } else if script.is_p2wpkh() {
        SECP256K1.sign_ecdsa(&msg, &keypair.secret_key()).serialize_compact()
    } else {
        return Err(Error::UnsupportedScript(script.clone()));
    };
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature[..64].copy_from_slice(&body);
    signature[64] = hash_type.to_u8();
    Ok(signature)
}

/// Splits a signature into its sighash type and 64-byte body.
pub fn parse_signature(signature: &[u8]) -> Result<(SigHashType, &[u8])> {
    if signature.len() != SIGNATURE_SIZE {
        return Err(Error::InvalidSignatureLength(signature.len()));
    }
    let hash_type = SigHashType::from_u8(signature[64]).map_err(|_| Error::InvalidSigHashType(signature[64]))?;
    Ok((hash_type, &signature[..64]))
}

/// Whether `public_key` controls `script`.
pub fn public_key_matches_script(public_key: &PublicKey, script: &ScriptPublicKey) -> bool {
    if script.is_p2wpkh() {
        &pay_to_witness_pubkey(public_key) == script
    } else if script.is_p2tr() {
        &pay_to_taproot_key(&public_key.x_only_public_key().0) == script
    } else {
        false
    }
}

/// Verifies a signature body against `sig_hash`, for the key controlling `script`.
pub fn verify_message(sig_hash: Hash, body: &[u8], public_key: &PublicKey, script: &ScriptPublicKey) -> Result<()> {
    if !public_key_matches_script(public_key, script) {
        return Err(Error::PublicKeyMismatch);
    }
    let msg = Message::from_digest(sig_hash.as_bytes());
    if script.is_p2tr() {
        let signature = schnorr::Signature::from_slice(body)?;
        SECP256K1.verify_schnorr(&signature, &msg, &public_key.x_only_public_key().0)?;
    } else {
        let signature = ecdsa::Signature::from_compact(body)?;
        SECP256K1.verify_ecdsa(&msg, &signature, public_key)?;
    }
    Ok(())
}

/// Key-spend witness for an input locked by `script`.
pub fn key_spend_witness(signature: [u8; SIGNATURE_SIZE], public_key: &PublicKey, script: &ScriptPublicKey) -> Vec<Vec<u8>> {
    if script.is_p2wpkh() { vec![signature.to_vec(), public_key.serialize().to_vec()] } else { vec![signature.to_vec()] }
}

/// Same shape and size as the final key-spend witness, without a valid signature.
pub fn dummy_key_spend_witness(script: &ScriptPublicKey) -> Vec<Vec<u8>> {
    if script.is_p2wpkh() { vec![DUMMY_SIGNATURE.to_vec(), vec![0x02; PUBLIC_KEY_SIZE]] } else { vec![DUMMY_SIGNATURE.to_vec()] }
}

/// Signs every listed key-spend input whose locking script is controlled by one of `keypairs`.
pub fn sign_with_multiple(
    mut signable_tx: SignableTransaction,
    keypairs: &[Keypair],
    inputs: impl IntoIterator<Item = (usize, SigHashType)>,
) -> Result<Signed> {
    let mut map = BTreeMap::new();
    for keypair in keypairs {
        let public_key = keypair.public_key();
        map.insert(pay_to_witness_pubkey(&public_key), *keypair);
        map.insert(pay_to_taproot_key(&public_key.x_only_public_key().0), *keypair);
    }

    let mut reused_values = SigHashReusedValues::new();
    let mut additional_signatures_required = false;
    let mut witnesses = Vec::new();
    for (index, hash_type) in inputs {
        let script = &signable_tx.entries.get(index).ok_or(Error::InputIndexOutOfRange(index))?.script_public_key;
        if let Some(keypair) = map.get(script) {
            let sig_hash = calc_signature_hash(&signable_tx.as_populated(), index, hash_type, &mut reused_values)
                .ok_or(Error::InputIndexOutOfRange(index))?;
            let signature = sign_message(sig_hash, keypair, script, hash_type)?;
            witnesses.push((index, key_spend_witness(signature, &keypair.public_key(), script)));
        } else {
            additional_signatures_required = true;
        }
    }
    // witnesses are not part of the signature hash, so they can be applied after signing
    for (index, witness) in witnesses {
        signable_tx.tx.inputs[index].witness = witness;
    }

    if additional_signatures_required { Ok(Signed::Partially(signable_tx)) } else { Ok(Signed::Fully(signable_tx)) }
}

/// Verifies the key-spend witness of input `index`.
pub fn verify_key_spend(tx: &PopulatedTransaction, index: usize, reused_values: &mut SigHashReusedValues) -> Result<()> {
    let (input, entry) = tx.populated_input(index).ok_or(Error::InputIndexOutOfRange(index))?;
    let script = &entry.script_public_key;
    let witness = &input.witness;
    let (signature, public_key) = if script.is_p2wpkh() {
        match witness.as_slice() {
            [signature, public_key] => (signature, PublicKey::from_slice(public_key)?),
            _ => return Err(Error::MalformedWitness { index, items: witness.len() }),
        }
    } else if script.is_p2tr() {
        match witness.as_slice() {
            [signature] => {
                let program = script.taproot_program().ok_or_else(|| Error::UnsupportedScript(script.clone()))?;
                let x_only = XOnlyPublicKey::from_slice(&program)?;
                (signature, x_only.public_key(secp256k1::Parity::Even))
            }
            _ => return Err(Error::MalformedWitness { index, items: witness.len() }),
        }
    } else {
        return Err(Error::UnsupportedScript(script.clone()));
    };

    let (hash_type, body) = parse_signature(signature)?;
    let sig_hash = calc_signature_hash(tx, index, hash_type, reused_values).ok_or(Error::InputIndexOutOfRange(index))?;
    verify_message(sig_hash, body, &public_key, script)
}

/// Verifies every input as a key spend.
pub fn verify(tx: &PopulatedTransaction) -> Result<()> {
    let mut reused_values = SigHashReusedValues::new();
    for index in 0..tx.tx.inputs.len() {
        verify_key_spend(tx, index, &mut reused_values)?;
    }
    Ok(())
}

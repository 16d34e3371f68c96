use cat_hashes::{Hash, Hasher, HasherBase, TransactionSigningHash, ZERO_HASH};

use crate::tx::{PopulatedTransaction, ScriptPublicKey, TransactionOutput};

use super::{
    HasherExtensions,
    sighash_type::SigHashType,
    tx::{write_outpoint, write_output},
};

/// Per-transaction cache of the sub-hashes shared by every input.
#[derive(Default)]
pub struct SigHashReusedValues {
    previous_outputs_hash: Option<Hash>,
    amounts_hash: Option<Hash>,
    scripts_hash: Option<Hash>,
    sequence_hash: Option<Hash>,
    outputs_hash: Option<Hash>,
}

impl SigHashReusedValues {
    pub fn new() -> Self {
        Self { previous_outputs_hash: None, amounts_hash: None, scripts_hash: None, sequence_hash: None, outputs_hash: None }
    }
}

fn previous_outputs_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }
    *reused_values.previous_outputs_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs().iter() {
            write_outpoint(&mut hasher, &input.previous_outpoint);
        }
        hasher.finalize()
    })
}

fn amounts_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }
    *reused_values.amounts_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for entry in tx.entries.iter() {
            hasher.write_u64(entry.amount);
        }
        hasher.finalize()
    })
}

fn scripts_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }
    *reused_values.scripts_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for entry in tx.entries.iter() {
            hash_script_public_key(&mut hasher, &entry.script_public_key);
        }
        hasher.finalize()
    })
}

fn sequence_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_single() || hash_type.is_sighash_anyone_can_pay() || hash_type.is_sighash_none() {
        return ZERO_HASH;
    }
    *reused_values.sequence_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs().iter() {
            hasher.write_u32(input.sequence);
        }
        hasher.finalize()
    })
}

fn outputs_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues, input_index: usize) -> Hash {
    if hash_type.is_sighash_none() {
        return ZERO_HASH;
    }

    if hash_type.is_sighash_single() {
        // If the relevant output exists - return its hash, otherwise return zero-hash
        return match tx.outputs().get(input_index) {
            Some(output) => {
                let mut hasher = TransactionSigningHash::new();
                hash_output(&mut hasher, output);
                hasher.finalize()
            }
            None => ZERO_HASH,
        };
    }

    // Otherwise, return hash of all outputs. Re-use hash if available.
    *reused_values.outputs_hash.get_or_insert_with(|| {
        let mut hasher = TransactionSigningHash::new();
        for output in tx.outputs().iter() {
            hash_output(&mut hasher, output);
        }
        hasher.finalize()
    })
}

fn hash_output(hasher: &mut impl HasherBase, output: &TransactionOutput) {
    write_output(hasher, output);
}

fn hash_script_public_key(hasher: &mut impl HasherBase, script_public_key: &ScriptPublicKey) {
    hasher.write_var_bytes(script_public_key.script());
}

/// Computes the message signed by the key controlling input `input_index`.
/// Returns `None` if the input does not exist.
pub fn calc_signature_hash(
    tx: &PopulatedTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Option<Hash> {
    let (input, entry) = tx.populated_input(input_index)?;
    let mut hasher = TransactionSigningHash::new();
    hasher
        .write_u32(tx.tx.version)
        .update(previous_outputs_hash(tx, hash_type, reused_values))
        .update(amounts_hash(tx, hash_type, reused_values))
        .update(scripts_hash(tx, hash_type, reused_values))
        .update(sequence_hash(tx, hash_type, reused_values));
    write_outpoint(&mut hasher, &input.previous_outpoint);
    hasher.write_u64(entry.amount);
    hash_script_public_key(&mut hasher, &entry.script_public_key);
    hasher
        .write_u32(input.sequence)
        .update(outputs_hash(tx, hash_type, reused_values, input_index))
        .write_u32(input_index as u32)
        .write_u32(tx.tx.lock_time)
        .write_u8(hash_type.to_u8());
    Some(hasher.finalize())
}

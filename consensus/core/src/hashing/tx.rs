use super::{HasherExtensions, LengthCounter, PreimageHasher};
use crate::tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput};
use cat_hashes::{Hasher, HasherBase};

bitflags::bitflags! {
    /// A bitmask defining which transaction fields we want to encode and which to ignore.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxEncodingFlags: u8 {
        const FULL = 0;
        const EXCLUDE_WITNESS = 1 << 0;
    }
}

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// Not intended for direct use by clients. Instead use `tx.id()`
pub fn id(tx: &Transaction) -> TransactionId {
    let mut hasher = cat_hashes::TransactionID::new();
    write_transaction(&mut hasher, tx, TxEncodingFlags::EXCLUDE_WITNESS);
    hasher.finalize()
}

pub fn serialize(tx: &Transaction) -> Vec<u8> {
    let mut hasher = PreimageHasher::with_capacity(total_size(tx));
    write_transaction(&mut hasher, tx, TxEncodingFlags::FULL);
    hasher.buff
}

/// Size of the witness-stripped encoding.
pub fn base_size(tx: &Transaction) -> usize {
    let mut counter = LengthCounter::default();
    write_transaction(&mut counter, tx, TxEncodingFlags::EXCLUDE_WITNESS);
    counter.0
}

/// Size of the full encoding.
pub fn total_size(tx: &Transaction) -> usize {
    let mut counter = LengthCounter::default();
    write_transaction(&mut counter, tx, TxEncodingFlags::FULL);
    counter.0
}

/// Write the transaction into the provided hasher according to the encoding flags
pub fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction, encoding_flags: TxEncodingFlags) {
    let with_witness = !encoding_flags.contains(TxEncodingFlags::EXCLUDE_WITNESS) && tx.has_witness();

    hasher.write_u32(tx.version);
    if with_witness {
        hasher.update([SEGWIT_MARKER, SEGWIT_FLAG]);
    }

    hasher.write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input);
    }

    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(hasher, output);
    }

    if with_witness {
        for input in tx.inputs.iter() {
            hasher.write_len(input.witness.len());
            for item in input.witness.iter() {
                hasher.write_var_bytes(item);
            }
        }
    }

    hasher.write_u32(tx.lock_time);
}

#[inline(always)]
fn write_input<T: HasherBase>(hasher: &mut T, input: &TransactionInput) {
    write_outpoint(hasher, &input.previous_outpoint);
    hasher.write_var_bytes(&input.script_sig).write_u32(input.sequence);
}

#[inline(always)]
pub(crate) fn write_outpoint<T: HasherBase>(hasher: &mut T, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).write_u32(outpoint.index);
}

#[inline(always)]
pub(crate) fn write_output<T: HasherBase>(hasher: &mut T, output: &TransactionOutput) {
    hasher.write_u64(output.value).write_var_bytes(output.script_public_key.script());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{ScriptPublicKey, TransactionOutpoint};
    use cat_hashes::ZERO_HASH;

    #[test]
    fn test_encoding_layout() {
        let tx = Transaction::new(
            2,
            vec![TransactionInput::new(TransactionOutpoint::new(ZERO_HASH, 3), vec![vec![0xaa]], 0xffff_fffe)],
            vec![TransactionOutput::new(5, ScriptPublicKey::from_vec(vec![0x6a]))],
            7,
        );
        let bytes = serialize(&tx);
        let mut expected = vec![2, 0, 0, 0, 0x00, 0x01, 1];
        expected.extend_from_slice(&[0u8; 32]);
        expected.extend_from_slice(&[3, 0, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff, 1]);
        expected.extend_from_slice(&[5, 0, 0, 0, 0, 0, 0, 0, 1, 0x6a]);
        expected.extend_from_slice(&[1, 1, 0xaa]);
        expected.extend_from_slice(&[7, 0, 0, 0]);
        assert_eq!(bytes, expected);
        assert_eq!(total_size(&tx), bytes.len());
        assert_eq!(base_size(&tx), bytes.len() - 2 - 3);
        assert_eq!(id(&tx), cat_hashes::sha256d({
            let mut hasher = PreimageHasher::default();
            write_transaction(&mut hasher, &tx, TxEncodingFlags::EXCLUDE_WITNESS);
            hasher.buff
        }));
    }
}

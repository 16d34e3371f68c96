use super::{ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
use crate::errors::TxDecodeError;
use cat_hashes::Hash;

struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], TxDecodeError> {
        if self.remaining() < len {
            return Err(TxDecodeError::Truncated(what));
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], TxDecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn read_u8(&mut self, what: &'static str) -> Result<u8, TxDecodeError> {
        Ok(self.read_array::<1>(what)?[0])
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32, TxDecodeError> {
        Ok(u32::from_le_bytes(self.read_array(what)?))
    }

    fn read_u64(&mut self, what: &'static str) -> Result<u64, TxDecodeError> {
        Ok(u64::from_le_bytes(self.read_array(what)?))
    }

    fn read_compact_size(&mut self, what: &'static str) -> Result<u64, TxDecodeError> {
        let (value, min) = match self.read_u8(what)? {
            0xfd => (u16::from_le_bytes(self.read_array(what)?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array(what)?) as u64, 0x1_0000),
            0xff => (self.read_u64(what)?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < min {
            return Err(TxDecodeError::NonCanonicalCompactSize);
        }
        Ok(value)
    }

    /// Reads an element count. Every element occupies at least one byte, so a count larger
    /// than the remaining data is necessarily truncated.
    fn read_count(&mut self, what: &'static str) -> Result<usize, TxDecodeError> {
        let count = self.read_compact_size(what)?;
        if count > self.remaining() as u64 {
            return Err(TxDecodeError::Truncated(what));
        }
        Ok(count as usize)
    }

    fn read_var_bytes(&mut self, what: &'static str) -> Result<&'a [u8], TxDecodeError> {
        let len = self.read_count(what)?;
        self.take(len, what)
    }
}

/// Decodes a wire-encoded transaction. Truncated data, trailing bytes and malformed
/// segwit markers are rejected.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, TxDecodeError> {
    let mut reader = Reader::new(bytes);
    let version = reader.read_u32("version")?;

    let segwit = reader.peek() == Some(0x00);
    if segwit {
        reader.take(1, "segwit marker")?;
        let flag = reader.read_u8("segwit flag")?;
        if flag != 0x01 {
            return Err(TxDecodeError::InvalidSegwitFlag(flag));
        }
    }

    let input_count = reader.read_count("input count")?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let transaction_id = Hash::from_bytes(reader.read_array("outpoint txid")?);
        let index = reader.read_u32("outpoint index")?;
        let script_sig = reader.read_var_bytes("script sig")?.to_vec();
        let sequence = reader.read_u32("sequence")?;
        inputs.push(TransactionInput::new(TransactionOutpoint::new(transaction_id, index), vec![], sequence).with_script_sig(script_sig));
    }

    let output_count = reader.read_count("output count")?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        let value = reader.read_u64("output value")?;
        let script = reader.read_var_bytes("output script")?;
        outputs.push(TransactionOutput::new(value, ScriptPublicKey::from_vec(script.to_vec())));
    }

    if segwit {
        for input in inputs.iter_mut() {
            let item_count = reader.read_count("witness item count")?;
            input.witness = (0..item_count)
                .map(|_| reader.read_var_bytes("witness item").map(|item| item.to_vec()))
                .collect::<Result<Vec<_>, _>>()?;
        }
        if inputs.iter().all(|input| input.witness.is_empty()) {
            return Err(TxDecodeError::SuperfluousWitness);
        }
    }

    let lock_time = reader.read_u32("lock time")?;
    if reader.remaining() > 0 {
        return Err(TxDecodeError::TrailingBytes(reader.remaining()));
    }

    Ok(Transaction::new(version, inputs, outputs, lock_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cat_hashes::ZERO_HASH;

    fn tx() -> Transaction {
        Transaction::new(
            2,
            vec![
                TransactionInput::new(TransactionOutpoint::new(ZERO_HASH, 0), vec![vec![1u8; 65]], 1),
                TransactionInput::new(TransactionOutpoint::new(ZERO_HASH, 1), vec![], 2),
            ],
            vec![TransactionOutput::new(546, ScriptPublicKey::from_vec(vec![0x51, 0x20].into_iter().chain([5u8; 32]).collect()))],
            0,
        )
    }

    #[test]
    fn test_decode_roundtrip() {
        let tx = tx();
        assert_eq!(decode_transaction(&tx.serialize()).unwrap(), tx);
        let mut bare = tx.clone();
        bare.inputs[0].witness.clear();
        assert_eq!(decode_transaction(&bare.serialize()).unwrap(), bare);
    }

    #[test]
    fn test_decode_legacy_script_sig() {
        // version 2, one input spending (zero hash, 0) with script sig aabbcc, one output, no witness
        let mut raw = vec![0x02, 0x00, 0x00, 0x00, 0x01];
        raw.extend([0u8; 32]);
        raw.extend([0x00, 0x00, 0x00, 0x00, 0x03, 0xaa, 0xbb, 0xcc, 0xff, 0xff, 0xff, 0xff, 0x01]);
        raw.extend(546u64.to_le_bytes());
        raw.extend([0x02, 0x6a, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let tx = decode_transaction(&raw).unwrap();
        assert_eq!(tx.inputs[0].script_sig, vec![0xaa, 0xbb, 0xcc]);
        assert_eq!(tx.inputs[0].sequence, TransactionInput::SEQUENCE_FINAL);
        assert_eq!(tx.serialize(), raw);
        assert_eq!(tx.id(), cat_hashes::sha256d(&raw));

        // the script sig is committed by the id
        let mut stripped = tx.clone();
        stripped.inputs[0].script_sig.clear();
        assert_ne!(stripped.id(), tx.id());
    }

    #[test]
    fn test_decode_errors() {
        let bytes = tx().serialize();
        for len in 0..bytes.len() {
            assert!(decode_transaction(&bytes[..len]).is_err(), "prefix of length {len} must fail");
        }

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(decode_transaction(&trailing), Err(TxDecodeError::TrailingBytes(1)));

        let mut bad_flag = bytes.clone();
        bad_flag[5] = 0x02;
        assert_eq!(decode_transaction(&bad_flag), Err(TxDecodeError::InvalidSegwitFlag(0x02)));

        let mut no_witness = tx();
        no_witness.inputs[0].witness.clear();
        let mut superfluous = no_witness.serialize();
        superfluous.splice(4..4, [0x00, 0x01]);
        let lock_time_at = superfluous.len() - 4;
        superfluous.splice(lock_time_at..lock_time_at, [0x00, 0x00]);
        assert_eq!(decode_transaction(&superfluous), Err(TxDecodeError::SuperfluousWitness));
    }

    #[test]
    fn test_non_canonical_compact_size() {
        let mut bytes = tx().serialize();
        // replace the one-byte input count (2) by its three-byte form
        bytes.splice(6..7, [0xfd, 0x02, 0x00]);
        assert_eq!(decode_transaction(&bytes), Err(TxDecodeError::NonCanonicalCompactSize));
    }
}

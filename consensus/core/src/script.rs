//!
//! Standard locking scripts, minimal data pushes and a push-only parser.
//!

use crate::{
    errors::ScriptError,
    tx::{OP_0, OP_1, OP_DATA_20, OP_DATA_32, ScriptPublicKey, ScriptVec},
};
use cat_hashes::{Hash160, hash160};
use secp256k1::{PublicKey, XOnlyPublicKey};

pub const OP_RETURN: u8 = 0x6a;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Largest opcode that pushes its own length worth of data.
pub const OP_DATA_75: u8 = 0x4b;

pub fn pay_to_witness_pubkey_hash(hash: Hash160) -> ScriptPublicKey {
    let mut script = ScriptVec::with_capacity(22);
    script.extend_from_slice(&[OP_0, OP_DATA_20]);
    script.extend_from_slice(hash.as_slice());
    ScriptPublicKey::new(script)
}

pub fn pay_to_witness_pubkey(public_key: &PublicKey) -> ScriptPublicKey {
    pay_to_witness_pubkey_hash(hash160(public_key.serialize()))
}

/// P2TR-shaped script committing to a 32-byte program.
pub fn pay_to_taproot_program(program: [u8; 32]) -> ScriptPublicKey {
    let mut script = ScriptVec::with_capacity(34);
    script.extend_from_slice(&[OP_1, OP_DATA_32]);
    script.extend_from_slice(&program);
    ScriptPublicKey::new(script)
}

/// P2TR script for an untweaked x-only key.
pub fn pay_to_taproot_key(public_key: &XOnlyPublicKey) -> ScriptPublicKey {
    pay_to_taproot_program(public_key.serialize())
}

/// Builds scripts out of opcodes and minimally encoded data pushes.
#[derive(Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_op(&mut self, opcode: u8) -> &mut Self {
        self.script.push(opcode);
        self
    }

    /// Appends `data` as a single push using the shortest encoding. Empty data pushes `OP_0`.
    pub fn add_data(&mut self, data: &[u8]) -> &mut Self {
        match data.len() {
            0 => self.script.push(OP_0),
            len if len <= OP_DATA_75 as usize => self.script.push(len as u8),
            len if len <= u8::MAX as usize => self.script.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
            len if len <= u16::MAX as usize => {
                self.script.push(OP_PUSHDATA2);
                self.script.extend_from_slice(&(len as u16).to_le_bytes());
            }
            len => {
                self.script.push(OP_PUSHDATA4);
                self.script.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        self.script.extend_from_slice(data);
        self
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.script)
    }
}

/// An `OP_RETURN` data carrier with the given pushes.
pub fn op_return<'a>(pushes: impl IntoIterator<Item = &'a [u8]>) -> ScriptPublicKey {
    let mut builder = ScriptBuilder::new();
    builder.add_op(OP_RETURN);
    for push in pushes {
        builder.add_data(push);
    }
    ScriptPublicKey::from_vec(builder.drain())
}

/// Splits a push-only script into its data items. `OP_0` yields an empty item.
pub fn parse_pushes(script: &[u8]) -> Result<Vec<&[u8]>, ScriptError> {
    let mut pushes = Vec::new();
    let mut offset = 0;
    while offset < script.len() {
        let opcode = script[offset];
        let (header, len) = match opcode {
            OP_0 => (1, 0),
            1..=OP_DATA_75 => (1, opcode as usize),
            OP_PUSHDATA1 => (2, *script.get(offset + 1).ok_or(ScriptError::TruncatedPush(offset))? as usize),
            OP_PUSHDATA2 => {
                let bytes = script.get(offset + 1..offset + 3).ok_or(ScriptError::TruncatedPush(offset))?;
                (3, u16::from_le_bytes([bytes[0], bytes[1]]) as usize)
            }
            OP_PUSHDATA4 => {
                let bytes = script.get(offset + 1..offset + 5).ok_or(ScriptError::TruncatedPush(offset))?;
                (5, u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
            }
            _ => return Err(ScriptError::NonPushOpcode { opcode, offset }),
        };
        let start = offset + header;
        let data = script.get(start..start + len).ok_or(ScriptError::TruncatedPush(offset))?;
        pushes.push(data);
        offset = start + len;
    }
    Ok(pushes)
}

/// Data items of an `OP_RETURN` script.
pub fn parse_op_return(script: &[u8]) -> Result<Vec<&[u8]>, ScriptError> {
    match script.split_first() {
        Some((&OP_RETURN, rest)) => parse_pushes(rest),
        _ => Err(ScriptError::NotOpReturn),
    }
}

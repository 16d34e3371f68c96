use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
use smallvec::SmallVec;
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

/// Size of the underlying script vector of a script.
pub const SCRIPT_VECTOR_SIZE: usize = 36;

/// Used as the underlying type for script public key data, optimized for the common P2TR script size (34).
pub type ScriptVec = SmallVec<[u8; SCRIPT_VECTOR_SIZE]>;

/// Alias the `smallvec!` macro to ease maintenance
pub use smallvec::smallvec as scriptvec;

pub const OP_0: u8 = 0x00;
pub const OP_1: u8 = 0x51;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_32: u8 = 0x20;

/// Length of a P2WPKH locking script: `OP_0 OP_DATA_20 <hash160>`.
pub const P2WPKH_SCRIPT_LEN: usize = 22;
/// Length of a P2TR-shaped locking script: `OP_1 OP_DATA_32 <program>`.
pub const P2TR_SCRIPT_LEN: usize = 34;

/// A locking script.
#[derive(Default, PartialEq, Eq, Clone, Hash, PartialOrd, Ord)]
pub struct ScriptPublicKey {
    script: ScriptVec, // Kept private to preserve read-only semantics
}

impl ScriptPublicKey {
    pub fn new(script: ScriptVec) -> Self {
        Self { script }
    }

    pub fn from_vec(script: Vec<u8>) -> Self {
        Self { script: ScriptVec::from_vec(script) }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn is_p2wpkh(&self) -> bool {
        self.script.len() == P2WPKH_SCRIPT_LEN && self.script[0] == OP_0 && self.script[1] == OP_DATA_20
    }

    pub fn is_p2tr(&self) -> bool {
        self.script.len() == P2TR_SCRIPT_LEN && self.script[0] == OP_1 && self.script[1] == OP_DATA_32
    }

    pub fn is_op_return(&self) -> bool {
        self.script.first() == Some(&crate::script::OP_RETURN)
    }

    /// The 20-byte key hash of a P2WPKH script.
    pub fn witness_pubkey_hash(&self) -> Option<[u8; 20]> {
        self.is_p2wpkh().then(|| self.script[2..].try_into().ok()).flatten()
    }

    /// The 32-byte witness program of a P2TR-shaped script (a key or a covenant program).
    pub fn taproot_program(&self) -> Option<[u8; 32]> {
        self.is_p2tr().then(|| self.script[2..].try_into().ok()).flatten()
    }

    pub fn to_hex(&self) -> String {
        faster_hex::hex_string(&self.script)
    }
}

impl AsRef<[u8]> for ScriptPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.script
    }
}

impl Debug for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ScriptPublicKey").field(&self.to_hex()).finish()
    }
}

impl Display for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ScriptPublicKey {
    type Err = faster_hex::Error;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        if hex_str.len() % 2 != 0 {
            return Err(faster_hex::Error::InvalidLength(hex_str.len()));
        }
        let mut bytes = vec![0u8; hex_str.len() / 2];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut bytes)?;
        Ok(Self::from_vec(bytes))
    }
}

impl Serialize for ScriptPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() { serializer.serialize_str(&self.to_hex()) } else { serializer.serialize_bytes(&self.script) }
    }
}

impl<'de> Deserialize<'de> for ScriptPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = <std::borrow::Cow<'de, str> as Deserialize>::deserialize(deserializer)?;
            ScriptPublicKey::from_str(&s).map_err(|err| D::Error::custom(format!("invalid script hex: {err}")))
        } else {
            Ok(Self::from_vec(<Vec<u8> as Deserialize>::deserialize(deserializer)?))
        }
    }
}

impl BorshSerialize for ScriptPublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(self.script.as_slice(), writer)
    }
}

impl BorshDeserialize for ScriptPublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self::from_vec(<Vec<u8>>::deserialize_reader(reader)?))
    }
}

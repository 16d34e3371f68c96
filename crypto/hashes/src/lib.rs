mod hashers;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{
    fmt::{Debug, Display, Formatter},
    str::{self, FromStr},
};

pub use hashers::*;

pub const HASH_SIZE: usize = 32;
pub const HASH160_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashParseError {
    InvalidLength { expected: usize, actual: usize },
    InvalidChar,
}

impl Display for HashParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HashParseError::InvalidLength { expected, actual } => {
                write!(f, "invalid hex length: expected {expected} characters, got {actual}")
            }
            HashParseError::InvalidChar => f.write_str("invalid hex character"),
        }
    }
}

impl std::error::Error for HashParseError {}

macro_rules! define_hash {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Clone, Copy, Hash, Default, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
        pub struct $name([u8; $size]);

        impl $name {
            pub const SIZE: usize = $size;

            #[inline(always)]
            pub const fn from_bytes(bytes: [u8; $size]) -> Self {
                $name(bytes)
            }

            #[inline(always)]
            pub const fn as_bytes(&self) -> [u8; $size] {
                self.0
            }

            #[inline(always)]
            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            /// Builds a hash out of a slice, returning `None` if the length does not match.
            pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
                Some($name(<[u8; $size]>::try_from(bytes).ok()?))
            }

            pub fn to_hex(&self) -> String {
                faster_hex::hex_string(&self.0)
            }
        }

        impl AsRef<[u8]> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                $name(bytes)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let mut hex = [0u8; $size * 2];
                faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
                f.write_str(str::from_utf8(&hex).map_err(|_| std::fmt::Error)?)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
                if hash_str.len() != $size * 2 {
                    return Err(HashParseError::InvalidLength { expected: $size * 2, actual: hash_str.len() });
                }
                let mut bytes = [0u8; $size];
                faster_hex::hex_decode(hash_str.as_bytes(), &mut bytes).map_err(|_| HashParseError::InvalidChar)?;
                Ok($name(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = <std::borrow::Cow<'de, str> as Deserialize>::deserialize(deserializer)?;
                    $name::from_str(&s).map_err(de::Error::custom)
                } else {
                    let bytes = <Vec<u8> as Deserialize>::deserialize(deserializer)?;
                    $name::try_from_slice(&bytes).ok_or_else(|| de::Error::invalid_length(bytes.len(), &stringify!($size)))
                }
            }
        }
    };
}

define_hash!(
    /// A 32-byte digest (sha256 family). Transaction ids are displayed in natural byte order.
    Hash,
    HASH_SIZE
);

define_hash!(
    /// A 20-byte digest, `ripemd160(sha256(x))`. Used for state hashes and Merkle nodes.
    Hash160,
    HASH160_SIZE
);

pub const ZERO_HASH: Hash = Hash([0; HASH_SIZE]);
pub const ZERO_HASH160: Hash160 = Hash160([0; HASH160_SIZE]);

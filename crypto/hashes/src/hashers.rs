use crate::{Hash, Hash160};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    type Output;

    fn finalize(self) -> Self::Output;
    fn reset(&mut self);

    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> Self::Output {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Plain single sha256.
#[derive(Clone, Default)]
pub struct Sha256Hash(Sha256);

impl Sha256Hash {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HasherBase for Sha256Hash {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for Sha256Hash {
    type Output = Hash;

    #[inline(always)]
    fn finalize(self) -> Hash {
        Hash::from_bytes(self.0.finalize().into())
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.0 = Sha256::new();
    }
}

/// Double sha256, the transaction id hasher.
#[derive(Clone, Default)]
pub struct TransactionID(Sha256);

impl TransactionID {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HasherBase for TransactionID {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for TransactionID {
    type Output = Hash;

    #[inline(always)]
    fn finalize(self) -> Hash {
        let first = self.0.finalize();
        Hash::from_bytes(Sha256::digest(first).into())
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.0 = Sha256::new();
    }
}

/// `ripemd160(sha256(x))`, used for state hashes and NFT Merkle nodes.
#[derive(Clone, Default)]
pub struct StateHash(Sha256);

impl StateHash {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HasherBase for StateHash {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for StateHash {
    type Output = Hash160;

    #[inline(always)]
    fn finalize(self) -> Hash160 {
        Hash160::from_bytes(Ripemd160::digest(self.0.finalize()).into())
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.0 = Sha256::new();
    }
}

macro_rules! tagged_hasher {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Sha256);

        impl $name {
            pub const TAG: &'static [u8] = $tag;

            #[inline]
            pub fn new() -> Self {
                let tag_hash = Sha256::digest(Self::TAG);
                let mut inner = Sha256::new();
                inner.update(tag_hash);
                inner.update(tag_hash);
                Self(inner)
            }
        }

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                self.0.update(data.as_ref());
                self
            }
        }

        impl Hasher for $name {
            type Output = Hash;

            #[inline(always)]
            fn finalize(self) -> Hash {
                Hash::from_bytes(self.0.finalize().into())
            }

            #[inline(always)]
            fn reset(&mut self) {
                *self = Self::new();
            }
        }
    };
}

tagged_hasher!(
    /// BIP-340 style tagged hash committing a transaction for signing.
    TransactionSigningHash,
    b"CAT/TransactionSigningHash"
);

tagged_hasher!(
    /// Tagged hash turning a covenant descriptor into a locking-script program.
    CovenantProgramHash,
    b"CAT/CovenantProgram"
);

#[inline]
pub fn sha256(data: impl AsRef<[u8]>) -> Hash {
    Sha256Hash::hash(data)
}

#[inline]
pub fn sha256d(data: impl AsRef<[u8]>) -> Hash {
    TransactionID::hash(data)
}

#[inline]
pub fn hash160(data: impl AsRef<[u8]>) -> Hash160 {
    StateHash::hash(data)
}

use cat_hashes::HasherBase;

pub mod sighash;
pub mod sighash_type;
pub mod tx;

/// Writes a CompactSize length prefix into `out`.
pub fn write_compact_size(out: &mut impl HasherBase, len: u64) {
    match len {
        0..=0xfc => {
            out.update([len as u8]);
        }
        0xfd..=0xffff => {
            out.update([0xfd]).update((len as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.update([0xfe]).update((len as u32).to_le_bytes());
        }
        _ => {
            out.update([0xff]).update(len.to_le_bytes());
        }
    }
}

pub fn compact_size_len(len: u64) -> usize {
    match len {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

pub trait HasherExtensions {
    /// Writes the len as a CompactSize integer
    fn write_len(&mut self, len: usize) -> &mut Self;

    /// Writes a boolean as a single byte
    fn write_bool(&mut self, element: bool) -> &mut Self;

    fn write_u8(&mut self, element: u8) -> &mut Self;

    fn write_u32(&mut self, element: u32) -> &mut Self;

    fn write_u64(&mut self, element: u64) -> &mut Self;

    fn write_i32(&mut self, element: i32) -> &mut Self;

    /// Writes the number of bytes followed by the bytes themselves
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self;
}

impl<T: HasherBase> HasherExtensions for T {
    #[inline(always)]
    fn write_len(&mut self, len: usize) -> &mut Self {
        write_compact_size(self, len as u64);
        self
    }

    #[inline(always)]
    fn write_bool(&mut self, element: bool) -> &mut Self {
        self.update(if element { [1u8] } else { [0u8] })
    }

    #[inline(always)]
    fn write_u8(&mut self, element: u8) -> &mut Self {
        self.update(element.to_le_bytes())
    }

    #[inline(always)]
    fn write_u32(&mut self, element: u32) -> &mut Self {
        self.update(element.to_le_bytes())
    }

    #[inline(always)]
    fn write_u64(&mut self, element: u64) -> &mut Self {
        self.update(element.to_le_bytes())
    }

    #[inline(always)]
    fn write_i32(&mut self, element: i32) -> &mut Self {
        self.update(element.to_le_bytes())
    }

    #[inline(always)]
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_len(bytes.len()).update(bytes)
    }
}

/// Collects written data instead of hashing it.
#[derive(Default)]
pub struct PreimageHasher {
    pub buff: Vec<u8>,
}

impl PreimageHasher {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buff: Vec::with_capacity(capacity) }
    }
}

impl HasherBase for PreimageHasher {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.buff.extend_from_slice(data.as_ref());
        self
    }
}

/// Counts written bytes.
#[derive(Default)]
pub(crate) struct LengthCounter(pub usize);

impl HasherBase for LengthCounter {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0 += data.as_ref().len();
        self
    }
}

//! Little-endian integer extraction with bounds checks.
//!
//! Every accessor returns `None` instead of panicking when the requested
//! range runs past the end of the buffer, so decoders can decide per call
//! whether a short read is fatal (header fields) or tolerated (pixel data).

/// Read-only view over a payload with offset-based little-endian accessors.
#[derive(Clone, Copy, Debug)]
pub struct LeBytes<'a> {
    data: &'a [u8],
}

impl<'a> LeBytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Fixed-size window starting at `offset`, if it fits entirely.
    fn array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.data.get(offset..end)?.try_into().ok()
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        self.array(offset).map(u16::from_le_bytes)
    }

    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        self.array(offset).map(u32::from_le_bytes)
    }

    pub fn i32_at(&self, offset: usize) -> Option<i32> {
        self.array(offset).map(i32::from_le_bytes)
    }
}

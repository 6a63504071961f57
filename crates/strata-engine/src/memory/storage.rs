use std::ops::Range;

/// Byte storage backing a [`Region`](super::Region).
///
/// The region owns the block table and decides which bytes move where; the
/// storage only performs the moves.
pub trait RegionStorage {
    /// Total number of addressable bytes.
    fn capacity(&self) -> u64;

    /// Granularity every block size is rounded up to.
    fn alignment(&self) -> u64 {
        1
    }

    /// Writes `bytes` starting at `offset`.
    fn write(&mut self, offset: u64, bytes: &[u8]);

    /// Moves the bytes in `src` so they start at `dst`.
    ///
    /// Source and destination may overlap.
    fn copy_within(&mut self, src: Range<u64>, dst: u64);
}

/// CPU-side storage.
///
/// Mirrors what the GPU buffer would hold, which makes the region fully
/// inspectable from tests.
#[derive(Debug, Clone)]
pub struct HostStorage {
    bytes: Vec<u8>,
}

impl HostStorage {
    pub fn new(capacity: u64) -> Self {
        Self { bytes: vec![0; to_usize(capacity)] }
    }

    /// Returns the raw contents of the whole region.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn read(&self, offset: u64, len: u64) -> &[u8] {
        let start = to_usize(offset);
        &self.bytes[start..start + to_usize(len)]
    }
}

impl RegionStorage for HostStorage {
    #[inline]
    fn capacity(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) {
        let start = to_usize(offset);
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn copy_within(&mut self, src: Range<u64>, dst: u64) {
        // memmove semantics: growing copies from the far end, shrinking from the near end.
        self.bytes
            .copy_within(to_usize(src.start)..to_usize(src.end), to_usize(dst));
    }
}

#[inline]
fn to_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_within_forward_overlap() {
        let mut s = HostStorage::new(8);
        s.write(0, &[1, 2, 3, 4]);
        s.copy_within(0..4, 2);
        assert_eq!(s.read(0, 6), &[1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn copy_within_backward_overlap() {
        let mut s = HostStorage::new(8);
        s.write(2, &[1, 2, 3, 4]);
        s.copy_within(2..6, 0);
        assert_eq!(s.read(0, 4), &[1, 2, 3, 4]);
    }
}

use crate::error::{Error, Result};

use super::storage::{HostStorage, RegionStorage};

/// One contiguous sub-range of a [`Region`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Block {
    /// Byte offset from the start of the region.
    pub offset: u64,
    /// Reserved bytes.
    pub size: u64,
    /// Bytes written by the last upload (`used <= size`).
    pub used: u64,
}

impl Block {
    /// First byte past the reserved range.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Compacting block allocator over a fixed-capacity byte range.
///
/// Invariants, held after every call (including failed ones):
/// - blocks are ordered by ascending offset
/// - `blocks[i].end() == blocks[i + 1].offset` (no gaps, ever)
/// - the first block starts at 0 and the last one ends at or before `capacity`
///
/// Resizing a block costs O(bytes behind it): the tail is moved in the
/// backing storage instead of leaving holes.
#[derive(Debug)]
pub struct Region<S = HostStorage> {
    capacity: u64,
    blocks: Vec<Block>,
    storage: S,
}

impl Region<HostStorage> {
    /// Creates a region backed by a CPU mirror of `capacity` bytes.
    pub fn host(capacity: u64) -> Self {
        Self::new(HostStorage::new(capacity))
    }
}

impl<S: RegionStorage> Region<S> {
    /// Creates an empty region spanning all of `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            capacity: storage.capacity(),
            blocks: Vec::new(),
            storage,
        }
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes reserved by all blocks together (end of the last block).
    #[inline]
    pub fn reserved(&self) -> u64 {
        self.blocks.last().map_or(0, Block::end)
    }

    /// Blocks in offset order, as `(offset, size, used)` descriptors.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Appends a block of `size` bytes right after the current last block.
    ///
    /// Returns the new block's index. On failure nothing is appended.
    pub fn add_block(&mut self, size: u64) -> Result<usize> {
        self.blocks.push(Block {
            offset: self.reserved(),
            size: 0,
            used: 0,
        });
        let index = self.blocks.len() - 1;

        if let Err(err) = self.resize_block(index, size) {
            self.blocks.pop();
            return Err(err);
        }

        log::debug!("region: added block {index} ({size} bytes)");
        Ok(index)
    }

    /// Changes the size of block `index`, shifting every following block.
    ///
    /// `size` is rounded up to the storage alignment. Fails with
    /// [`Error::OutOfMemory`] if the region would overflow; in that case
    /// neither the block table nor the stored bytes change.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn resize_block(&mut self, index: usize, size: u64) -> Result<()> {
        let overflow = Error::OutOfMemory {
            required: u64::MAX,
            capacity: self.capacity,
        };
        let size = size
            .checked_next_multiple_of(self.storage.alignment())
            .ok_or_else(|| overflow.clone())?;
        let block = self.blocks[index];

        if block.size == size {
            return Ok(());
        }

        let reserved = self.reserved();
        let required = (reserved - block.size).checked_add(size).ok_or(overflow)?;
        if required > self.capacity {
            return Err(Error::OutOfMemory {
                required,
                capacity: self.capacity,
            });
        }

        // Move everything behind the block to its new start.
        let tail = block.end()..reserved;
        if !tail.is_empty() {
            self.storage.copy_within(tail, block.offset + size);
        }

        for next in &mut self.blocks[index + 1..] {
            next.offset = next.offset - block.size + size;
        }

        let block = &mut self.blocks[index];
        block.size = size;
        block.used = block.used.min(size);

        debug_assert!(self.is_compact(), "region lost compaction after resize");
        Ok(())
    }

    /// Releases block `index`; following blocks move down to close the gap
    /// and their indices decrease by one.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove_block(&mut self, index: usize) -> Result<()> {
        self.resize_block(index, 0)?;
        self.blocks.remove(index);
        log::debug!("region: removed block {index}");
        Ok(())
    }

    /// Replaces the contents of block `index` with `bytes` and records
    /// `used = bytes.len()`.
    ///
    /// An empty slice only resets `used`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn upload(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        let block = self.blocks[index];
        let len = bytes.len() as u64;
        if len > block.size {
            return Err(Error::OutOfMemory {
                required: len,
                capacity: block.size,
            });
        }

        if len > 0 {
            self.storage.write(block.offset, bytes);
        }
        self.blocks[index].used = len;
        Ok(())
    }

    fn is_compact(&self) -> bool {
        let mut expected = 0;
        for block in &self.blocks {
            if block.offset != expected || block.used > block.size {
                return false;
            }
            expected = block.end();
        }
        expected <= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(region: &Region) -> Vec<(u64, u64)> {
        region.blocks().iter().map(|b| (b.offset, b.size)).collect()
    }

    // ── add / resize / remove ─────────────────────────────────────────────

    #[test]
    fn end_to_end_scenario() {
        let mut region = Region::host(300);

        assert_eq!(region.add_block(100).unwrap(), 0);
        assert_eq!(triples(&region), [(0, 100)]);

        assert_eq!(region.add_block(50).unwrap(), 1);
        assert_eq!(triples(&region), [(0, 100), (100, 50)]);

        region.resize_block(0, 150).unwrap();
        assert_eq!(triples(&region), [(0, 150), (150, 50)]);

        region.remove_block(0).unwrap();
        assert_eq!(triples(&region), [(0, 50)]);
    }

    #[test]
    fn add_block_appends_after_last() {
        let mut region = Region::host(64);
        region.add_block(10).unwrap();
        region.add_block(0).unwrap();
        region.add_block(7).unwrap();
        assert_eq!(triples(&region), [(0, 10), (10, 0), (10, 7)]);
        assert_eq!(region.reserved(), 17);
    }

    #[test]
    fn shrinking_moves_tail_bytes_down() {
        let mut region = Region::host(32);
        region.add_block(8).unwrap();
        region.add_block(4).unwrap();
        region.upload(1, &[9, 8, 7, 6]).unwrap();

        region.resize_block(0, 2).unwrap();

        assert_eq!(region.block(1).unwrap().offset, 2);
        assert_eq!(region.storage().read(2, 4), &[9, 8, 7, 6]);
    }

    #[test]
    fn growing_moves_tail_bytes_up() {
        let mut region = Region::host(32);
        region.add_block(2).unwrap();
        region.add_block(4).unwrap();
        region.add_block(3).unwrap();
        region.upload(1, &[1, 2, 3, 4]).unwrap();
        region.upload(2, &[5, 6, 7]).unwrap();

        region.resize_block(0, 10).unwrap();

        assert_eq!(triples(&region), [(0, 10), (10, 4), (14, 3)]);
        assert_eq!(region.storage().read(10, 7), &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn remove_middle_block_compacts() {
        let mut region = Region::host(32);
        region.add_block(4).unwrap();
        region.add_block(4).unwrap();
        region.add_block(4).unwrap();
        region.upload(2, &[1, 1, 1, 1]).unwrap();

        region.remove_block(1).unwrap();

        assert_eq!(triples(&region), [(0, 4), (4, 4)]);
        assert_eq!(region.storage().read(4, 4), &[1, 1, 1, 1]);
        assert_eq!(region.block(1).unwrap().used, 4);
    }

    #[test]
    fn shrinking_below_used_clamps_used() {
        let mut region = Region::host(16);
        region.add_block(8).unwrap();
        region.upload(0, &[0; 6]).unwrap();
        region.resize_block(0, 4).unwrap();
        assert_eq!(region.block(0).unwrap().used, 4);
    }

    // ── failure atomicity ─────────────────────────────────────────────────

    #[test]
    fn resize_past_capacity_leaves_state_untouched() {
        let mut region = Region::host(300);
        region.add_block(100).unwrap();
        region.add_block(50).unwrap();
        region.upload(1, &[3; 50]).unwrap();

        let blocks_before = region.blocks().to_vec();
        let bytes_before = region.storage().bytes().to_vec();

        let err = region.resize_block(0, 251).unwrap_err();
        assert_eq!(err, Error::OutOfMemory { required: 301, capacity: 300 });

        assert_eq!(region.blocks(), blocks_before.as_slice());
        assert_eq!(region.storage().bytes(), bytes_before.as_slice());
    }

    #[test]
    fn failed_add_block_appends_nothing() {
        let mut region = Region::host(10);
        region.add_block(8).unwrap();
        assert!(matches!(region.add_block(3), Err(Error::OutOfMemory { .. })));
        assert_eq!(region.len(), 1);
    }

    #[test]
    fn huge_request_fails_without_overflowing() {
        let mut region = Region::host(300);
        region.add_block(100).unwrap();
        region.upload(0, &[7; 100]).unwrap();

        let err = region.add_block(u64::MAX).unwrap_err();
        assert_eq!(err, Error::OutOfMemory { required: u64::MAX, capacity: 300 });
        assert_eq!(triples(&region), [(0, 100)]);
        assert_eq!(&region.storage().bytes()[..100], &[7; 100]);

        region.add_block(50).unwrap();
        assert!(region.resize_block(0, u64::MAX).is_err());
        assert_eq!(triples(&region), [(0, 100), (100, 50)]);
    }

    #[test]
    fn exact_fit_is_allowed() {
        let mut region = Region::host(10);
        region.add_block(4).unwrap();
        region.add_block(6).unwrap();
        assert_eq!(region.reserved(), region.capacity());
    }

    #[test]
    fn upload_larger_than_block_fails() {
        let mut region = Region::host(10);
        region.add_block(2).unwrap();
        assert!(region.upload(0, &[0; 3]).is_err());
        assert_eq!(region.block(0).unwrap().used, 0);
    }

    // ── invariants under a long sequence ──────────────────────────────────

    #[test]
    fn random_walk_stays_compact() {
        let mut region = Region::host(4096);
        // Small deterministic LCG so the sequence is reproducible.
        let mut seed: u64 = 0x2545_f491;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            seed >> 33
        };

        for _ in 0..500 {
            match next() % 3 {
                0 => {
                    let _ = region.add_block(next() % 200);
                }
                1 if !region.is_empty() => {
                    let i = (next() as usize) % region.len();
                    let _ = region.resize_block(i, next() % 400);
                }
                _ if !region.is_empty() => {
                    let i = (next() as usize) % region.len();
                    region.remove_block(i).unwrap();
                }
                _ => {}
            }

            let total: u64 = region.blocks().iter().map(|b| b.size).sum();
            assert_eq!(total, region.reserved());
            assert!(region.reserved() <= region.capacity());
            assert!(region.is_compact());
        }
    }

    // ── alignment ─────────────────────────────────────────────────────────

    struct Aligned(HostStorage);

    impl RegionStorage for Aligned {
        fn capacity(&self) -> u64 {
            self.0.capacity()
        }
        fn alignment(&self) -> u64 {
            4
        }
        fn write(&mut self, offset: u64, bytes: &[u8]) {
            self.0.write(offset, bytes);
        }
        fn copy_within(&mut self, src: std::ops::Range<u64>, dst: u64) {
            self.0.copy_within(src, dst);
        }
    }

    #[test]
    fn sizes_round_up_to_storage_alignment() {
        let mut region = Region::new(Aligned(HostStorage::new(64)));
        region.add_block(5).unwrap();
        region.add_block(1).unwrap();
        let sizes: Vec<_> = region.blocks().iter().map(|b| (b.offset, b.size)).collect();
        assert_eq!(sizes, [(0, 8), (8, 4)]);
    }

    #[test]
    fn rounding_a_huge_size_up_fails_cleanly() {
        let mut region = Region::new(Aligned(HostStorage::new(64)));
        region.add_block(4).unwrap();
        let err = region.add_block(u64::MAX - 1).unwrap_err();
        assert_eq!(err, Error::OutOfMemory { required: u64::MAX, capacity: 64 });
        assert_eq!(region.len(), 1);
    }
}

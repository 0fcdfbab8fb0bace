use core::ops::Range;

use sfs_disk::{Geometry, Layout};

use crate::types::BlockId;

/// One bit per device block, bit `i` in byte `i / 8` at mask `1 << (i % 8)`.
/// A set bit means the block is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    blocks: u32,
}

impl Bitmap {
    /// Bitmap of a freshly formatted device: only the data region is free.
    pub fn fresh(geometry: &Geometry, layout: &Layout) -> Self {
        let mut bitmap = Self {
            bytes: vec![0xFF; geometry.bitmap_bytes() as usize],
            blocks: geometry.block_count,
        };
        for block in (0..layout.data.start).chain(layout.bitmap.blocks()) {
            bitmap.occupy(BlockId::new(block));
        }
        bitmap
    }

    /// Takes the leading bytes of a persisted bitmap region.
    pub fn from_bytes(region: &[u8], blocks: u32) -> Self {
        let len = (blocks as usize).div_ceil(8).min(region.len());
        Self {
            bytes: region[..len].to_vec(),
            blocks,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn locate(&self, block: BlockId) -> Option<(usize, u8)> {
        let id = block.val();
        if id >= self.blocks {
            return None;
        }
        let byte = (id / 8) as usize;
        (byte < self.bytes.len()).then_some((byte, 1 << (id % 8)))
    }

    /// Blocks outside the device read as occupied.
    pub fn is_free(&self, block: BlockId) -> bool {
        self.locate(block)
            .is_some_and(|(byte, mask)| self.bytes[byte] & mask != 0)
    }

    pub fn occupy(&mut self, block: BlockId) {
        if let Some((byte, mask)) = self.locate(block) {
            self.bytes[byte] &= !mask;
        }
    }

    pub fn free(&mut self, block: BlockId) {
        if let Some((byte, mask)) = self.locate(block) {
            self.bytes[byte] |= mask;
        }
    }

    /// Lowest free block within `range`.
    pub fn first_free_in(&self, range: Range<u32>) -> Option<BlockId> {
        range.map(BlockId::new).find(|&block| self.is_free(block))
    }

    pub fn count_free_in(&self, range: Range<u32>) -> usize {
        range
            .map(BlockId::new)
            .filter(|&block| self.is_free(block))
            .count()
    }
}

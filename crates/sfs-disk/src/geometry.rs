//! Device geometry and the region layout derived from it.
//!
//! ```text
//! | 0: superblock | inode table | directory | data ... | bitmap |
//! ```
//!
//! Every boundary is a pure function of the three geometry numbers, so a
//! reload recomputes the same layout that format time wrote.

use core::ops::Range;

use crate::error::FormatError;
use crate::{
    DiskDirEntry, DiskInode, Record, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE, DEFAULT_INODE_COUNT,
    INODE_DIRECT_POINTERS, POINTER_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub block_size: u32,
    pub block_count: u32,
    pub inode_count: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_COUNT, DEFAULT_INODE_COUNT)
    }
}

impl Geometry {
    pub const MIN_BLOCK_SIZE: u32 = 64;

    pub const fn new(block_size: u32, block_count: u32, inode_count: u32) -> Self {
        Self {
            block_size,
            block_count,
            inode_count,
        }
    }

    /// Number of directory entries; also the number of open-file handles.
    pub fn directory_capacity(&self) -> u32 {
        self.inode_count.saturating_sub(1)
    }

    /// Pointers held by one indirect block.
    pub fn indirect_capacity(&self) -> usize {
        self.block_size as usize / POINTER_SIZE
    }

    pub fn max_file_blocks(&self) -> usize {
        INODE_DIRECT_POINTERS + self.indirect_capacity()
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_blocks() as u64 * self.block_size as u64
    }

    pub fn device_bytes(&self) -> u64 {
        self.block_count as u64 * self.block_size as u64
    }

    pub fn bitmap_bytes(&self) -> u64 {
        (self.block_count as u64).div_ceil(8)
    }

    /// Blocks needed to hold `bytes`.
    pub fn blocks_for(&self, bytes: u64) -> u32 {
        bytes.div_ceil(self.block_size as u64) as u32
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.block_size < Self::MIN_BLOCK_SIZE {
            return Err(FormatError::InvalidGeometry(format!(
                "block size {} is below the minimum of {}",
                self.block_size,
                Self::MIN_BLOCK_SIZE
            )));
        }
        if self.block_size as usize % POINTER_SIZE != 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "block size {} is not a multiple of {POINTER_SIZE}",
                self.block_size
            )));
        }
        if self.inode_count < 2 {
            return Err(FormatError::InvalidGeometry(
                "at least two inodes are required".into(),
            ));
        }
        // Sizes and pointers are stored as i32 on disk.
        let limit = i32::MAX as u64;
        if self.block_count as u64 > limit
            || self.inode_count as u64 > limit
            || self.max_file_size() > limit
        {
            return Err(FormatError::InvalidGeometry(
                "geometry exceeds the on-disk 32-bit fields".into(),
            ));
        }
        Ok(())
    }
}

/// A contiguous run of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub start: u32,
    pub len: u32,
}

impl Region {
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> u32 {
        self.start + self.len
    }

    pub fn contains(&self, block: u32) -> bool {
        self.blocks().contains(&block)
    }

    pub fn blocks(&self) -> Range<u32> {
        self.start..self.end()
    }

    pub fn bytes(&self, block_size: u32) -> usize {
        self.len as usize * block_size as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    pub inode_table: Region,
    pub directory: Region,
    pub data: Region,
    pub bitmap: Region,
}

impl Layout {
    pub const SUPERBLOCK: u32 = 0;

    pub fn compute(geometry: &Geometry) -> Result<Self, FormatError> {
        geometry.validate()?;

        let inode_bytes = geometry.inode_count as u64 * DiskInode::SIZE as u64;
        let directory_bytes = geometry.directory_capacity() as u64 * DiskDirEntry::SIZE as u64;

        let inode_table = Region::new(Self::SUPERBLOCK + 1, geometry.blocks_for(inode_bytes));
        let directory = Region::new(inode_table.end(), geometry.blocks_for(directory_bytes));
        let bitmap_len = geometry.blocks_for(geometry.bitmap_bytes());

        let data_start = directory.end() as u64;
        let needed = data_start + 1 + bitmap_len as u64;
        if needed > geometry.block_count as u64 {
            return Err(FormatError::DeviceTooSmall {
                needed,
                available: geometry.block_count,
            });
        }

        let bitmap = Region::new(geometry.block_count - bitmap_len, bitmap_len);
        let data = Region::new(directory.end(), bitmap.start - directory.end());

        Ok(Self {
            inode_table,
            directory,
            data,
            bitmap,
        })
    }
}

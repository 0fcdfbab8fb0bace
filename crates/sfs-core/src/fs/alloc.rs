use log::debug;

use super::{corrupt, FileSystem};
use crate::device::BlockDevice;
use crate::error::FsError;
use crate::types::BlockId;

impl<D: BlockDevice> FileSystem<D> {
    /// Reserves the lowest free data block and persists the bitmap.
    pub(crate) fn find_and_reserve_block(&mut self) -> Result<BlockId, FsError> {
        let block = self
            .bitmap
            .first_free_in(self.layout().data.blocks())
            .ok_or(FsError::NoFreeBlock)?;
        self.bitmap.occupy(block);
        self.store.flush_bitmap(&self.bitmap)?;
        debug!("Reserved block {}", block);
        Ok(block)
    }

    pub(crate) fn release_block(&mut self, block: BlockId) -> Result<(), FsError> {
        self.check_releasable(block)?;
        self.bitmap.free(block);
        self.store.flush_bitmap(&self.bitmap)?;
        debug!("Released block {}", block);
        Ok(())
    }

    /// Only occupied data blocks may go back to the allocator.
    pub(crate) fn check_releasable(&self, block: BlockId) -> Result<(), FsError> {
        if !self.layout().data.contains(block.val()) {
            return Err(corrupt(format!("refusing to release metadata block {block}")));
        }
        if self.bitmap.is_free(block) {
            return Err(corrupt(format!("block {block} is already free")));
        }
        Ok(())
    }

    /// Free blocks left in the data region.
    pub fn free_blocks(&self) -> usize {
        self.bitmap.count_free_in(self.layout().data.blocks())
    }
}

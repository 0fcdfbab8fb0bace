//! Byte offset to block translation over the two pointer tiers.
//!
//! Block index `i` of a file lives in `direct[i]` for `i < 12`, and in slot
//! `i - 12` of the indirect block otherwise.

use log::debug;
use sfs_disk::INODE_DIRECT_POINTERS;

use super::FileSystem;
use crate::device::BlockDevice;
use crate::error::FsError;
use crate::types::{BlockId, InodeId};

impl<D: BlockDevice> FileSystem<D> {
    /// The block holding byte `offset` and the position within it.
    pub(crate) fn resolve(
        &mut self,
        id: InodeId,
        offset: u32,
    ) -> Result<(BlockId, usize), FsError> {
        let size = self.inode(id)?.size;
        if offset >= size {
            return Err(FsError::OutOfRange { offset, size });
        }
        let block_size = self.block_size();
        let block = self.block_at(id, offset as usize / block_size)?;
        Ok((block, offset as usize % block_size))
    }

    /// Block number `index` of the file. Reads the indirect block when
    /// `index` is past the direct pointers.
    pub(crate) fn block_at(&mut self, id: InodeId, index: usize) -> Result<BlockId, FsError> {
        let block_size = self.block_size();
        let inode = self.inode(id)?;
        if index >= inode.blocks_in_use(block_size) {
            return Err(FsError::OutOfRange {
                offset: (index * block_size) as u32,
                size: inode.size,
            });
        }
        let missing = || FsError::MissingBlock { inode: id, index };

        if index < INODE_DIRECT_POINTERS {
            return inode.direct[index].ok_or_else(missing);
        }
        let indirect = inode.indirect.ok_or_else(missing)?;
        self.store
            .read_pointers(indirect)?
            .get(index - INODE_DIRECT_POINTERS)
            .copied()
            .ok_or_else(missing)
    }

    /// Appends one block to the file and persists the inode table. The
    /// indirect block is allocated the first time the direct pointers run
    /// out.
    pub(crate) fn grow(&mut self, id: InodeId) -> Result<BlockId, FsError> {
        let inode = self.inode(id)?.clone();

        if let Some(slot) = inode.direct.iter().position(Option::is_none) {
            let block = self.find_and_reserve_block()?;
            self.inode_mut(id)?.direct[slot] = Some(block);
            self.store.flush_inodes(&self.inodes)?;
            debug!("Inode {}: block {} in direct slot {}", id, block, slot);
            return Ok(block);
        }

        let mut table = match inode.indirect {
            Some(indirect) => self.store.read_pointers(indirect)?,
            None => Vec::new(),
        };
        if table.len() >= self.geometry().indirect_capacity() {
            return Err(FsError::FileTooLarge(id, self.geometry().max_file_blocks()));
        }

        let block = self.find_and_reserve_block()?;
        let indirect = match inode.indirect {
            Some(indirect) => indirect,
            None => match self.find_and_reserve_block() {
                Ok(indirect) => {
                    debug!("Inode {}: indirect block {}", id, indirect);
                    indirect
                }
                Err(err) => {
                    self.release_block(block)?;
                    return Err(err);
                }
            },
        };

        table.push(block);
        self.store.write_pointers(indirect, &table)?;
        self.inode_mut(id)?.indirect = Some(indirect);
        self.store.flush_inodes(&self.inodes)?;
        debug!(
            "Inode {}: block {} in indirect slot {}",
            id,
            block,
            table.len() - 1
        );
        Ok(block)
    }

    /// Releases every block the inode owns and frees the inode.
    pub(crate) fn reset(&mut self, id: InodeId) -> Result<(), FsError> {
        let inode = self.inode(id)?.clone();

        let mut owned: Vec<BlockId> = inode.direct.iter().flatten().copied().collect();
        if let Some(indirect) = inode.indirect {
            owned.extend(self.store.read_pointers(indirect)?);
            owned.push(indirect);
        }
        for &block in &owned {
            self.check_releasable(block)?;
        }

        for &block in &owned {
            self.bitmap.free(block);
        }
        self.inodes.take(id.index());
        self.store.flush_bitmap(&self.bitmap)?;
        self.store.flush_inodes(&self.inodes)?;

        debug!("Inode {} freed with {} blocks", id, owned.len());
        Ok(())
    }
}

//! The file-system facade.
//!
//! A [`FileSystem`] owns the device together with cached copies of every
//! metadata table. Each call that changes a table writes it back before it
//! returns.

use std::collections::HashSet;

use log::{error, info, warn};
use sfs_disk::{Geometry, Layout, INODE_DIRECT_POINTERS};

use crate::bitmap::Bitmap;
use crate::device::BlockDevice;
use crate::directory::Directory;
use crate::error::FsError;
use crate::handle::HandleTable;
use crate::inode::{Inode, InodeTable};
use crate::store::Store;
use crate::types::{BlockId, InodeId};

mod addressing;
mod alloc;
mod file;

/// What [`FileSystem::stat`] reports about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub inode: InodeId,
    pub size: u32,
    /// Data blocks in use, not counting the indirect block.
    pub blocks: usize,
    pub indirect: bool,
}

pub struct FileSystem<D: BlockDevice> {
    store: Store<D>,
    inodes: InodeTable,
    directory: Directory,
    bitmap: Bitmap,
    handles: HandleTable,
    /// Position of [`FileSystem::list_next`] among the live entries.
    list_cursor: usize,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Formats `device` when `fresh` is set, otherwise mounts what it holds.
    pub fn initialize(device: D, geometry: Geometry, fresh: bool) -> Result<Self, FsError> {
        if fresh {
            Self::format(device, geometry)
        } else {
            Self::mount(device, geometry)
        }
    }

    /// Writes an empty file system over the whole device.
    pub fn format(device: D, geometry: Geometry) -> Result<Self, FsError> {
        let mut store = Store::new(device, geometry)?;
        let layout = *store.layout();

        let inodes = InodeTable::with_capacity(geometry.inode_count as usize);
        let directory = Directory::with_capacity(geometry.directory_capacity() as usize);
        let bitmap = Bitmap::fresh(&geometry, &layout);

        store.write_superblock()?;
        store.flush_inodes(&inodes)?;
        store.flush_directory(&directory)?;
        store.flush_bitmap(&bitmap)?;

        info!(
            "Formatted {} blocks of {} bytes: {} inodes, data blocks {}..{}",
            geometry.block_count,
            geometry.block_size,
            geometry.inode_count,
            layout.data.start,
            layout.data.end()
        );

        Ok(Self::assemble(store, inodes, directory, bitmap))
    }

    /// Loads a previously formatted device and checks it for consistency.
    pub fn mount(device: D, geometry: Geometry) -> Result<Self, FsError> {
        let mut store = Store::new(device, geometry)?;

        let superblock = store.load_superblock()?;
        if let Err(err) = superblock.check(&geometry, store.layout()) {
            error!("Superblock rejected: {}", err);
            return Err(err.into());
        }

        let inodes = store.load_inodes()?;
        let directory = store.load_directory()?;
        let bitmap = store.load_bitmap()?;

        let mut fs = Self::assemble(store, inodes, directory, bitmap);
        fs.check_consistency()?;

        info!(
            "Mounted file system: {} files, {} of {} data blocks free",
            fs.directory.count(),
            fs.free_blocks(),
            fs.layout().data.len
        );
        Ok(fs)
    }

    fn assemble(store: Store<D>, inodes: InodeTable, directory: Directory, bitmap: Bitmap) -> Self {
        let handles = HandleTable::with_capacity(store.geometry().directory_capacity() as usize);
        Self {
            store,
            inodes,
            directory,
            bitmap,
            handles,
            list_cursor: 0,
        }
    }

    fn check_consistency(&mut self) -> Result<(), FsError> {
        let layout = *self.layout();
        let max_blocks = self.geometry().max_file_blocks();
        let block_size = self.block_size();

        for block in (0..layout.data.start).chain(layout.bitmap.blocks()) {
            if self.bitmap.is_free(BlockId::new(block)) {
                return Err(corrupt(format!("metadata block {block} is marked free")));
            }
        }

        let mut names = HashSet::new();
        let mut referenced = HashSet::new();
        for entry in self.directory.iter() {
            if !names.insert(entry.name.as_str()) {
                return Err(corrupt(format!("name {} appears twice", entry.name)));
            }
            if self.inodes.get(entry.inode.index()).is_none() {
                return Err(corrupt(format!(
                    "{} refers to free or missing inode {}",
                    entry.name, entry.inode
                )));
            }
            referenced.insert(entry.inode);
        }

        let live: Vec<(InodeId, Inode)> = self
            .inodes
            .iter()
            .map(|(index, inode)| (InodeId::new(index as u32), inode.clone()))
            .collect();

        let mut owned = HashSet::new();
        for (id, inode) in live {
            if !referenced.contains(&id) {
                warn!("Inode {} is allocated but has no directory entry", id);
            }
            let in_use = inode.blocks_in_use(block_size);
            if in_use > max_blocks {
                return Err(corrupt(format!(
                    "inode {} claims {} bytes, beyond the largest file",
                    id, inode.size
                )));
            }

            let mut indirect_ptrs = Vec::new();
            if let Some(indirect) = inode.indirect {
                self.check_owned(id, indirect, &mut owned)?;
                indirect_ptrs = self.store.read_pointers(indirect)?;
            }
            for &block in inode.direct.iter().flatten().chain(&indirect_ptrs) {
                self.check_owned(id, block, &mut owned)?;
            }

            let direct_needed = in_use.min(INODE_DIRECT_POINTERS);
            let hole = match inode.direct[..direct_needed].iter().position(Option::is_none) {
                Some(index) => Some(index),
                None if in_use > INODE_DIRECT_POINTERS + indirect_ptrs.len() => {
                    Some(INODE_DIRECT_POINTERS + indirect_ptrs.len())
                }
                None => None,
            };
            if let Some(index) = hole {
                error!("Inode {} has no block at index {}", id, index);
                return Err(FsError::MissingBlock { inode: id, index });
            }
        }

        let occupied = layout.data.len as usize - self.free_blocks();
        if occupied != owned.len() {
            warn!(
                "{} data blocks are marked in use but {} are owned by inodes",
                occupied,
                owned.len()
            );
        }
        Ok(())
    }

    /// Each data block belongs to at most one inode, once.
    fn check_owned(
        &self,
        id: InodeId,
        block: BlockId,
        owned: &mut HashSet<BlockId>,
    ) -> Result<(), FsError> {
        if !self.layout().data.contains(block.val()) {
            return Err(corrupt(format!(
                "inode {} points at block {} outside the data region",
                id, block
            )));
        }
        if self.bitmap.is_free(block) {
            return Err(corrupt(format!(
                "inode {} owns block {} which is marked free",
                id, block
            )));
        }
        if !owned.insert(block) {
            return Err(corrupt(format!(
                "inode {} points at block {} which is already owned",
                id, block
            )));
        }
        Ok(())
    }

    pub fn geometry(&self) -> &Geometry {
        self.store.geometry()
    }

    pub fn layout(&self) -> &Layout {
        self.store.layout()
    }

    pub fn device(&self) -> &D {
        self.store.device()
    }

    /// Hands the device back. Every table is already on it.
    pub fn into_device(self) -> D {
        self.store.into_device()
    }

    fn block_size(&self) -> usize {
        self.store.block_size()
    }

    pub fn stat(&self, name: &str) -> Result<FileStat, FsError> {
        let (_, entry) = self
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let inode = self.inode(entry.inode)?;
        Ok(FileStat {
            inode: entry.inode,
            size: inode.size,
            blocks: inode.blocks_in_use(self.block_size()),
            indirect: inode.indirect.is_some(),
        })
    }

    /// Names of all files, in directory slot order.
    pub fn files(&self) -> Vec<String> {
        self.directory
            .iter()
            .map(|entry| entry.name.to_string())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.handles.open_count()
    }

    fn inode(&self, id: InodeId) -> Result<&Inode, FsError> {
        self.inodes.get(id.index()).ok_or(FsError::StaleInode(id))
    }

    fn inode_mut(&mut self, id: InodeId) -> Result<&mut Inode, FsError> {
        self.inodes
            .get_mut(id.index())
            .ok_or(FsError::StaleInode(id))
    }
}

fn corrupt(msg: String) -> FsError {
    error!("Consistency check failed: {}", msg);
    FsError::Corrupt(msg)
}

#[cfg(test)]
mod tests;

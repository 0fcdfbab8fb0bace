use sfs_disk::{ptr_from_raw, ptr_to_raw, DiskInode, Mode, INODE_DIRECT_POINTERS};

use crate::slots::SlotTable;
use crate::types::BlockId;

/// A live inode. Free inodes are empty slots of the [`InodeTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub mode: Mode,
    pub link_count: i32,
    pub uid: i32,
    pub gid: i32,
    pub size: u32,
    pub direct: [Option<BlockId>; INODE_DIRECT_POINTERS],
    pub indirect: Option<BlockId>,
}

pub type InodeTable = SlotTable<Inode>;

impl Inode {
    /// An empty file with one directory link.
    pub fn new() -> Self {
        Self {
            mode: Mode::DEFAULT,
            link_count: 1,
            uid: sfs_disk::SENTINEL,
            gid: sfs_disk::SENTINEL,
            size: 0,
            direct: [None; INODE_DIRECT_POINTERS],
            indirect: None,
        }
    }

    /// Blocks logically in use, `ceil(size / block_size)`.
    pub fn blocks_in_use(&self, block_size: usize) -> usize {
        (self.size as usize).div_ceil(block_size)
    }

    /// `None` for a free record.
    pub fn from_disk(raw: &DiskInode) -> Option<Self> {
        if raw.is_free() {
            return None;
        }
        let ptr = |raw: i32| ptr_from_raw(raw).map(BlockId::new);
        Some(Self {
            mode: Mode::from_raw(raw.mode),
            link_count: raw.link_count,
            uid: raw.uid,
            gid: raw.gid,
            size: raw.size as u32,
            direct: raw.direct_ptrs.map(ptr),
            indirect: ptr(raw.indirect_ptr),
        })
    }

    pub fn to_disk(&self) -> DiskInode {
        let raw = |ptr: Option<BlockId>| ptr_to_raw(ptr.map(|b| b.val()));
        DiskInode {
            mode: self.mode.to_raw(),
            link_count: self.link_count,
            uid: self.uid,
            gid: self.gid,
            size: self.size as i32,
            direct_ptrs: self.direct.map(raw),
            indirect_ptr: raw(self.indirect),
        }
    }
}

impl Default for Inode {
    fn default() -> Self {
        Self::new()
    }
}

pub fn table_from_disk(records: &[DiskInode]) -> InodeTable {
    SlotTable::from_slots(records.iter().map(Inode::from_disk).collect())
}

pub fn table_to_disk(table: &InodeTable) -> Vec<DiskInode> {
    table
        .slots()
        .iter()
        .map(|slot| slot.as_ref().map_or_else(DiskInode::free, Inode::to_disk))
        .collect()
}

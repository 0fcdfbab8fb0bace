use crate::error::FsError;
use crate::slots::SlotTable;
use crate::types::{Handle, InodeId};

/// One open instance of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inode: InodeId,
    /// Byte offset of the next read or write, within `[0, size]`.
    pub cursor: u32,
}

/// In-memory table of open files. Starts empty on every mount.
#[derive(Debug, Clone)]
pub struct HandleTable {
    files: SlotTable<OpenFile>,
}

impl HandleTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            files: SlotTable::with_capacity(capacity),
        }
    }

    pub fn find_by_inode(&self, inode: InodeId) -> Option<Handle> {
        self.files
            .position(|file| file.inode == inode)
            .map(|index| Handle::new(index as u32))
    }

    /// `None` when every handle is in use.
    pub fn open(&mut self, inode: InodeId, cursor: u32) -> Option<Handle> {
        self.files
            .insert(OpenFile { inode, cursor })
            .map(|index| Handle::new(index as u32))
    }

    pub fn close(&mut self, handle: Handle) -> Result<OpenFile, FsError> {
        self.check(handle)?;
        self.files.take(handle.index()).ok_or(FsError::Closed(handle))
    }

    pub fn get(&self, handle: Handle) -> Result<&OpenFile, FsError> {
        self.check(handle)?;
        self.files.get(handle.index()).ok_or(FsError::Closed(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut OpenFile, FsError> {
        self.check(handle)?;
        self.files
            .get_mut(handle.index())
            .ok_or(FsError::Closed(handle))
    }

    /// Closes every handle on `inode`; returns how many were open.
    pub fn close_all_for(&mut self, inode: InodeId) -> usize {
        let mut closed = 0;
        while let Some(index) = self.files.position(|file| file.inode == inode) {
            self.files.take(index);
            closed += 1;
        }
        closed
    }

    pub fn is_full(&self) -> bool {
        self.files.is_full()
    }

    pub fn open_count(&self) -> usize {
        self.files.len()
    }

    fn check(&self, handle: Handle) -> Result<(), FsError> {
        if handle.index() >= self.files.capacity() {
            return Err(FsError::BadHandle(handle));
        }
        Ok(())
    }
}

use log::{debug, warn};

use super::FileSystem;
use crate::device::BlockDevice;
use crate::directory::{DirEntry, FileName};
use crate::error::{ErrorKind, FsError};
use crate::handle::OpenFile;
use crate::inode::Inode;
use crate::types::{Handle, InodeId};

impl<D: BlockDevice> FileSystem<D> {
    /// Opens `name`, creating it when absent.
    ///
    /// A new file opens at offset 0 and an existing one at its end. Opening a
    /// file that is already open returns the handle it already has.
    pub fn open(&mut self, name: &str) -> Result<Handle, FsError> {
        if let Some(id) = self.directory.lookup(name).map(|(_, entry)| entry.inode) {
            if let Some(handle) = self.handles.find_by_inode(id) {
                return Ok(handle);
            }
            let size = self.inode(id)?.size;
            let handle = self.handles.open(id, size).ok_or(FsError::NoFreeHandle)?;
            debug!("Opened {} as {} at offset {}", name, handle, size);
            return Ok(handle);
        }

        let name = FileName::parse(name)?;
        if self.handles.is_full() {
            return Err(FsError::NoFreeHandle);
        }
        let slot = self
            .directory
            .first_free_slot()
            .ok_or(FsError::DirectoryFull)?;
        let index = self.inodes.first_free().ok_or(FsError::NoFreeInode)?;

        let id = InodeId::new(index as u32);
        self.inodes.put(index, Inode::new());
        self.directory.insert_at(
            slot,
            DirEntry {
                name: name.clone(),
                inode: id,
            },
        );
        self.store.flush_inodes(&self.inodes)?;
        self.store.flush_directory(&self.directory)?;

        let handle = self.handles.open(id, 0).ok_or(FsError::NoFreeHandle)?;
        debug!("Created {} with inode {} as {}", name, id, handle);
        Ok(handle)
    }

    pub fn close(&mut self, handle: Handle) -> Result<(), FsError> {
        let file = self.handles.close(handle)?;
        debug!("Closed {} on inode {}", handle, file.inode);
        Ok(())
    }

    /// Writes `data` at the handle's cursor and advances it.
    ///
    /// If the device or the file's block capacity runs out part way, the
    /// bytes already written are kept and their count is returned. Only a
    /// write that stores nothing reports the error.
    pub fn write(&mut self, handle: Handle, data: &[u8]) -> Result<usize, FsError> {
        let OpenFile { inode: id, cursor } = *self.handles.get(handle)?;
        self.inode(id)?;

        let block_size = self.block_size();
        let mut pos = cursor as usize;
        let mut written = 0;
        let mut stopped = None;

        while written < data.len() {
            let within = pos % block_size;
            let chunk = (block_size - within).min(data.len() - written);
            let size = self.inode(id)?.size as usize;

            let target = if within == 0 && pos >= size {
                self.grow(id).map(|block| (block, true))
            } else {
                self.block_at(id, pos / block_size).map(|block| (block, false))
            };
            let (block, fresh) = match target {
                Ok(target) => target,
                Err(err) if err.kind() == ErrorKind::Exhausted => {
                    stopped = Some(err);
                    break;
                }
                Err(err) => return Err(err),
            };

            let mut buf = if fresh {
                vec![0u8; block_size]
            } else {
                self.store.read_block(block)?
            };
            buf[within..within + chunk].copy_from_slice(&data[written..written + chunk]);
            self.store.write_block(block, &buf)?;

            pos += chunk;
            written += chunk;
            let inode = self.inode_mut(id)?;
            if pos > inode.size as usize {
                inode.size = pos as u32;
            }
        }

        self.handles.get_mut(handle)?.cursor = pos as u32;
        self.store.flush_inodes(&self.inodes)?;

        match stopped {
            Some(err) if written == 0 => Err(err),
            Some(err) => {
                warn!(
                    "Short write on {}: {} of {} bytes ({})",
                    handle,
                    written,
                    data.len(),
                    err
                );
                Ok(written)
            }
            None => Ok(written),
        }
    }

    /// Fills `buf` from the handle's cursor. Returns the bytes read, 0 at the
    /// end of the file.
    pub fn read(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize, FsError> {
        let OpenFile { inode: id, cursor } = *self.handles.get(handle)?;
        let size = self.inode(id)?.size as usize;

        let block_size = self.block_size();
        let mut pos = cursor as usize;
        let end = size.min(pos + buf.len());
        let mut done = 0;

        while pos < end {
            let (block, within) = self.resolve(id, pos as u32)?;
            let chunk = (block_size - within).min(end - pos);
            let data = self.store.read_block(block)?;
            buf[done..done + chunk].copy_from_slice(&data[within..within + chunk]);
            pos += chunk;
            done += chunk;
        }

        self.handles.get_mut(handle)?.cursor = pos as u32;
        Ok(done)
    }

    /// Moves the cursor to `offset`, which must lie inside the file.
    pub fn seek(&mut self, handle: Handle, offset: u32) -> Result<(), FsError> {
        let id = self.handles.get(handle)?.inode;
        let size = self.inode(id)?.size;
        if offset >= size {
            return Err(FsError::OutOfRange { offset, size });
        }
        self.handles.get_mut(handle)?.cursor = offset;
        Ok(())
    }

    /// Deletes `name`, closing any handles on it and freeing its blocks.
    pub fn remove(&mut self, name: &str) -> Result<(), FsError> {
        let (slot, id) = self
            .directory
            .lookup(name)
            .map(|(slot, entry)| (slot, entry.inode))
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        let closed = self.handles.close_all_for(id);
        self.reset(id)?;
        self.directory.clear(slot);
        self.store.flush_directory(&self.directory)?;

        debug!("Removed {} (inode {}, {} handles closed)", name, id, closed);
        Ok(())
    }

    pub fn file_size(&self, name: &str) -> Result<u32, FsError> {
        let (_, entry) = self
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        Ok(self.inode(entry.inode)?.size)
    }

    /// Next file name in directory order, wrapping around after the last.
    /// `None` only when there are no files.
    pub fn list_next(&mut self) -> Option<String> {
        let count = self.directory.count();
        if count == 0 {
            return None;
        }
        if self.list_cursor >= count {
            self.list_cursor = 0;
        }
        let name = self
            .directory
            .nth(self.list_cursor)
            .map(|entry| entry.name.to_string());
        self.list_cursor += 1;
        name
    }

    pub fn rewind_listing(&mut self) {
        self.list_cursor = 0;
    }
}

//! Moves the metadata tables between memory and their device regions.

use log::trace;
use sfs_disk::{
    decode_pointers, decode_records, encode_pointers, encode_records, DiskDirEntry, DiskInode,
    Geometry, Layout, Region, SuperBlock,
};

use crate::bitmap::Bitmap;
use crate::device::BlockDevice;
use crate::directory::Directory;
use crate::error::{DeviceError, FsError};
use crate::inode::{self, InodeTable};
use crate::types::BlockId;

pub struct Store<D> {
    device: D,
    geometry: Geometry,
    layout: Layout,
}

impl<D: BlockDevice> Store<D> {
    /// Fails if the device was not built with `geometry`'s block size and
    /// count.
    pub fn new(device: D, geometry: Geometry) -> Result<Self, FsError> {
        let layout = Layout::compute(&geometry)?;
        if device.block_size() != geometry.block_size
            || device.block_count() != geometry.block_count
        {
            return Err(DeviceError::GeometryMismatch {
                found_size: device.block_size(),
                found_count: device.block_count(),
                size: geometry.block_size,
                count: geometry.block_count,
            }
            .into());
        }
        Ok(Self {
            device,
            geometry,
            layout,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn block_size(&self) -> usize {
        self.geometry.block_size as usize
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn read_block(&mut self, block: BlockId) -> Result<Vec<u8>, FsError> {
        let mut buf = vec![0u8; self.block_size()];
        self.device.read_blocks(block.val(), 1, &mut buf)?;
        Ok(buf)
    }

    pub fn write_block(&mut self, block: BlockId, data: &[u8]) -> Result<(), FsError> {
        self.device.write_blocks(block.val(), 1, data)?;
        Ok(())
    }

    fn read_region(&mut self, region: Region) -> Result<Vec<u8>, FsError> {
        trace!("load region {:?}", region);
        let mut buf = vec![0u8; region.bytes(self.geometry.block_size)];
        self.device.read_blocks(region.start, region.len, &mut buf)?;
        Ok(buf)
    }

    fn write_region(&mut self, region: Region, bytes: &[u8]) -> Result<(), FsError> {
        trace!("flush region {:?}", region);
        self.device.write_blocks(region.start, region.len, bytes)?;
        Ok(())
    }

    pub fn write_superblock(&mut self) -> Result<(), FsError> {
        let superblock = SuperBlock::new(&self.geometry, &self.layout);
        let mut buf = vec![0u8; self.block_size()];
        encode_records(&[superblock], &mut buf)?;
        self.write_block(BlockId::new(Layout::SUPERBLOCK), &buf)
    }

    pub fn load_superblock(&mut self) -> Result<SuperBlock, FsError> {
        let buf = self.read_block(BlockId::new(Layout::SUPERBLOCK))?;
        decode_records::<SuperBlock>(&buf, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| FsError::Corrupt("superblock did not decode".into()))
    }

    pub fn flush_inodes(&mut self, table: &InodeTable) -> Result<(), FsError> {
        let region = self.layout.inode_table;
        let mut buf = vec![0u8; region.bytes(self.geometry.block_size)];
        encode_records(&inode::table_to_disk(table), &mut buf)?;
        self.write_region(region, &buf)
    }

    pub fn load_inodes(&mut self) -> Result<InodeTable, FsError> {
        let buf = self.read_region(self.layout.inode_table)?;
        let records = decode_records::<DiskInode>(&buf, self.geometry.inode_count as usize)?;
        Ok(inode::table_from_disk(&records))
    }

    pub fn flush_directory(&mut self, directory: &Directory) -> Result<(), FsError> {
        let region = self.layout.directory;
        let mut buf = vec![0u8; region.bytes(self.geometry.block_size)];
        encode_records(&directory.to_disk(), &mut buf)?;
        self.write_region(region, &buf)
    }

    pub fn load_directory(&mut self) -> Result<Directory, FsError> {
        let buf = self.read_region(self.layout.directory)?;
        let count = self.geometry.directory_capacity() as usize;
        Directory::from_disk(&decode_records::<DiskDirEntry>(&buf, count)?)
    }

    pub fn flush_bitmap(&mut self, bitmap: &Bitmap) -> Result<(), FsError> {
        let region = self.layout.bitmap;
        let mut buf = vec![0u8; region.bytes(self.geometry.block_size)];
        let bytes = bitmap.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        self.write_region(region, &buf)
    }

    pub fn load_bitmap(&mut self) -> Result<Bitmap, FsError> {
        let buf = self.read_region(self.layout.bitmap)?;
        Ok(Bitmap::from_bytes(&buf, self.geometry.block_count))
    }

    /// Contents of an indirect block up to its first empty slot.
    pub fn read_pointers(&mut self, block: BlockId) -> Result<Vec<BlockId>, FsError> {
        let buf = self.read_block(block)?;
        Ok(decode_pointers(&buf)
            .into_iter()
            .map_while(|ptr| ptr.map(BlockId::new))
            .collect())
    }

    pub fn write_pointers(&mut self, block: BlockId, ptrs: &[BlockId]) -> Result<(), FsError> {
        let raw: Vec<Option<u32>> = ptrs.iter().map(|b| Some(b.val())).collect();
        let mut buf = vec![0u8; self.block_size()];
        encode_pointers(&raw, &mut buf);
        self.write_block(block, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::inode::Inode;

    fn store() -> Store<MemDevice> {
        let geometry = Geometry::new(128, 256, 16);
        Store::new(MemDevice::new(128, 256), geometry).unwrap()
    }

    #[test]
    fn rejects_mismatched_device() {
        let err = Store::new(MemDevice::new(128, 128), Geometry::new(128, 256, 16))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FsError::Device(DeviceError::GeometryMismatch { found_count: 128, .. })
        ));
    }

    #[test]
    fn superblock_lands_in_block_zero() {
        let mut store = store();
        store.write_superblock().unwrap();
        let block = store.device().block(0);
        assert_eq!(&block[..4], &sfs_disk::MAGIC.to_le_bytes());
        assert!(block[24..].iter().all(|&b| b == 0));

        let superblock = store.load_superblock().unwrap();
        superblock.check(store.geometry(), store.layout()).unwrap();
    }

    #[test]
    fn tables_round_trip() {
        let mut store = store();
        let mut table = InodeTable::with_capacity(16);
        let mut inode = Inode::new();
        inode.size = 300;
        table.put(2, inode);
        store.flush_inodes(&table).unwrap();
        assert_eq!(store.load_inodes().unwrap(), table);

        let mut directory = Directory::with_capacity(15);
        directory.insert_at(
            0,
            crate::directory::DirEntry {
                name: crate::directory::FileName::parse("a.txt").unwrap(),
                inode: crate::types::InodeId::new(2),
            },
        );
        store.flush_directory(&directory).unwrap();
        assert_eq!(store.load_directory().unwrap(), directory);

        let bitmap = Bitmap::fresh(store.geometry(), store.layout());
        store.flush_bitmap(&bitmap).unwrap();
        assert_eq!(store.load_bitmap().unwrap(), bitmap);
    }

    #[test]
    fn pointers_stop_at_first_empty_slot() {
        let mut store = store();
        let block = BlockId::new(40);
        store
            .write_pointers(block, &[BlockId::new(20), BlockId::new(21)])
            .unwrap();
        assert_eq!(
            store.read_pointers(block).unwrap(),
            vec![BlockId::new(20), BlockId::new(21)]
        );
        // every trailing slot holds the sentinel
        assert!(store.device().block(40)[8..]
            .chunks(4)
            .all(|raw| raw == [0xFF; 4]));
    }
}

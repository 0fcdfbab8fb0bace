use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};
use sfs_disk::{decode_records, Geometry, Record, SuperBlock};

use super::{check_transfer, BlockDevice};
use crate::error::{DeviceError, FsError};

/// Disk image backed by a regular file.
pub struct FileDevice {
    file: File,
    block_size: u32,
    block_count: u32,
}

impl FileDevice {
    /// Creates (or truncates) the image and sizes it for the geometry.
    pub fn create(
        path: impl AsRef<Path>,
        block_size: u32,
        block_count: u32,
    ) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(block_size as u64 * block_count as u64)?;
        debug!(
            "Created image {} ({} blocks of {} bytes)",
            path.display(),
            block_count,
            block_size
        );

        Ok(Self {
            file,
            block_size,
            block_count,
        })
    }

    /// Opens an existing image whose length must match the geometry.
    pub fn open(
        path: impl AsRef<Path>,
        block_size: u32,
        block_count: u32,
    ) -> Result<Self, DeviceError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let expected = block_size as u64 * block_count as u64;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(DeviceError::ImageSize { expected, actual });
        }

        Ok(Self {
            file,
            block_size,
            block_count,
        })
    }

    /// Flushes written blocks through to stable storage.
    pub fn sync(&mut self) -> Result<(), DeviceError> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl BlockDevice for FileDevice {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<(), DeviceError> {
        let pos = check_transfer(&*self, start, count, buf.len())?;
        trace!("read blocks {}..{}", start, start + count);
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> Result<(), DeviceError> {
        let pos = check_transfer(&*self, start, count, buf.len())?;
        trace!("write blocks {}..{}", start, start + count);
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

/// Reads the geometry recorded in an image's superblock, so an image can be
/// opened without knowing how it was formatted.
pub fn probe_geometry(path: impl AsRef<Path>) -> Result<Geometry, FsError> {
    let mut header = [0u8; SuperBlock::SIZE];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map_err(DeviceError::from)?;
    let superblock = decode_records::<SuperBlock>(&header, 1)?
        .pop()
        .ok_or_else(|| FsError::Corrupt("empty superblock".into()))?;
    Ok(superblock.geometry()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sizes_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileDevice::create(&path, 128, 32).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 128 * 32);
    }

    #[test]
    fn blocks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");

        let mut device = FileDevice::create(&path, 128, 32).unwrap();
        let data: Vec<u8> = (0..256).map(|i| i as u8).collect();
        device.write_blocks(5, 2, &data).unwrap();
        drop(device);

        let mut device = FileDevice::open(&path, 128, 32).unwrap();
        let mut buf = vec![0u8; 256];
        device.read_blocks(5, 2, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn open_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileDevice::create(&path, 128, 32).unwrap();
        assert!(matches!(
            FileDevice::open(&path, 128, 64),
            Err(DeviceError::ImageSize {
                expected: 8192,
                actual: 4096
            })
        ));
    }

    #[test]
    fn transfer_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FileDevice::create(dir.path().join("disk.img"), 128, 32).unwrap();
        let mut buf = vec![0u8; 256];
        assert!(matches!(
            device.read_blocks(31, 2, &mut buf),
            Err(DeviceError::OutOfRange { start: 31, end: 33, total: 32 })
        ));
        assert!(matches!(
            device.write_blocks(0, 1, &buf),
            Err(DeviceError::BufferSize { expected: 128, actual: 256 })
        ));
    }

    #[test]
    fn probe_unformatted_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileDevice::create(&path, 128, 32).unwrap();
        let err = probe_geometry(&path).unwrap_err();
        assert!(matches!(
            err,
            FsError::Format(sfs_disk::FormatError::BadMagic { found: 0, .. })
        ));
    }
}

use log::trace;

use super::{check_transfer, BlockDevice};
use crate::error::DeviceError;

/// RAM-backed device. Cloning it snapshots the whole volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemDevice {
    data: Vec<u8>,
    block_size: u32,
    block_count: u32,
}

impl MemDevice {
    pub fn new(block_size: u32, block_count: u32) -> Self {
        Self {
            data: vec![0; block_size as usize * block_count as usize],
            block_size,
            block_count,
        }
    }

    /// Contents of one block. Panics past the end of the device.
    pub fn block(&self, block: u32) -> &[u8] {
        let size = self.block_size as usize;
        let start = block as usize * size;
        &self.data[start..start + size]
    }
}

impl BlockDevice for MemDevice {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<(), DeviceError> {
        let pos = check_transfer(&*self, start, count, buf.len())? as usize;
        trace!("read blocks {}..{}", start, start + count);
        buf.copy_from_slice(&self.data[pos..pos + buf.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> Result<(), DeviceError> {
        let pos = check_transfer(&*self, start, count, buf.len())? as usize;
        trace!("write blocks {}..{}", start, start + count);
        self.data[pos..pos + buf.len()].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_what_was_written() {
        let mut device = MemDevice::new(64, 8);
        device.write_blocks(2, 3, &[7u8; 192]).unwrap();

        let mut buf = vec![0u8; 64 * 4];
        device.read_blocks(1, 4, &mut buf).unwrap();
        assert!(buf[..64].iter().all(|&b| b == 0));
        assert!(buf[64..].iter().all(|&b| b == 7));
        assert_eq!(device.block(4), &[7u8; 64][..]);
    }

    #[test]
    fn rejects_out_of_range() {
        let mut device = MemDevice::new(64, 8);
        assert!(matches!(
            device.write_blocks(7, 2, &[0u8; 128]),
            Err(DeviceError::OutOfRange { .. })
        ));
        assert!(matches!(
            device.read_blocks(0, 0, &mut [0u8; 1]),
            Err(DeviceError::BufferSize { expected: 0, actual: 1 })
        ));
    }
}

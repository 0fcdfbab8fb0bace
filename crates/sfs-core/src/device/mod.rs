use crate::error::DeviceError;

pub mod file;
pub mod mem;

pub use file::FileDevice;
pub use mem::MemDevice;

/// Fixed-size block storage the file system lives on.
pub trait BlockDevice {
    fn block_size(&self) -> u32;

    fn block_count(&self) -> u32;

    /// Fill `buf` with `count` blocks starting at `start`.
    fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Store `count` blocks from `buf` starting at `start`.
    fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> Result<(), DeviceError>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn block_size(&self) -> u32 {
        (**self).block_size()
    }

    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<(), DeviceError> {
        (**self).read_blocks(start, count, buf)
    }

    fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> Result<(), DeviceError> {
        (**self).write_blocks(start, count, buf)
    }
}

/// Validates a transfer against the device bounds and returns its starting
/// byte offset.
pub(crate) fn check_transfer(
    device: &dyn BlockDevice,
    start: u32,
    count: u32,
    buf_len: usize,
) -> Result<u64, DeviceError> {
    let end = start as u64 + count as u64;
    if end > device.block_count() as u64 {
        return Err(DeviceError::OutOfRange {
            start,
            end,
            total: device.block_count(),
        });
    }
    let expected = count as usize * device.block_size() as usize;
    if buf_len != expected {
        return Err(DeviceError::BufferSize {
            expected,
            actual: buf_len,
        });
    }
    Ok(start as u64 * device.block_size() as u64)
}

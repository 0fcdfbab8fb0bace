//! A flat, single-directory file system on top of a block device.
//!
//! ```no_run
//! use sfs_core::{FileDevice, FileSystem, Geometry};
//!
//! # fn main() -> Result<(), sfs_core::FsError> {
//! let geometry = Geometry::default();
//! let device = FileDevice::create("disk.img", geometry.block_size, geometry.block_count)?;
//! let mut fs = FileSystem::format(device, geometry)?;
//!
//! let h = fs.open("hello.txt")?;
//! fs.write(h, b"hello")?;
//! fs.close(h)?;
//! # Ok(())
//! # }
//! ```

pub mod bitmap;
pub mod device;
pub mod directory;
pub mod error;
pub mod fs;
pub mod handle;
pub mod inode;
pub mod slots;
pub mod store;
pub mod types;

pub use device::file::probe_geometry;
pub use device::{BlockDevice, FileDevice, MemDevice};
pub use directory::FileName;
pub use error::{DeviceError, ErrorKind, FsError};
pub use fs::{FileStat, FileSystem};
pub use sfs_disk::{FormatError, Geometry, Layout, Region};
pub use types::{BlockId, Handle, InodeId};

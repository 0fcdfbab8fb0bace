use sfs_disk::FormatError;
use thiserror::Error;

use crate::types::{Handle, InodeId};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocks {start}..{end} are outside a device of {total} blocks")]
    OutOfRange { start: u32, end: u64, total: u32 },

    #[error("buffer of {actual} bytes does not match a transfer of {expected} bytes")]
    BufferSize { expected: usize, actual: usize },

    #[error("image is {actual} bytes, geometry requires {expected}")]
    ImageSize { expected: u64, actual: u64 },

    #[error(
        "device has {found_count} blocks of {found_size} bytes, \
         file system expects {count} blocks of {size} bytes"
    )]
    GeometryMismatch {
        found_size: u32,
        found_count: u32,
        size: u32,
        count: u32,
    },
}

/// Coarse classification of [`FsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A table, the data region or a file's block capacity is full.
    Exhausted,
    NotFound,
    /// The request does not fit the current state: bad handle, bad name,
    /// seek past the end.
    InvalidState,
    /// The image is not a valid file system, or contradicts itself.
    Corrupt,
    /// The block device failed.
    Io,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no free data block")]
    NoFreeBlock,

    #[error("inode table is full")]
    NoFreeInode,

    #[error("directory is full")]
    DirectoryFull,

    #[error("open-file table is full")]
    NoFreeHandle,

    #[error("inode {0} already holds the maximum of {1} blocks")]
    FileTooLarge(InodeId, usize),

    #[error("no such file: {0}")]
    NotFound(String),

    #[error("invalid file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("no handle {0}")]
    BadHandle(Handle),

    #[error("handle {0} is not open")]
    Closed(Handle),

    #[error("inode {0} no longer exists")]
    StaleInode(InodeId),

    #[error("offset {offset} is outside a file of {size} bytes")]
    OutOfRange { offset: u32, size: u32 },

    #[error("inode {inode}: block {index} is within the file size but unassigned")]
    MissingBlock { inode: InodeId, index: usize },

    #[error("inconsistent image: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NoFreeBlock
            | FsError::NoFreeInode
            | FsError::DirectoryFull
            | FsError::NoFreeHandle
            | FsError::FileTooLarge(..) => ErrorKind::Exhausted,
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::InvalidName { .. }
            | FsError::BadHandle(_)
            | FsError::Closed(_)
            | FsError::StaleInode(_)
            | FsError::OutOfRange { .. } => ErrorKind::InvalidState,
            FsError::MissingBlock { .. } | FsError::Corrupt(_) | FsError::Format(_) => {
                ErrorKind::Corrupt
            }
            FsError::Device(_) => ErrorKind::Io,
        }
    }

    /// The session cannot continue after a fatal error; the image must be
    /// remounted or repaired.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Corrupt | ErrorKind::Io)
    }
}

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod error;
pub mod geometry;

pub use codec::{decode_pointers, decode_records, encode_pointers, encode_records, Record};
pub use error::FormatError;
pub use geometry::{Geometry, Layout, Region};

pub const MAGIC: i32 = 260_917_301;
pub const INODE_DIRECT_POINTERS: usize = 12;

/// On-disk stand-in for an absent id, pointer or size.
pub const SENTINEL: i32 = -1;

pub const POINTER_SIZE: usize = 4;
pub const NAME_STEM_LEN: usize = 16;
pub const NAME_EXT_LEN: usize = 3;
// stem + '.' + extension
pub const NAME_LEN: usize = NAME_STEM_LEN + 1 + NAME_EXT_LEN;

pub const DEFAULT_BLOCK_SIZE: u32 = 1024;
pub const DEFAULT_BLOCK_COUNT: u32 = 1024;
pub const DEFAULT_INODE_COUNT: u32 = 200;

bitflags! {
    /// Permission bits of an inode. One hex nibble per class, so a freshly
    /// created file reads `0x777`. Stored, never enforced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u32 {
        const OTHER_EXEC = 0x001;
        const OTHER_WRITE = 0x002;
        const OTHER_READ = 0x004;
        const GROUP_EXEC = 0x010;
        const GROUP_WRITE = 0x020;
        const GROUP_READ = 0x040;
        const OWNER_EXEC = 0x100;
        const OWNER_WRITE = 0x200;
        const OWNER_READ = 0x400;
    }
}

impl Mode {
    pub const DEFAULT: Mode = Mode::all();

    pub fn from_raw(raw: i32) -> Self {
        Self::from_bits_retain(raw as u32)
    }

    pub fn to_raw(self) -> i32 {
        self.bits() as i32
    }
}

/// Decodes an on-disk pointer; any negative value is "unassigned".
pub fn ptr_from_raw(raw: i32) -> Option<u32> {
    u32::try_from(raw).ok()
}

pub fn ptr_to_raw(ptr: Option<u32>) -> i32 {
    ptr.map_or(SENTINEL, |p| p as i32)
}

/// Block 0 of a formatted device.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SuperBlock {
    pub magic: i32,
    pub block_size: i32,
    pub file_system_size: i32,
    pub inode_table_length: i32,
    pub inode_count: i32,
    /// First block of the directory region.
    pub root_directory: i32,
}

impl SuperBlock {
    pub fn new(geometry: &Geometry, layout: &Layout) -> Self {
        Self {
            magic: MAGIC,
            block_size: geometry.block_size as i32,
            file_system_size: geometry.block_count as i32,
            inode_table_length: layout.inode_table.len as i32,
            inode_count: geometry.inode_count as i32,
            root_directory: layout.directory.start as i32,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// Geometry recorded at format time.
    pub fn geometry(&self) -> Result<Geometry, FormatError> {
        if !self.is_valid() {
            return Err(FormatError::BadMagic {
                found: self.magic,
                expected: MAGIC,
            });
        }
        let field = |name: &'static str, value: i32| {
            u32::try_from(value)
                .map_err(|_| FormatError::InvalidGeometry(format!("negative {name}")))
        };
        Ok(Geometry {
            block_size: field("block size", self.block_size)?,
            block_count: field("block count", self.file_system_size)?,
            inode_count: field("inode count", self.inode_count)?,
        })
    }

    /// Rejects a superblock that was not written for `geometry`.
    pub fn check(&self, geometry: &Geometry, layout: &Layout) -> Result<(), FormatError> {
        if !self.is_valid() {
            return Err(FormatError::BadMagic {
                found: self.magic,
                expected: MAGIC,
            });
        }
        let expected = Self::new(geometry, layout);
        let fields = [
            ("block_size", self.block_size, expected.block_size),
            ("file_system_size", self.file_system_size, expected.file_system_size),
            ("inode_table_length", self.inode_table_length, expected.inode_table_length),
            ("inode_count", self.inode_count, expected.inode_count),
            ("root_directory", self.root_directory, expected.root_directory),
        ];
        for (field, found, expected) in fields {
            if found != expected {
                return Err(FormatError::LayoutMismatch {
                    field,
                    found,
                    expected,
                });
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DiskInode {
    pub mode: i32,
    pub link_count: i32,
    pub uid: i32,
    pub gid: i32,
    /// `SENTINEL` for a free inode.
    pub size: i32,
    pub direct_ptrs: [i32; INODE_DIRECT_POINTERS],
    /// Block holding further pointers, `SENTINEL` until the 13th block.
    pub indirect_ptr: i32,
}

impl DiskInode {
    pub fn free() -> Self {
        Self {
            mode: Mode::DEFAULT.to_raw(),
            link_count: 0,
            uid: SENTINEL,
            gid: SENTINEL,
            size: SENTINEL,
            direct_ptrs: [SENTINEL; INODE_DIRECT_POINTERS],
            indirect_ptr: SENTINEL,
        }
    }

    pub fn is_free(&self) -> bool {
        self.size < 0
    }
}

impl Default for DiskInode {
    fn default() -> Self {
        Self::free()
    }
}

/// One directory slot: inode id and a zero-padded name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DiskDirEntry {
    pub inode_id: i32,
    pub name: [u8; NAME_LEN],
}

impl DiskDirEntry {
    pub fn new(inode_id: u32, name_str: &str) -> Self {
        let mut name = [0u8; NAME_LEN];
        let bytes = name_str.as_bytes();
        let len = bytes.len().min(NAME_LEN);
        name[0..len].copy_from_slice(&bytes[0..len]);
        Self {
            inode_id: inode_id as i32,
            name,
        }
    }

    pub fn empty() -> Self {
        Self {
            inode_id: SENTINEL,
            name: [0; NAME_LEN],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inode_id < 0
    }

    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&c| c == 0).unwrap_or(NAME_LEN);
        &self.name[0..end]
    }

    pub fn name_as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name_bytes()).ok()
    }
}

impl Default for DiskDirEntry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_0x777() {
        assert_eq!(Mode::DEFAULT.to_raw(), 0x777);
        assert_eq!(Mode::from_raw(0x777), Mode::DEFAULT);
        // unknown bits survive a round trip
        assert_eq!(Mode::from_raw(0x1777).to_raw(), 0x1777);
    }

    #[test]
    fn pointer_sentinel() {
        assert_eq!(ptr_from_raw(SENTINEL), None);
        assert_eq!(ptr_from_raw(-7), None);
        assert_eq!(ptr_from_raw(42), Some(42));
        assert_eq!(ptr_to_raw(None), SENTINEL);
        assert_eq!(ptr_to_raw(Some(0)), 0);
    }

    #[test]
    fn dir_entry_name() {
        let entry = DiskDirEntry::new(3, "notes.txt");
        assert_eq!(entry.name_as_str(), Some("notes.txt"));
        assert!(!entry.is_empty());

        let full = DiskDirEntry::new(1, "abcdefghijklmnop.rsx");
        assert_eq!(full.name_as_str(), Some("abcdefghijklmnop.rsx"));

        assert!(DiskDirEntry::empty().is_empty());
        assert_eq!(DiskDirEntry::empty().name_as_str(), Some(""));
    }

    #[test]
    fn superblock_check() {
        let geometry = Geometry::default();
        let layout = Layout::compute(&geometry).unwrap();
        let sb = SuperBlock::new(&geometry, &layout);
        assert!(sb.check(&geometry, &layout).is_ok());
        assert_eq!(sb.geometry().unwrap(), geometry);

        let other = Geometry::new(1024, 1024, 100);
        let other_layout = Layout::compute(&other).unwrap();
        assert!(matches!(
            sb.check(&other, &other_layout),
            Err(FormatError::LayoutMismatch { field: "inode_table_length", .. })
        ));

        let bad = SuperBlock { magic: 7, ..sb };
        assert!(matches!(
            bad.check(&geometry, &layout),
            Err(FormatError::BadMagic { found: 7, .. })
        ));
    }
}

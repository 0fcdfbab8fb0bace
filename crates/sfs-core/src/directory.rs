use core::fmt;

use sfs_disk::{DiskDirEntry, NAME_EXT_LEN, NAME_LEN, NAME_STEM_LEN};

use crate::error::FsError;
use crate::slots::SlotTable;
use crate::types::InodeId;

/// A name that fits a directory slot: at most 16 bytes of stem and 3 bytes
/// of extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn parse(name: &str) -> Result<Self, FsError> {
        let invalid = |reason| FsError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if name.contains(['\0', '/']) {
            return Err(invalid("contains NUL or '/'"));
        }
        if name.len() > NAME_LEN {
            return Err(invalid("longer than 20 bytes"));
        }
        let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
        if stem.trim_matches('.').is_empty() {
            return Err(invalid("empty stem"));
        }
        if stem.len() > NAME_STEM_LEN {
            return Err(invalid("stem longer than 16 bytes"));
        }
        if ext.len() > NAME_EXT_LEN {
            return Err(invalid("extension longer than 3 bytes"));
        }
        Ok(Self(name.to_string()))
    }

    /// Accepts any non-empty name that was found in a directory slot.
    fn from_slot(raw: &DiskDirEntry) -> Option<Self> {
        raw.name_as_str()
            .filter(|name| !name.is_empty())
            .map(|name| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: FileName,
    pub inode: InodeId,
}

/// The single flat directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    entries: SlotTable<DirEntry>,
}

impl Directory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotTable::with_capacity(capacity),
        }
    }

    pub fn from_disk(records: &[DiskDirEntry]) -> Result<Self, FsError> {
        let slots = records
            .iter()
            .enumerate()
            .map(|(slot, raw)| {
                if raw.is_empty() {
                    return Ok(None);
                }
                let name = FileName::from_slot(raw).ok_or_else(|| {
                    FsError::Corrupt(format!("directory slot {slot} has an unreadable name"))
                })?;
                Ok(Some(DirEntry {
                    name,
                    inode: InodeId::new(raw.inode_id as u32),
                }))
            })
            .collect::<Result<Vec<_>, FsError>>()?;
        Ok(Self {
            entries: SlotTable::from_slots(slots),
        })
    }

    pub fn to_disk(&self) -> Vec<DiskDirEntry> {
        self.entries
            .slots()
            .iter()
            .map(|slot| match slot {
                Some(entry) => DiskDirEntry::new(entry.inode.val(), entry.name.as_str()),
                None => DiskDirEntry::empty(),
            })
            .collect()
    }

    /// Exact-match lookup; returns the slot index and entry.
    pub fn lookup(&self, name: &str) -> Option<(usize, &DirEntry)> {
        let slot = self.entries.position(|entry| entry.name.as_str() == name)?;
        self.entries.get(slot).map(|entry| (slot, entry))
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.entries.first_free()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// The `i`-th live entry in slot order. Reusing a freed slot can move a
    /// later-created file ahead of older ones.
    pub fn nth(&self, i: usize) -> Option<&DirEntry> {
        self.entries.iter().nth(i).map(|(_, entry)| entry)
    }

    pub fn insert_at(&mut self, slot: usize, entry: DirEntry) {
        self.entries.put(slot, entry);
    }

    pub fn clear(&mut self, slot: usize) -> Option<DirEntry> {
        self.entries.take(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }
}

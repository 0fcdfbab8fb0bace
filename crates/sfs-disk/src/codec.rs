//! Byte-level encoding of the metadata records.
//!
//! Records go through bincode with fixed-width little-endian integers, which
//! reproduces the packed `i32` layout of existing images byte for byte.
//! Indirect blocks are plain `i32` arrays and are converted with bytemuck.

use bincode::config::{self, Config};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FormatError;
use crate::{ptr_from_raw, ptr_to_raw, DiskDirEntry, DiskInode, SuperBlock, POINTER_SIZE};

fn record_config() -> impl Config {
    config::standard().with_fixed_int_encoding()
}

/// A fixed-size on-disk record.
pub trait Record: Serialize + DeserializeOwned {
    /// Encoded size in bytes.
    const SIZE: usize;
}

impl Record for SuperBlock {
    const SIZE: usize = 24;
}

impl Record for DiskInode {
    const SIZE: usize = 72;
}

impl Record for DiskDirEntry {
    const SIZE: usize = 24;
}

/// Packs `records` back to back at the start of `out`. Bytes past the last
/// record are left untouched.
pub fn encode_records<R: Record>(records: &[R], out: &mut [u8]) -> Result<(), FormatError> {
    let needed = records.len() * R::SIZE;
    if needed > out.len() {
        return Err(FormatError::ShortBuffer {
            needed,
            actual: out.len(),
        });
    }
    for (record, slot) in records.iter().zip(out.chunks_exact_mut(R::SIZE)) {
        bincode::serde::encode_into_slice(record, slot, record_config())?;
    }
    Ok(())
}

pub fn decode_records<R: Record>(bytes: &[u8], count: usize) -> Result<Vec<R>, FormatError> {
    let needed = count * R::SIZE;
    if needed > bytes.len() {
        return Err(FormatError::ShortBuffer {
            needed,
            actual: bytes.len(),
        });
    }
    bytes[..needed]
        .chunks_exact(R::SIZE)
        .map(|chunk| -> Result<R, FormatError> {
            let (record, _) = bincode::serde::decode_from_slice(chunk, record_config())?;
            Ok(record)
        })
        .collect()
}

/// Writes one pointer per slot of `block`; slots past `ptrs` get the sentinel.
pub fn encode_pointers(ptrs: &[Option<u32>], block: &mut [u8]) {
    let slots = block.len() / POINTER_SIZE;
    let raw: Vec<i32> = (0..slots)
        .map(|i| ptr_to_raw(ptrs.get(i).copied().flatten()).to_le())
        .collect();
    block[..slots * POINTER_SIZE].copy_from_slice(bytemuck::cast_slice(&raw));
}

pub fn decode_pointers(block: &[u8]) -> Vec<Option<u32>> {
    let slots = block.len() / POINTER_SIZE;
    let mut raw = vec![0i32; slots];
    bytemuck::cast_slice_mut::<i32, u8>(&mut raw).copy_from_slice(&block[..slots * POINTER_SIZE]);
    raw.into_iter().map(|r| ptr_from_raw(i32::from_le(r))).collect()
}

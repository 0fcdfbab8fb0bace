#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sfs_core::{FileSystem, Geometry, Handle, MemDevice};

/// Routes `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The stock 1024 x 1024 volume with 200 inodes.
pub fn default_fs() -> FileSystem<MemDevice> {
    init_logger();
    let geometry = Geometry::default();
    FileSystem::format(
        MemDevice::new(geometry.block_size, geometry.block_count),
        geometry,
    )
    .unwrap()
}

/// 128-byte blocks, 242 data blocks, 16 inodes.
pub const SMALL: Geometry = Geometry::new(128, 256, 16);

pub fn small_fs() -> FileSystem<MemDevice> {
    init_logger();
    FileSystem::format(MemDevice::new(128, 256), SMALL).unwrap()
}

pub fn payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Reads `size` bytes from offset 0.
pub fn read_from_start(fs: &mut FileSystem<MemDevice>, h: Handle, size: usize) -> Vec<u8> {
    if size > 0 {
        fs.seek(h, 0).unwrap();
    }
    let mut buf = vec![0u8; size];
    let n = fs.read(h, &mut buf).unwrap();
    assert_eq!(n, size);
    buf
}

/// Data blocks the live files should account for.
pub fn expected_data_blocks(fs: &FileSystem<MemDevice>) -> usize {
    fs.files()
        .iter()
        .map(|name| {
            let stat = fs.stat(name).unwrap();
            stat.blocks + usize::from(stat.indirect)
        })
        .sum()
}

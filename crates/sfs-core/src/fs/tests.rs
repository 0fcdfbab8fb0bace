use sfs_disk::Geometry;

use super::*;
use crate::device::MemDevice;
use crate::directory::{DirEntry, FileName};
use crate::error::ErrorKind;

// inodes 1..10, directory 10..13, data 13..255, bitmap 255
const SMALL: Geometry = Geometry::new(128, 256, 16);

fn small_fs() -> FileSystem<MemDevice> {
    FileSystem::format(MemDevice::new(128, 256), SMALL).unwrap()
}

#[test]
fn fresh_format() {
    let fs = small_fs();
    assert_eq!(fs.layout().data.start, 13);
    assert_eq!(fs.free_blocks(), 242);
    assert!(fs.files().is_empty());

    let fs = FileSystem::mount(fs.into_device(), SMALL).unwrap();
    assert_eq!(fs.free_blocks(), 242);
}

#[test]
fn blocks_come_from_the_low_end() {
    let mut fs = small_fs();
    let h = fs.open("a").unwrap();
    fs.write(h, &[1u8; 300]).unwrap();

    let id = fs.stat("a").unwrap().inode;
    assert_eq!(fs.block_at(id, 0).unwrap(), BlockId::new(13));
    assert_eq!(fs.block_at(id, 2).unwrap(), BlockId::new(15));
    assert_eq!(fs.resolve(id, 299).unwrap(), (BlockId::new(15), 43));
    assert!(matches!(
        fs.resolve(id, 300),
        Err(FsError::OutOfRange { offset: 300, size: 300 })
    ));
}

#[test]
fn indirect_block_on_thirteenth_block() {
    let mut fs = small_fs();
    let h = fs.open("big").unwrap();
    fs.write(h, &[7u8; 12 * 128]).unwrap();
    let stat = fs.stat("big").unwrap();
    assert_eq!((stat.blocks, stat.indirect), (12, false));
    assert_eq!(fs.free_blocks(), 242 - 12);

    fs.write(h, &[8u8]).unwrap();
    let stat = fs.stat("big").unwrap();
    assert_eq!((stat.blocks, stat.indirect), (13, true));
    // data block 25 first, then the indirect block 26
    assert_eq!(fs.free_blocks(), 242 - 14);
    assert_eq!(fs.block_at(stat.inode, 12).unwrap(), BlockId::new(25));
    assert_eq!(fs.inode(stat.inode).unwrap().indirect, Some(BlockId::new(26)));
}

#[test]
fn file_capacity_limits_writes() {
    let mut fs = small_fs();
    let max = SMALL.max_file_size() as usize;
    let h = fs.open("full").unwrap();

    assert_eq!(fs.write(h, &vec![3u8; max + 100]).unwrap(), max);
    assert_eq!(fs.file_size("full").unwrap() as usize, max);
    let err = fs.write(h, b"x").unwrap_err();
    assert!(matches!(err, FsError::FileTooLarge(_, 44)));
    assert_eq!(err.kind(), ErrorKind::Exhausted);
}

#[test]
fn reset_returns_every_block() {
    let mut fs = small_fs();
    let h = fs.open("tmp").unwrap();
    fs.write(h, &vec![1u8; 20 * 128]).unwrap();
    assert_eq!(fs.free_blocks(), 242 - 21);

    let id = fs.stat("tmp").unwrap().inode;
    fs.reset(id).unwrap();
    assert_eq!(fs.free_blocks(), 242);
    assert!(matches!(fs.inode(id), Err(FsError::StaleInode(_))));
}

#[test]
fn refuses_to_release_metadata() {
    let mut fs = small_fs();
    assert!(matches!(
        fs.release_block(BlockId::new(3)),
        Err(FsError::Corrupt(_))
    ));
    assert!(matches!(
        fs.release_block(BlockId::new(40)),
        Err(FsError::Corrupt(_))
    ));
}

#[test]
fn hole_under_size_is_reported() {
    let mut fs = small_fs();
    let h = fs.open("a").unwrap();
    fs.write(h, &[1u8; 200]).unwrap();

    let id = fs.stat("a").unwrap().inode;
    fs.inode_mut(id).unwrap().direct[1] = None;
    let mut buf = [0u8; 200];
    fs.seek(h, 0).unwrap();
    let err = fs.read(h, &mut buf).unwrap_err();
    assert!(matches!(err, FsError::MissingBlock { index: 1, .. }));
    assert!(err.is_fatal());
}

#[test]
fn mount_rejects_free_metadata_block() {
    let mut fs = small_fs();
    fs.bitmap.free(BlockId::new(2));
    fs.store.flush_bitmap(&fs.bitmap).unwrap();

    let err = FileSystem::mount(fs.into_device(), SMALL).err().unwrap();
    assert!(matches!(err, FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_duplicate_names() {
    let mut fs = small_fs();
    fs.open("twin").unwrap();
    fs.directory.insert_at(
        5,
        DirEntry {
            name: FileName::parse("twin").unwrap(),
            inode: InodeId::new(0),
        },
    );
    fs.store.flush_directory(&fs.directory).unwrap();

    let err = FileSystem::mount(fs.into_device(), SMALL).err().unwrap();
    assert!(matches!(err, FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_dangling_entry() {
    let mut fs = small_fs();
    fs.directory.insert_at(
        0,
        DirEntry {
            name: FileName::parse("ghost").unwrap(),
            inode: InodeId::new(7),
        },
    );
    fs.store.flush_directory(&fs.directory).unwrap();

    let err = FileSystem::mount(fs.into_device(), SMALL).err().unwrap();
    assert!(matches!(err, FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_wrong_geometry() {
    let fs = small_fs();
    let err = FileSystem::mount(fs.into_device(), Geometry::new(128, 256, 24))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        FsError::Format(sfs_disk::FormatError::LayoutMismatch { .. })
    ));
}

#[test]
fn initialize_dispatches() {
    let fs = FileSystem::initialize(MemDevice::new(128, 256), SMALL, true).unwrap();
    let device = fs.into_device();
    assert!(FileSystem::initialize(device, SMALL, false).is_ok());

    let blank = MemDevice::new(128, 256);
    assert!(matches!(
        FileSystem::initialize(blank, SMALL, false).err().unwrap(),
        FsError::Format(sfs_disk::FormatError::BadMagic { found: 0, .. })
    ));
}

/// Writes two 100-byte files and hands back their inode ids.
fn two_files(fs: &mut FileSystem<MemDevice>) -> (InodeId, InodeId) {
    for name in ["a", "b"] {
        let h = fs.open(name).unwrap();
        fs.write(h, &[1u8; 100]).unwrap();
    }
    (fs.stat("a").unwrap().inode, fs.stat("b").unwrap().inode)
}

fn remount_err(mut fs: FileSystem<MemDevice>) -> FsError {
    fs.store.flush_inodes(&fs.inodes).unwrap();
    FileSystem::mount(fs.into_device(), SMALL).err().unwrap()
}

#[test]
fn mount_rejects_block_shared_by_two_inodes() {
    let mut fs = small_fs();
    let (a, b) = two_files(&mut fs);
    let shared = fs.inode(a).unwrap().direct[0];
    fs.inode_mut(b).unwrap().direct[0] = shared;

    assert!(matches!(remount_err(fs), FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_block_listed_twice_by_one_inode() {
    let mut fs = small_fs();
    let (a, _) = two_files(&mut fs);
    let first = fs.inode(a).unwrap().direct[0];
    fs.inode_mut(a).unwrap().direct[1] = first;

    assert!(matches!(remount_err(fs), FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_pointer_outside_data_region() {
    let mut fs = small_fs();
    let (a, _) = two_files(&mut fs);
    fs.inode_mut(a).unwrap().direct[0] = Some(BlockId::new(4));

    assert!(matches!(remount_err(fs), FsError::Corrupt(_)));
}

#[test]
fn mount_rejects_pointer_onto_free_block() {
    let mut fs = small_fs();
    let (a, _) = two_files(&mut fs);
    fs.inode_mut(a).unwrap().direct[0] = Some(BlockId::new(200));

    assert!(matches!(remount_err(fs), FsError::Corrupt(_)));
}

#[test]
fn intact_image_keeps_both_files_apart() {
    let mut fs = small_fs();
    two_files(&mut fs);
    let mut fs = FileSystem::mount(fs.into_device(), SMALL).unwrap();

    fs.remove("b").unwrap();
    let h = fs.open("c").unwrap();
    fs.write(h, &[3u8; 100]).unwrap();

    let h = fs.open("a").unwrap();
    fs.seek(h, 0).unwrap();
    let mut buf = [0u8; 100];
    assert_eq!(fs.read(h, &mut buf).unwrap(), 100);
    assert!(buf.iter().all(|&b| b == 1));
}

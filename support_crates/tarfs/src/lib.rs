//! A flat file system that keeps a small fixed number of files in memory and persists them as a tar archive.
//!
//! The archive occupies the first [`DISK_SIZE`] bytes of a [`BlockDevice`].
//! [`FileTable::load`] hydrates the table from it and [`FileTable::flush`] writes the whole table back.
//! Nothing is persisted implicitly.
#![no_std]

#[cfg(any(test, feature = "ram-disk"))]
extern crate std;

mod header;
#[cfg(any(test, feature = "ram-disk"))]
pub mod ram_disk;
mod table;

pub use header::TarHeader;
pub use table::{File, FileTable};

use thiserror_no_std::Error;

/// How many files the table can hold
pub const FILES_MAX: usize = 2;

/// How many bytes of content a single file can hold
pub const FILE_CAPACITY: usize = 1024;

/// The maximum length of a file name
pub const NAME_LEN: usize = 100;

/// The unit in which the block device is accessed and in which the archive is laid out
pub const SECTOR_SIZE: usize = 512;

/// Size of the archive image on disk.
///
/// It holds a header block and a full data buffer for each file followed by one terminating empty block.
pub const DISK_SIZE: usize = align_up(FILES_MAX * (SECTOR_SIZE + FILE_CAPACITY) + SECTOR_SIZE, SECTOR_SIZE);

/// How many sectors the archive image spans
pub const DISK_SECTORS: usize = DISK_SIZE / SECTOR_SIZE;

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// A device that stores data in sectors of [`SECTOR_SIZE`] bytes
pub trait BlockDevice {
    /// The number of sectors the device holds
    fn sector_count(&self) -> u64;

    fn read_sector(&mut self, sector: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), IoError>;

    fn write_sector(&mut self, sector: u64, buf: &[u8; SECTOR_SIZE]) -> Result<(), IoError>;
}

/// A sector could not be transferred
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("block device failed to transfer sector {sector}")]
pub struct IoError {
    pub sector: u64,
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum FsError {
    #[error("no file with the given name exists")]
    NotFound,
    #[error("file table is full")]
    TableFull,
    #[error("{size} bytes do not fit into a file")]
    TooLarge { size: usize },
    #[error("file name is empty, too long or contains a null byte")]
    InvalidName,
    #[error("invalid tar header at byte offset {offset}")]
    InvalidHeader { offset: usize },
    #[error("block device holds only {sectors} sectors, too few for the file system")]
    DeviceTooSmall { sectors: u64 },
    #[error(transparent)]
    Io(#[from] IoError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_disk_holds_full_table() {
        assert_eq!(DISK_SIZE, 3584);
        assert_eq!(DISK_SECTORS, 7);
        assert_eq!(DISK_SIZE % SECTOR_SIZE, 0);
    }
}

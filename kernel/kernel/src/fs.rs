//! Glue between the file table, the block device driver and syscall results

use syscall_abi::SyscallError;
use tarfs::{BlockDevice, FsError, IoError, SECTOR_SIZE};
use virtio::{Transport, VirtioBlk};

/// A [`BlockDevice`] backed by a virtio-blk device
pub struct VirtioDisk<'mem, T: Transport>(pub VirtioBlk<'mem, T>);

impl<T: Transport> BlockDevice for VirtioDisk<'_, T> {
    fn sector_count(&self) -> u64 {
        self.0.capacity()
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), IoError> {
        self.0.read_sector(sector, buf).map_err(|e| {
            log::warn!("could not read sector {sector}: {e}");
            IoError { sector }
        })
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8; SECTOR_SIZE]) -> Result<(), IoError> {
        self.0.write_sector(sector, buf).map_err(|e| {
            log::warn!("could not write sector {sector}: {e}");
            IoError { sector }
        })
    }
}

/// The status code with which a failed file operation is reported to user processes
pub fn syscall_error(err: FsError) -> SyscallError {
    match err {
        FsError::NotFound => SyscallError::NotFound,
        FsError::TableFull => SyscallError::TableFull,
        FsError::TooLarge { .. } => SyscallError::TooLarge,
        FsError::InvalidName => SyscallError::InvalidArg,
        FsError::InvalidHeader { .. } | FsError::DeviceTooSmall { .. } | FsError::Io(_) => {
            SyscallError::Io
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fs_errors_map_to_status_codes() {
        assert_eq!(syscall_error(FsError::TableFull), SyscallError::TableFull);
        assert_eq!(
            syscall_error(FsError::TooLarge { size: 2000 }),
            SyscallError::TooLarge
        );
        assert_eq!(
            syscall_error(FsError::Io(IoError { sector: 3 })),
            SyscallError::Io
        );
        assert_eq!(syscall_error(FsError::InvalidName), SyscallError::InvalidArg);
    }
}

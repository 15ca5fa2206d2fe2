use crate::{BlockDevice, IoError, SECTOR_SIZE};
use std::vec;
use std::vec::Vec;

/// A block device backed by host memory
pub struct RamDisk {
    pub sectors: Vec<[u8; SECTOR_SIZE]>,
    pub failing_sector: Option<u64>,
    pub reads: usize,
}

impl RamDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            sectors: vec![[0; SECTOR_SIZE]; sectors],
            failing_sector: None,
            reads: 0,
        }
    }

    /// Store `data` at the beginning of `sector`
    pub fn store(&mut self, data: &[u8], sector: usize) {
        self.sectors[sector][..data.len()].copy_from_slice(data);
    }

    fn check(&self, sector: u64) -> Result<usize, IoError> {
        if self.failing_sector == Some(sector) || sector as usize >= self.sectors.len() {
            return Err(IoError { sector });
        }
        Ok(sector as usize)
    }
}

impl BlockDevice for RamDisk {
    fn sector_count(&self) -> u64 {
        self.sectors.len() as u64
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), IoError> {
        let idx = self.check(sector)?;
        self.reads += 1;
        buf.copy_from_slice(&self.sectors[idx]);
        Ok(())
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8; SECTOR_SIZE]) -> Result<(), IoError> {
        let idx = self.check(sector)?;
        self.sectors[idx] = *buf;
        Ok(())
    }
}

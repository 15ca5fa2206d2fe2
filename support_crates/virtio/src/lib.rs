//! Driver for a virtio block device that is attached through the legacy memory mapped transport
//!
//! The crate is split into three layers:
//! - [`Transport`] abstracts the device registers. [`MmioTransport`] implements it for real hardware.
//! - [`VirtQueue`] is the shared memory structure through which requests are exchanged with the device.
//! - [`VirtioBlk`] drives the device handshake and submits block requests over a single queue.
//!
//! Requests complete synchronously.
//! There is no interrupt support so [`VirtioBlk::submit`] busy-waits until the device reports completion.
#![no_std]

#[cfg(test)]
extern crate std;

mod blk;
mod mmio;
mod queue;
#[cfg(test)]
mod test_device;
mod transport;

pub use blk::*;
pub use mmio::*;
pub use queue::*;
pub use transport::*;

/// The value of the magic register of every virtio device (`"virt"` in little endian)
pub const VIRTIO_MAGIC: u32 = 0x74726976;

/// The only transport version that is supported
pub const LEGACY_VERSION: u32 = 1;

/// How many bytes make up one sector of a block device
pub const SECTOR_SIZE: usize = 512;

/// Page size assumed for the legacy queue layout
pub const PAGESIZE: usize = 4096;

use crate::{
    DescriptorFlags, DeviceId, DeviceStatus, Transport, VirtQueue, LEGACY_VERSION, QUEUE_SIZE,
    SECTOR_SIZE, VIRTIO_MAGIC,
};
use core::fmt::{Debug, Formatter};
use core::mem::{offset_of, size_of};
use core::ptr;
use core::sync::atomic::{fence, Ordering};
use thiserror_no_std::Error;

/// The request type which reads sectors from the device
pub const VIRTIO_BLK_T_IN: u32 = 0;

/// The request type which writes sectors to the device
pub const VIRTIO_BLK_T_OUT: u32 = 1;

/// The status the device reports for a successful request
pub const VIRTIO_BLK_S_OK: u8 = 0;

/// The value written into the status byte before a request is submitted
const STATUS_PENDING: u8 = 0xff;

/// The queue index that all requests are submitted through
const REQUEST_QUEUE: u32 = 0;

/// The memory that describes one block request.
///
/// It is split into three descriptors: the header up to and including `sector`, the `data` payload and the
/// `status` byte.
#[repr(C)]
pub struct BlkRequest {
    pub req_type: u32,
    pub reserved: u32,
    pub sector: u64,
    pub data: [u8; SECTOR_SIZE],
    pub status: u8,
}

/// Size of the part of a [`BlkRequest`] that the device reads as the request header
pub const BLK_REQUEST_HEADER_SIZE: usize = offset_of!(BlkRequest, data);

impl BlkRequest {
    /// Initialize the request memory at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of a `BlkRequest` and correctly aligned.
    pub unsafe fn init<'a>(ptr: *mut BlkRequest) -> &'a mut BlkRequest {
        ptr.cast::<u8>().write_bytes(0, size_of::<BlkRequest>());
        &mut *ptr
    }
}

impl Debug for BlkRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlkRequest")
            .field("req_type", &self.req_type)
            .field("sector", &self.sector)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Errors that prevent the device from being brought up
#[derive(Debug, Error, Eq, PartialEq)]
pub enum VirtioError {
    #[error("device has invalid magic value {0:#x}")]
    BadMagic(u32),
    #[error("device uses unsupported transport version {0}")]
    UnsupportedVersion(u32),
    #[error("expected a block device but found {0:?}")]
    WrongDevice(DeviceId),
    #[error("request queue is not available")]
    QueueUnavailable,
    #[error("request queue only supports {0} entries")]
    QueueTooSmall(u32),
}

/// Errors that a single block request can fail with
#[derive(Debug, Error, Eq, PartialEq)]
pub enum BlkError {
    #[error("device is not ready to accept requests")]
    NotReady,
    #[error("sector {sector} is beyond the device capacity of {capacity} sectors")]
    OutOfRange { sector: u64, capacity: u64 },
    #[error("device reported I/O status {0}")]
    Io(u8),
}

/// The progress of the device handshake
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverState {
    Uninitialized,
    Negotiating,
    Ready,
}

/// A driver for a virtio block device.
///
/// It owns exactly one virtqueue and keeps at most one request in flight.
/// Every request is described by the same three-descriptor chain starting at descriptor `0`.
pub struct VirtioBlk<'mem, T: Transport> {
    transport: T,
    queue: &'mem mut VirtQueue,
    request: &'mem mut BlkRequest,
    state: DriverState,
    /// The used ring index up to which completions have been consumed
    last_used: u16,
    /// Device capacity in sectors
    capacity: u64,
}

impl<'mem, T: Transport> VirtioBlk<'mem, T> {
    /// Create a driver for the device reachable through `transport`.
    ///
    /// `queue` and `request` must be addressable by the device under the same addresses that the CPU uses.
    pub fn new(transport: T, queue: &'mem mut VirtQueue, request: &'mem mut BlkRequest) -> Self {
        Self {
            transport,
            queue,
            request,
            state: DriverState::Uninitialized,
            last_used: 0,
            capacity: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// How many sectors the device holds
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Perform the device handshake and register the request queue.
    ///
    /// No optional features are negotiated.
    /// When the device is not a legacy virtio block device, it is left alone and an error is returned.
    pub fn init(&mut self) -> Result<(), VirtioError> {
        assert_eq!(
            self.state,
            DriverState::Uninitialized,
            "virtio-blk device is already initialized"
        );

        let magic = self.transport.magic();
        if magic != VIRTIO_MAGIC {
            return Err(VirtioError::BadMagic(magic));
        }
        let version = self.transport.version();
        if version != LEGACY_VERSION {
            return Err(VirtioError::UnsupportedVersion(version));
        }
        let device_id = self.transport.device_id();
        if device_id != DeviceId::BlockDevice {
            return Err(VirtioError::WrongDevice(device_id));
        }

        self.state = DriverState::Negotiating;
        log::debug!("found virtio-blk device, starting handshake");
        self.transport.set_status(DeviceStatus::empty());
        let mut status = DeviceStatus::ACKNOWLEDGE;
        self.transport.set_status(status);
        status |= DeviceStatus::DRIVER;
        self.transport.set_status(status);

        if let Err(e) = self.setup_queue() {
            self.transport.set_status(status | DeviceStatus::FAILED);
            return Err(e);
        }

        status |= DeviceStatus::DRIVER_OK;
        self.transport.set_status(status);
        self.capacity = u64::from(self.transport.read_config(0))
            | u64::from(self.transport.read_config(4)) << 32;
        self.state = DriverState::Ready;
        log::info!(
            "virtio-blk device is ready (capacity = {} sectors, {} bytes)",
            self.capacity,
            self.capacity * SECTOR_SIZE as u64
        );
        Ok(())
    }

    fn setup_queue(&mut self) -> Result<(), VirtioError> {
        if self.transport.queue_used(REQUEST_QUEUE) {
            return Err(VirtioError::QueueUnavailable);
        }
        let max_size = self.transport.max_queue_size(REQUEST_QUEUE);
        if max_size == 0 {
            return Err(VirtioError::QueueUnavailable);
        }
        if (max_size as usize) < QUEUE_SIZE {
            return Err(VirtioError::QueueTooSmall(max_size));
        }

        self.transport.set_guest_page_size(VirtQueue::ALIGN);
        self.transport.setup_queue(
            REQUEST_QUEUE,
            QUEUE_SIZE as u32,
            VirtQueue::ALIGN,
            &mut *self.queue as *mut VirtQueue as usize,
        );
        self.last_used = self.queue.used_idx();
        Ok(())
    }

    /// Transfer one sector between `buf` and the device and wait for the request to complete.
    ///
    /// If `is_write` is set, the content of `buf` is written to `sector`.
    /// Otherwise `sector` is read into `buf`.
    pub fn submit(
        &mut self,
        sector: u64,
        buf: &mut [u8; SECTOR_SIZE],
        is_write: bool,
    ) -> Result<(), BlkError> {
        if self.state != DriverState::Ready {
            return Err(BlkError::NotReady);
        }
        if sector >= self.capacity {
            return Err(BlkError::OutOfRange {
                sector,
                capacity: self.capacity,
            });
        }

        self.request.req_type = if is_write {
            VIRTIO_BLK_T_OUT
        } else {
            VIRTIO_BLK_T_IN
        };
        self.request.reserved = 0;
        self.request.sector = sector;
        if is_write {
            self.request.data.copy_from_slice(buf);
        }
        self.request.status = STATUS_PENDING;

        let request_addr = &mut *self.request as *mut BlkRequest as usize;
        let data_flags = if is_write {
            DescriptorFlags::empty()
        } else {
            DescriptorFlags::WRITE
        };
        self.queue.descriptors[0].describe(
            request_addr,
            BLK_REQUEST_HEADER_SIZE,
            DescriptorFlags::empty(),
            Some(1),
        );
        self.queue.descriptors[1].describe(
            request_addr + offset_of!(BlkRequest, data),
            SECTOR_SIZE,
            data_flags,
            Some(2),
        );
        self.queue.descriptors[2].describe(
            request_addr + offset_of!(BlkRequest, status),
            size_of::<u8>(),
            DescriptorFlags::WRITE,
            None,
        );

        self.queue.publish(0);
        fence(Ordering::SeqCst);
        self.transport.notify(REQUEST_QUEUE);

        let expected = self.last_used.wrapping_add(1);
        let mut used = self.queue.used_idx();
        while used == self.last_used {
            core::hint::spin_loop();
            used = self.queue.used_idx();
        }
        assert_eq!(
            used, expected,
            "virtio-blk device completed more requests than were submitted"
        );
        let completion = self.queue.used_elem(self.last_used);
        self.last_used = used;
        debug_assert_eq!(completion.id, 0);

        // the status byte may only be trusted after the used index advanced
        fence(Ordering::SeqCst);
        let status = unsafe { ptr::read_volatile(&self.request.status) };
        if status != VIRTIO_BLK_S_OK {
            log::warn!(
                "virtio-blk {} of sector {sector} failed with status {status}",
                if is_write { "write" } else { "read" }
            );
            return Err(BlkError::Io(status));
        }
        if !is_write {
            buf.copy_from_slice(&self.request.data);
        }
        Ok(())
    }

    /// Read `sector` into `buf`
    pub fn read_sector(&mut self, sector: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), BlkError> {
        self.submit(sector, buf, false)
    }

    /// Write `buf` into `sector`
    pub fn write_sector(&mut self, sector: u64, buf: &[u8; SECTOR_SIZE]) -> Result<(), BlkError> {
        let mut data = *buf;
        self.submit(sector, &mut data, true)
    }
}

use bitflags::bitflags;

/// The device types that are distinguished
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DeviceId {
    Invalid,
    NetworkCard,
    BlockDevice,
    Console,
    EntropySource,
    Other(u32),
}

impl From<u32> for DeviceId {
    fn from(value: u32) -> Self {
        match value {
            0 => DeviceId::Invalid,
            1 => DeviceId::NetworkCard,
            2 => DeviceId::BlockDevice,
            3 => DeviceId::Console,
            4 => DeviceId::EntropySource,
            other => DeviceId::Other(other),
        }
    }
}

bitflags! {
    /// The bits of the device status register
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct DeviceStatus: u32 {
        /// The guest OS has found the device and recognized it as a valid virtio device.
        const ACKNOWLEDGE = 1;
        /// The guest OS knows how to drive the device.
        const DRIVER = 2;
        /// The driver is set up and ready to drive the device.
        const DRIVER_OK = 4;
        /// Something went wrong in the guest, and it has given up on the device.
        const FAILED = 128;
    }
}

/// Access to the registers of a virtio device.
///
/// Queues are always addressed by their index.
/// All addresses handed to the device are the ones that the device can use for DMA.
pub trait Transport {
    /// The magic value which identifies a virtio device
    fn magic(&self) -> u32;

    /// The version of the transport
    fn version(&self) -> u32;

    fn device_id(&self) -> DeviceId;

    fn status(&self) -> DeviceStatus;

    fn set_status(&mut self, status: DeviceStatus);

    /// Tell the device the page size that queue addresses are expressed in
    fn set_guest_page_size(&mut self, size: u32);

    /// The maximum number of entries that queue `queue` supports.
    ///
    /// `0` means the queue does not exist.
    fn max_queue_size(&mut self, queue: u32) -> u32;

    /// Whether the queue `queue` is already in use
    fn queue_used(&mut self, queue: u32) -> bool;

    /// Register the queue memory located at `addr` with the given number of entries.
    ///
    /// The used ring is expected to start at the next multiple of `align` after the available ring.
    fn setup_queue(&mut self, queue: u32, size: u32, align: u32, addr: usize);

    /// Signal to the device that new requests are available in queue `queue`
    fn notify(&mut self, queue: u32);

    /// Read a word from the device specific configuration space
    fn read_config(&self, offset: usize) -> u32;
}

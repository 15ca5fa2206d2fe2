use crate::{DeviceId, DeviceStatus, Transport, PAGESIZE};
use core::mem::offset_of;
use regs::{RO, RW, WO};
use static_assertions::const_assert_eq;

/// The number of 32-bit words of device specific configuration that are exposed
const CONFIG_WORDS: usize = 8;

/// The register block of a device using the legacy virtio-mmio transport
///
/// See https://docs.oasis-open.org/virtio/virtio/v1.1/csprd01/virtio-v1.1-csprd01.html#x1-1560004
#[repr(C)]
pub struct VirtioRegisters {
    pub magic: RO<u32>,
    pub version: RO<u32>,
    pub device_id: RO<u32>,
    _reserved0: [RO<u32>; 7],
    pub guest_page_size: WO<u32>,
    _reserved1: RO<u32>,
    pub queue_sel: WO<u32>,
    pub queue_num_max: RO<u32>,
    pub queue_num: WO<u32>,
    pub queue_align: WO<u32>,
    pub queue_pfn: RW<u32>,
    _reserved2: [RO<u32>; 3],
    pub queue_notify: WO<u32>,
    _reserved3: [RO<u32>; 7],
    pub status: RW<u32>,
    _reserved4: [RO<u32>; 35],
    pub config: [RO<u32>; CONFIG_WORDS],
}

const_assert_eq!(offset_of!(VirtioRegisters, version), 0x04);
const_assert_eq!(offset_of!(VirtioRegisters, device_id), 0x08);
const_assert_eq!(offset_of!(VirtioRegisters, guest_page_size), 0x28);
const_assert_eq!(offset_of!(VirtioRegisters, queue_sel), 0x30);
const_assert_eq!(offset_of!(VirtioRegisters, queue_num_max), 0x34);
const_assert_eq!(offset_of!(VirtioRegisters, queue_num), 0x38);
const_assert_eq!(offset_of!(VirtioRegisters, queue_align), 0x3c);
const_assert_eq!(offset_of!(VirtioRegisters, queue_pfn), 0x40);
const_assert_eq!(offset_of!(VirtioRegisters, queue_notify), 0x50);
const_assert_eq!(offset_of!(VirtioRegisters, status), 0x70);
const_assert_eq!(offset_of!(VirtioRegisters, config), 0x100);

/// A [`Transport`] that talks to a device through its memory mapped registers
pub struct MmioTransport<'a> {
    regs: &'a VirtioRegisters,
}

impl<'a> MmioTransport<'a> {
    /// Create a handle to the device whose registers are mapped at `base`.
    ///
    /// # Safety
    /// `base` must point to the register block of a virtio-mmio device which stays mapped for `'a`.
    pub unsafe fn new(base: *mut VirtioRegisters) -> Self {
        Self { regs: &*base }
    }
}

impl Transport for MmioTransport<'_> {
    fn magic(&self) -> u32 {
        unsafe { self.regs.magic.read() }
    }

    fn version(&self) -> u32 {
        unsafe { self.regs.version.read() }
    }

    fn device_id(&self) -> DeviceId {
        DeviceId::from(unsafe { self.regs.device_id.read() })
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus::from_bits_retain(unsafe { self.regs.status.read() })
    }

    fn set_status(&mut self, status: DeviceStatus) {
        unsafe { self.regs.status.write(status.bits()) }
    }

    fn set_guest_page_size(&mut self, size: u32) {
        unsafe { self.regs.guest_page_size.write(size) }
    }

    fn max_queue_size(&mut self, queue: u32) -> u32 {
        unsafe {
            self.regs.queue_sel.write(queue);
            self.regs.queue_num_max.read()
        }
    }

    fn queue_used(&mut self, queue: u32) -> bool {
        unsafe {
            self.regs.queue_sel.write(queue);
            self.regs.queue_pfn.read() != 0
        }
    }

    fn setup_queue(&mut self, queue: u32, size: u32, align: u32, addr: usize) {
        assert_eq!(addr % PAGESIZE, 0, "queue memory must be page aligned");
        unsafe {
            self.regs.queue_sel.write(queue);
            self.regs.queue_num.write(size);
            self.regs.queue_align.write(align);
            self.regs.queue_pfn.write((addr / PAGESIZE) as u32);
        }
    }

    fn notify(&mut self, queue: u32) {
        unsafe { self.regs.queue_notify.write(queue) }
    }

    fn read_config(&self, offset: usize) -> u32 {
        assert_eq!(offset % 4, 0, "config space is read in aligned words");
        unsafe { self.regs.config[offset / 4].read() }
    }
}

// The registers are only ever accessed by the single hart that owns the driver.
unsafe impl Send for MmioTransport<'_> {}

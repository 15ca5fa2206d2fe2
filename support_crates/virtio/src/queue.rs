use crate::PAGESIZE;
use bitflags::bitflags;
use core::mem::{offset_of, size_of};
use core::ptr;
use static_assertions::{assert_eq_size, const_assert_eq};

/// How many descriptors the queue holds
pub const QUEUE_SIZE: usize = 16;

bitflags! {
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct DescriptorFlags: u16 {
        /// The buffer continues in the descriptor referenced by `next`
        const NEXT = 1;
        /// The buffer is written by the device instead of read
        const WRITE = 2;
    }
}

/// A singular entry in the descriptor table of a virtqueue
#[derive(Default, Clone, Copy, Debug)]
#[repr(C)]
pub struct Descriptor {
    pub address: u64,
    pub length: u32,
    pub flags: DescriptorFlags,
    pub next: u16,
}

assert_eq_size!(Descriptor, [u8; 16]);

impl Descriptor {
    /// Describe `length` bytes at `address` which are followed by the descriptor with index `next`
    pub fn describe(&mut self, address: usize, length: usize, flags: DescriptorFlags, next: Option<u16>) {
        self.address = address as u64;
        self.length = length as u32;
        self.flags = match next {
            Some(_) => flags | DescriptorFlags::NEXT,
            None => flags - DescriptorFlags::NEXT,
        };
        self.next = next.unwrap_or(0);
    }
}

/// The ring through which the driver offers descriptor chains to the device
#[derive(Debug)]
#[repr(C)]
pub struct AvailRing {
    pub flags: u16,
    pub idx: u16,
    pub ring: [u16; QUEUE_SIZE],
    pub used_event: u16,
}

/// An entry of the [`UsedRing`] announcing that a chain was processed
#[derive(Debug, Default, Copy, Clone)]
#[repr(C)]
pub struct UsedElem {
    /// Index of the head descriptor of the processed chain
    pub id: u32,
    /// Number of bytes written by the device
    pub len: u32,
}

/// The ring through which the device hands processed descriptor chains back to the driver
#[derive(Debug)]
#[repr(C, align(4096))]
pub struct UsedRing {
    pub flags: u16,
    pub idx: u16,
    pub ring: [UsedElem; QUEUE_SIZE],
    pub avail_event: u16,
}

/// A virtqueue in the legacy layout.
///
/// The descriptor table and available ring fill the first page while the used ring starts on the second page.
#[derive(Debug)]
#[repr(C, align(4096))]
pub struct VirtQueue {
    pub descriptors: [Descriptor; QUEUE_SIZE],
    pub avail: AvailRing,
    pub used: UsedRing,
}

const_assert_eq!(offset_of!(VirtQueue, avail), QUEUE_SIZE * size_of::<Descriptor>());
const_assert_eq!(offset_of!(VirtQueue, used), PAGESIZE);
const_assert_eq!(size_of::<VirtQueue>(), 2 * PAGESIZE);

impl VirtQueue {
    /// The alignment of the used ring which the device must be told about
    pub const ALIGN: u32 = PAGESIZE as u32;

    /// Initialize the queue memory at `ptr` so that no descriptor is offered and none was used.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of a `VirtQueue` and correctly aligned.
    pub unsafe fn init<'a>(ptr: *mut VirtQueue) -> &'a mut VirtQueue {
        ptr.cast::<u8>().write_bytes(0, size_of::<VirtQueue>());
        &mut *ptr
    }

    /// Offer the chain starting at descriptor `head` to the device
    pub fn publish(&mut self, head: u16) {
        let idx = self.avail_idx();
        self.avail.ring[idx as usize % QUEUE_SIZE] = head;
        // the ring entry must be visible before the index that announces it
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        unsafe { ptr::write_volatile(&mut self.avail.idx, idx.wrapping_add(1)) };
    }

    pub fn avail_idx(&self) -> u16 {
        unsafe { ptr::read_volatile(&self.avail.idx) }
    }

    /// The index the device will write the next completion to
    pub fn used_idx(&self) -> u16 {
        unsafe { ptr::read_volatile(&self.used.idx) }
    }

    /// The completion that the device wrote at position `idx` of the used ring
    pub fn used_elem(&self, idx: u16) -> UsedElem {
        unsafe { ptr::read_volatile(&self.used.ring[idx as usize % QUEUE_SIZE]) }
    }
}

//! Compile-time configuration of the kernel

use log::Level;
use riscv::mem::{PAddr, VAddr, PAGESIZE};
use static_assertions::{const_assert, const_assert_eq};

/// How many processes can be created during one boot, including the idle process
pub const PROCS_MAX: usize = 8;

/// The slot of the process table that holds the idle process
pub const IDLE_SLOT: usize = 0;

/// Size of the kernel stack that each process owns
pub const KERNEL_STACK_SIZE: usize = 8192;

/// The virtual address at which user images are loaded and start executing.
///
/// User programs are linked against this address.
pub const USER_BASE: VAddr = 0x1000_0000;

/// How many pages of stack are mapped directly below [`USER_BASE`]
pub const USER_STACK_PAGES: usize = 4;

/// Physical address of the legacy virtio-mmio register block of the block device.
///
/// It is identity mapped into every address space.
pub const VIRTIO_BLK_PADDR: PAddr = 0x1000_1000;

/// The largest user image that fits between [`USER_BASE`] and the virtio registers
pub const USER_IMAGE_MAX: usize = (VIRTIO_BLK_PADDR - USER_BASE) as usize;

const_assert!(USER_BASE < VIRTIO_BLK_PADDR);
const_assert!(USER_STACK_PAGES * PAGESIZE <= USER_BASE as usize);
const_assert_eq!(allocators::FRAME_SIZE, PAGESIZE);

/// The most verbose level that is logged
pub const LOG_LEVEL: Level = Level::Info;

/// The physical memory layout that the linker produced
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryLayout {
    /// Where the kernel image starts
    pub kernel_base: PAddr,
    /// First byte of memory that is not used by the kernel image or boot stack
    pub free_ram_start: PAddr,
    /// End (exclusive) of usable memory
    pub free_ram_end: PAddr,
}

impl MemoryLayout {
    /// Read the layout from the symbols that are defined by the linker script
    #[cfg(target_arch = "riscv32")]
    pub fn from_linker() -> Self {
        extern "C" {
            static __kernel_base: u8;
            static __free_ram: u8;
            static __free_ram_end: u8;
        }
        unsafe {
            Self {
                kernel_base: core::ptr::addr_of!(__kernel_base) as PAddr,
                free_ram_start: core::ptr::addr_of!(__free_ram) as PAddr,
                free_ram_end: core::ptr::addr_of!(__free_ram_end) as PAddr,
            }
        }
    }
}

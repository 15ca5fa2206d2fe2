//! Host stand-ins for physical memory

use crate::config::MemoryLayout;
use allocators::BumpAllocator;
use riscv::mem::{MemoryPage, PAddr, PhysMapping, PAGESIZE};
use std::vec::Vec;

/// The physical address at which test memory pretends to live
const TEST_RAM_PADDR: PAddr = 0x8400_0000;

/// A small kernel image followed by a few pages of free memory
pub fn test_layout() -> MemoryLayout {
    MemoryLayout {
        kernel_base: 0x8020_0000,
        free_ram_start: 0x8020_4000,
        free_ram_end: 0x8020_8000,
    }
}

/// Leak `pages` pages of host memory and hand them out as if they were physical memory at `TEST_RAM_PADDR`
pub fn test_memory(pages: usize) -> (BumpAllocator<'static>, PhysMapping) {
    let memory: &'static mut [MemoryPage] = Vec::leak(std::vec![MemoryPage::default(); pages]);
    let bytes = unsafe {
        core::slice::from_raw_parts_mut(memory.as_mut_ptr().cast::<u8>(), pages * PAGESIZE)
    };
    let phys_map = PhysMapping::new(bytes.as_ptr() as usize, TEST_RAM_PADDR, bytes.len());
    (BumpAllocator::new(bytes), phys_map)
}

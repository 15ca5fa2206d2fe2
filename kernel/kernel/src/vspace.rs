//! Per-process virtual address spaces

use crate::config::{MemoryLayout, VIRTIO_BLK_PADDR};
use allocators::{AllocInit, Allocator};
use core::alloc::Layout;
use core::ptr::NonNull;
use riscv::mem::{
    self, EntryFlags, MapError, PAddr, PageTable, PhysMapping, Translation, VAddr, PAGESIZE,
};

/// The root of an Sv32 page table hierarchy together with the knowledge of how to reach the physical memory that
/// backs it.
///
/// Every address space maps the whole kernel identity range with supervisor-only permissions so that trap handling
/// works no matter which one is active.
pub struct AddressSpace {
    root: NonNull<PageTable>,
    phys_map: PhysMapping,
}

// the page tables are only ever touched through the owning `AddressSpace`
unsafe impl Send for AddressSpace {}

impl AddressSpace {
    /// Create a new address space which has the kernel and the block device identity-mapped
    pub fn new<'a>(
        alloc: &impl Allocator<'a>,
        layout: &MemoryLayout,
        phys_map: PhysMapping,
    ) -> Result<Self, MapError> {
        let root = alloc
            .allocate(Layout::new::<PageTable>(), AllocInit::Uninitialized)?
            .as_mut_ptr()
            .cast();
        let root = PageTable::init(root);
        let mut vspace = Self {
            root: NonNull::from(unsafe { &mut *root }),
            phys_map,
        };

        let mut paddr = layout.kernel_base;
        while paddr < layout.free_ram_end {
            vspace.map(alloc, paddr, paddr, EntryFlags::RWX)?;
            paddr += PAGESIZE as PAddr;
        }
        vspace.map(
            alloc,
            VIRTIO_BLK_PADDR,
            VIRTIO_BLK_PADDR,
            EntryFlags::Read | EntryFlags::Write,
        )?;

        log::debug!(
            "created address space with root page table at {:#x}",
            vspace.root_paddr()
        );
        Ok(vspace)
    }

    /// Map the page at `vaddr` to the frame at `paddr`
    pub fn map<'a>(
        &mut self,
        alloc: &impl Allocator<'a>,
        vaddr: VAddr,
        paddr: PAddr,
        flags: EntryFlags,
    ) -> Result<(), MapError> {
        let root = unsafe { self.root.as_mut() };
        mem::map(alloc, root, &self.phys_map, vaddr, paddr, flags)
    }

    /// Back `pages` consecutive pages starting at `vaddr` with fresh zeroed frames and map them with `flags`.
    ///
    /// `content` is copied to the beginning of the new pages.
    pub fn map_fresh<'a>(
        &mut self,
        alloc: &impl Allocator<'a>,
        vaddr: VAddr,
        pages: usize,
        content: &[u8],
        flags: EntryFlags,
    ) -> Result<(), MapError> {
        assert!(
            content.len() <= pages * PAGESIZE,
            "{} bytes do not fit into {pages} pages",
            content.len()
        );
        for page in 0..pages {
            let frame = alloc.allocate_frames(1, AllocInit::Zeroed)?;
            let chunk = content.chunks(PAGESIZE).nth(page).unwrap_or(&[]);
            frame[..chunk.len()].copy_from_slice(chunk);

            let paddr = self.phys_map.rev_map(frame.as_ptr() as usize);
            self.map(alloc, vaddr + (page * PAGESIZE) as VAddr, paddr, flags)?;
        }
        Ok(())
    }

    /// Walk the page tables to find out where `vaddr` points to
    pub fn translate(&self, vaddr: VAddr) -> Option<Translation> {
        let root = unsafe { self.root.as_ref() };
        mem::translate(root, &self.phys_map, vaddr)
    }

    /// How physical memory is reachable from the kernel
    pub fn phys_map(&self) -> &PhysMapping {
        &self.phys_map
    }

    /// The physical address of the root page table
    pub fn root_paddr(&self) -> PAddr {
        self.phys_map.rev_map(self.root.as_ptr() as usize)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{test_layout, test_memory};

    #[test]
    fn test_kernel_and_device_are_identity_mapped() {
        let (alloc, phys_map) = test_memory(16);
        let layout = test_layout();
        let vspace = AddressSpace::new(&alloc, &layout, phys_map).unwrap();

        let kernel = vspace.translate(layout.kernel_base + 0x10).unwrap();
        assert_eq!(kernel.paddr, layout.kernel_base + 0x10);
        assert_eq!(kernel.flags, EntryFlags::RWX);

        let last = vspace.translate(layout.free_ram_end - 1).unwrap();
        assert_eq!(last.paddr, layout.free_ram_end - 1);

        let device = vspace.translate(VIRTIO_BLK_PADDR + 0x70).unwrap();
        assert_eq!(device.paddr, VIRTIO_BLK_PADDR + 0x70);
        assert!(!device.flags.contains(EntryFlags::User));

        assert_eq!(vspace.translate(layout.free_ram_end), None);
    }

    #[test]
    fn test_fresh_pages_hold_content() {
        let (alloc, phys_map) = test_memory(16);
        let mut vspace = AddressSpace::new(&alloc, &test_layout(), phys_map).unwrap();
        let content = [0xAB; PAGESIZE + 3];
        let flags = EntryFlags::Read | EntryFlags::User;
        vspace
            .map_fresh(&alloc, 0x0100_0000, 3, &content, flags)
            .unwrap();

        for (vaddr, expected) in [
            (0x0100_0000, 0xAB),
            (0x0100_1002, 0xAB),
            (0x0100_1003, 0),
            (0x0100_2000, 0),
        ] {
            let translation = vspace.translate(vaddr).unwrap();
            assert_eq!(translation.flags, flags);
            let byte = unsafe { *(phys_map.map(translation.paddr) as *const u8) };
            assert_eq!(byte, expected, "unexpected content at {vaddr:#x}");
        }
        assert_eq!(vspace.translate(0x0100_3000), None);
    }

    #[test]
    fn test_address_spaces_are_independent() {
        let (alloc, phys_map) = test_memory(32);
        let layout = test_layout();
        let mut first = AddressSpace::new(&alloc, &layout, phys_map).unwrap();
        let second = AddressSpace::new(&alloc, &layout, phys_map).unwrap();
        first
            .map_fresh(&alloc, 0x0100_0000, 1, &[1, 2, 3], EntryFlags::RWX | EntryFlags::User)
            .unwrap();

        assert_ne!(first.root_paddr(), second.root_paddr());
        assert!(first.translate(0x0100_0000).is_some());
        assert_eq!(second.translate(0x0100_0000), None);
    }
}

//! Manipulation of and interaction with the virtual address mapping configuration

use crate::mem::paddr::PAddr;
use crate::mem::vaddr::VAddr;
use crate::mem::{paddr, vaddr, EntryFlags, PageTable};
use allocators::{AllocError, AllocInit, Allocator};
use core::alloc::Layout;
use thiserror_no_std::Error;

/// Description of an area in accessible memory from which the physical memory is loadable
///
/// The physical address `base` is loadable from `start` and the mapping stays valid for the next `size` bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PhysMapping {
    pub start: usize,
    pub base: PAddr,
    pub size: usize,
}

impl PhysMapping {
    /// Return the mapping which describes addresses being identity-mapped.
    /// That is, physical addresses can be loaded from their value directly and do not need to be
    /// mapped.
    pub const fn identity() -> Self {
        Self {
            start: 0,
            base: 0,
            size: usize::MAX,
        }
    }

    /// Create a new instance describing the physical memory from `base` onwards being available at `start`.
    pub const fn new(start: usize, base: PAddr, size: usize) -> Self {
        Self { start, base, size }
    }

    /// Resolve the given physical address into its loadable mapped variant.
    ///
    /// This method is intended to be used when the input is an address that is understood by the memory management
    /// unit while the output is an address that is loadable by the CPU right now.
    pub fn map(&self, addr: PAddr) -> usize {
        assert!(
            addr >= self.base && ((addr - self.base) as usize) < self.size,
            "physical address {addr:#x} is outside of the mapped physical memory"
        );
        self.start + (addr - self.base) as usize
    }

    /// Reverse-resolve the given mapped address to its actual hardware address.
    ///
    /// This method is intended to be used when the input is an address that is loadable by the CPU right now while
    /// the output is one that is understood by the memory management unit.
    pub fn rev_map(&self, addr: usize) -> PAddr {
        assert!(
            addr >= self.start && addr - self.start < self.size,
            "address {addr:#x} does not point into mapped physical memory"
        );
        self.base + (addr - self.start) as PAddr
    }
}

/// The error returned when an address mapping could not be set up
#[derive(Debug, Error, Eq, PartialEq)]
pub enum MapError {
    #[error("could not allocate an intermediate page table: {0}")]
    NoMemory(#[from] AllocError),
    #[error("virtual address {0:#x} is already mapped")]
    AlreadyMapped(VAddr),
}

/// The result of walking the page table hierarchy for one virtual address
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Translation {
    /// The physical address that the virtual address resolves to
    pub paddr: PAddr,
    /// The access permissions of the mapping, see [`EntryFlags::PERMISSIONS`]
    pub flags: EntryFlags,
}

/// Map the 4 KiB page at `vaddr` to the physical frame at `paddr` with the given `flags`.
///
/// The mapping is set up in the given `root` PageTable.
/// If the covering root entry is still empty, a second-level table is allocated from `alloc`.
/// All physical addresses stored in page tables are made loadable through `phys_map` before being accessed.
///
/// Mapping an address that is already mapped is refused with [`MapError::AlreadyMapped`].
pub fn map<'a>(
    alloc: &impl Allocator<'a>,
    root_pagetable: &mut PageTable,
    phys_map: &PhysMapping,
    vaddr: VAddr,
    paddr: PAddr,
    flags: EntryFlags,
) -> Result<(), MapError> {
    log::trace!(
        "configuring address translation mapping {vaddr:#x} -> {paddr:#x} (flags={flags:?}) in page table {root_pagetable:p}"
    );

    // check some preconditions
    assert!(
        flags.intersects(EntryFlags::RWX),
        "an address mapping must set either Read, Write or Execute bits"
    );
    assert_eq!(
        paddr::page_offset(paddr),
        0,
        "cannot use non page-aligned paddr {paddr:#x} as the target of a virtual address mapping"
    );
    assert_eq!(
        vaddr::page_offset(vaddr),
        0,
        "cannot use non page-aligned vaddr {vaddr:#x} as the source of a virtual address mapping"
    );

    let vpn = vaddr::vpn_segments(vaddr);
    let table = make_through_mapping(root_pagetable, vpn[1], phys_map, alloc)?;

    let entry = &mut table.entries[vpn[0]];
    if entry.is_valid() {
        return Err(MapError::AlreadyMapped(vaddr));
    }
    unsafe {
        entry.set(
            paddr,
            (flags & EntryFlags::PERMISSIONS) | EntryFlags::Dirty | EntryFlags::Accessed,
        )
    };
    Ok(())
}

fn make_through_mapping<'a, 'b>(
    table: &mut PageTable,
    entry_no: usize,
    phys_map: &PhysMapping,
    alloc: &impl Allocator<'a>,
) -> Result<&'b mut PageTable, MapError> {
    let entry = &mut table.entries[entry_no];
    match entry.get_addr() {
        Ok(addr) => {
            assert!(
                !entry.is_leaf(),
                "cannot map a single page inside of a megapage mapping"
            );
            let addr = phys_map.map(addr);
            Ok(unsafe { &mut *(addr as *mut PageTable) })
        }
        Err(_) => {
            log::trace!("mapping requires new second-level page table");
            let through_table = alloc
                .allocate(Layout::new::<PageTable>(), AllocInit::Uninitialized)?
                .as_mut_ptr()
                .cast();
            let through_table = PageTable::init(through_table);
            unsafe { entry.set(phys_map.rev_map(through_table as usize), EntryFlags::Valid) };
            Ok(unsafe { &mut *through_table })
        }
    }
}

/// Translate the given `vaddr` by walking the hierarchy of pagetables in software.
///
/// The mapping is translated starting from the given root pagetable.
/// All *intermediate* addresses read from page tables are passed through `phys_map` to make them loadable by the CPU.
/// The returned address is notably *not* passed through `phys_map`.
///
/// `None` is returned if `vaddr` is not mapped.
pub fn translate(
    root_pagetable: &PageTable,
    phys_map: &PhysMapping,
    vaddr: VAddr,
) -> Option<Translation> {
    let vpn = vaddr::vpn_segments(vaddr);

    // root table to second-level table
    let entry = &root_pagetable.entries[vpn[1]];
    let addr = entry.get_addr().ok()?;
    if entry.is_leaf() {
        return Some(Translation {
            paddr: addr | (vaddr & (vaddr::MEGAPAGE_SIZE - 1)),
            flags: entry.get_flags() & EntryFlags::PERMISSIONS,
        });
    }
    let table = unsafe { &*(phys_map.map(addr) as *const PageTable) };

    // second-level table to final entry
    let entry = &table.entries[vpn[0]];
    let addr = entry.get_addr().ok()?;
    if !entry.is_leaf() {
        log::warn!("page table walk for {vaddr:#x} found a pointer entry at the last level");
        return None;
    }
    Some(Translation {
        paddr: addr | vaddr::page_offset(vaddr),
        flags: entry.get_flags() & EntryFlags::PERMISSIONS,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem::PAGESIZE;
    use allocators::BumpAllocator;
    use std::boxed::Box;

    const ARENA_PAGES: usize = 8;
    const ARENA_PADDR: PAddr = 0x8000_0000;

    #[repr(C, align(4096))]
    struct Arena([u8; ARENA_PAGES * PAGESIZE]);

    /// A piece of host memory that pretends to be physical memory at `ARENA_PADDR`
    fn arena() -> (BumpAllocator<'static>, PhysMapping) {
        let arena = Box::leak(Box::new(Arena([0; ARENA_PAGES * PAGESIZE])));
        let phys_map = PhysMapping::new(
            arena.0.as_ptr() as usize,
            ARENA_PADDR,
            ARENA_PAGES * PAGESIZE,
        );
        (BumpAllocator::new(&mut arena.0), phys_map)
    }

    #[test]
    fn test_phys_mapping_roundtrip() {
        let phys_map = PhysMapping::new(0x1000_0000, 0x8000_0000, 0x1000);
        assert_eq!(phys_map.map(0x8000_0010), 0x1000_0010);
        assert_eq!(phys_map.rev_map(0x1000_0010), 0x8000_0010);
        assert_eq!(PhysMapping::identity().map(0x1234), 0x1234);
    }

    #[test]
    fn test_map_then_translate_returns_frame_and_flags() {
        let (alloc, phys_map) = arena();
        let mut root = Box::new(PageTable::empty());
        let mappings = [
            (0x0100_0000, 0x8765_4000, EntryFlags::RWX | EntryFlags::User),
            (0x0100_1000, 0x8765_5000, EntryFlags::Read | EntryFlags::User),
            (0x1000_1000, 0x1000_1000, EntryFlags::Read | EntryFlags::Write),
        ];
        for (vaddr, paddr, flags) in mappings {
            map(&alloc, &mut root, &phys_map, vaddr, paddr, flags).unwrap();
        }

        for (vaddr, paddr, flags) in mappings {
            assert_eq!(
                translate(&root, &phys_map, vaddr + 0x123),
                Some(Translation {
                    paddr: paddr + 0x123,
                    flags
                })
            );
        }
        // two distinct root entries were needed
        assert_eq!(alloc.num_allocations(), 2);
    }

    #[test]
    fn test_unmapped_addresses_do_not_translate() {
        let (alloc, phys_map) = arena();
        let mut root = Box::new(PageTable::empty());
        assert_eq!(translate(&root, &phys_map, 0x0100_0000), None);

        map(&alloc, &mut root, &phys_map, 0x0100_0000, 0x8000_0000, EntryFlags::Read).unwrap();
        // same second-level table, different entry
        assert_eq!(translate(&root, &phys_map, 0x0100_2000), None);
        // different root entry
        assert_eq!(translate(&root, &phys_map, 0x0200_0000), None);
    }

    #[test]
    fn test_double_mapping_is_refused() {
        let (alloc, phys_map) = arena();
        let mut root = Box::new(PageTable::empty());
        map(&alloc, &mut root, &phys_map, 0x4000, 0x8000_0000, EntryFlags::Read).unwrap();
        assert_eq!(
            map(&alloc, &mut root, &phys_map, 0x4000, 0x8000_1000, EntryFlags::Read),
            Err(MapError::AlreadyMapped(0x4000))
        );
    }

    #[test]
    fn test_exhausted_allocator_is_reported() {
        let mut backing = Box::new(Arena([0; ARENA_PAGES * PAGESIZE]));
        let phys_map = PhysMapping::new(
            backing.0.as_ptr() as usize,
            ARENA_PADDR,
            ARENA_PAGES * PAGESIZE,
        );
        // too small to hold a second-level table
        let alloc = BumpAllocator::new(&mut backing.0[..100]);
        let mut root = Box::new(PageTable::empty());
        assert_eq!(
            map(&alloc, &mut root, &phys_map, 0x4000, 0x8000_0000, EntryFlags::Read),
            Err(MapError::NoMemory(AllocError::InsufficientMemory))
        );
    }

    #[test]
    fn test_megapage_entries_are_translated() {
        let phys_map = PhysMapping::identity();
        let mut root = Box::new(PageTable::empty());
        unsafe {
            root.entries[2].set(0x8040_0000, EntryFlags::Read | EntryFlags::Execute)
        };
        assert_eq!(
            translate(&root, &phys_map, 0x0081_2345),
            Some(Translation {
                paddr: 0x8041_2345,
                flags: EntryFlags::Read | EntryFlags::Execute
            })
        );
    }
}

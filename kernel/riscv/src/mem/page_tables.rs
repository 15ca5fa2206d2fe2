use super::{MemoryPage, PageTableEntry, PAGESIZE};
use core::mem;
use core::mem::MaybeUninit;
use static_assertions::{assert_eq_align, assert_eq_size};

/// The number of entries in every Sv32 page table
pub const PAGE_TABLE_ENTRIES: usize = PAGESIZE / mem::size_of::<PageTableEntry>();

/// A PageTable for configuring virtual memory mapping.
///
/// It exactly fills 4096 bytes which is also the size of mapped pages.
#[repr(C, align(4096))]
pub struct PageTable {
    pub entries: [PageTableEntry; PAGE_TABLE_ENTRIES],
}

assert_eq_size!(PageTable, MemoryPage);
assert_eq_align!(PageTable, MemoryPage);
assert_eq_size!([PageTableEntry; 1024], MemoryPage);

impl PageTable {
    /// Create a table in which no entry is valid
    pub const fn empty() -> Self {
        Self {
            entries: [PageTableEntry::empty(); PAGE_TABLE_ENTRIES],
        }
    }

    /// Initialize the given page with an empty `PageTable`
    pub fn init(page: *mut MaybeUninit<PageTable>) -> *mut PageTable {
        log::trace!("initializing empty pagetable at {page:p}");
        for i in 0..PAGE_TABLE_ENTRIES {
            unsafe {
                page.cast::<PageTableEntry>()
                    .add(i)
                    .write(PageTableEntry::empty());
            }
        }
        page.cast::<PageTable>()
    }
}

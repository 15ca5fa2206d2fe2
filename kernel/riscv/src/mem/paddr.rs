/// Type alias for physical addresses.
///
/// This is used by functions that explicitly interpret addresses as physical ones.
pub type PAddr = u32;

pub const PAGE_OFFSET_BITS: u32 = 12;
pub const PAGE_OFFSET_MASK: PAddr = (1 << PAGE_OFFSET_BITS) - 1;

/// Get the physical page number encoded in a physical address
#[inline]
pub fn ppn(paddr: PAddr) -> u32 {
    paddr >> PAGE_OFFSET_BITS
}

/// Construct the physical address at which the given physical page starts
#[inline]
pub fn from_ppn(ppn: u32) -> PAddr {
    ppn << PAGE_OFFSET_BITS
}

/// Get the page offset from a physical address
#[inline]
pub fn page_offset(paddr: PAddr) -> PAddr {
    paddr & PAGE_OFFSET_MASK
}

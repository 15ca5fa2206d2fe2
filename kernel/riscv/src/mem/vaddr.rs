/// Type alias for virtual addresses.
///
/// This is used by functions that explicitly interpret addresses as virtual ones.
pub type VAddr = u32;

pub const PAGE_OFFSET_BITS: u32 = 12;
pub const PAGE_OFFSET_MASK: VAddr = (1 << PAGE_OFFSET_BITS) - 1;

const VPN_SEGMENT_BITS: u32 = 10;
const VPN_SEGMENT_MASK: VAddr = (1 << VPN_SEGMENT_BITS) - 1;

/// The number of bytes mapped by a single root table entry
pub const MEGAPAGE_SIZE: VAddr = 1 << (PAGE_OFFSET_BITS + VPN_SEGMENT_BITS);

/// Get the VPN (virtual page number) segments from a virtual address.
///
/// Index `0` holds `VPN[0]` which selects an entry in a second-level table and index `1` holds `VPN[1]` which
/// selects an entry in the root table.
#[inline]
pub fn vpn_segments(vaddr: VAddr) -> [usize; 2] {
    [
        ((vaddr >> PAGE_OFFSET_BITS) & VPN_SEGMENT_MASK) as usize,
        ((vaddr >> (PAGE_OFFSET_BITS + VPN_SEGMENT_BITS)) & VPN_SEGMENT_MASK) as usize,
    ]
}

/// Get the page offset from a virtual address
#[inline]
pub fn page_offset(vaddr: VAddr) -> VAddr {
    vaddr & PAGE_OFFSET_MASK
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vpn_segments_are_extracted() {
        assert_eq!(vpn_segments(0x0100_0000), [0, 4]);
        assert_eq!(vpn_segments(0x1000_1000), [1, 64]);
        assert_eq!(vpn_segments(0xFFFF_FFFF), [1023, 1023]);
        assert_eq!(page_offset(0x1000_1ABC), 0xABC);
    }
}

use super::PAGESIZE;
use crate::mem::paddr;
use crate::mem::paddr::PAddr;
use bitflags::bitflags;
use core::fmt::{Binary, Debug, Formatter, LowerHex, Write};

/// An entry of a [`PageTable`](super::PageTable) responsible for mapping virtual to phyiscal adresses.
///
/// # Format
/// The PTE format for Sv32 is shown in the below figure.
/// - Bits 7–0 have the meaning as described by [`EntryFlags`].
/// - Bits 9–8 (RSW) are ignored by the hardware implementation and can be freely used by sofware.
///
/// ```text
///  31      20 19      10 9   8  7   6   5   4   3   2   1   0
/// ┌──────────┬──────────┬─────┬───┬───┬───┬───┬───┬───┬───┬───┐
/// │  PPN[1]  │  PPN[0]  │ RSW │ D │ A │ G │ U │ X │ W │ R │ V │
/// └──────────┴──────────┴─────┴───┴───┴───┴───┴───┴───┴───┴───┘
///    12bit      10bit    2bit
///                  Sv32 Page Table Entry
/// ```
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(C, align(4))]
pub struct PageTableEntry {
    pub(crate) entry: u32,
}

const FLAG_BITS: u32 = 8;
const FLAG_MASK: u32 = (1 << FLAG_BITS) - 1;
const PPN_OFFSET: u32 = 10;
const PPN_BITS: u32 = 22;
const PPN_MASK: u32 = ((1 << PPN_BITS) - 1) << PPN_OFFSET;

impl PageTableEntry {
    /// Create a new empty entry.
    ///
    /// This entry does not point to anything and is considered disabled by the hardware.
    pub const fn empty() -> Self {
        Self { entry: 0 }
    }

    /// Whether this entry is currently valid (in other words whether it is considered active)
    pub fn is_valid(&self) -> bool {
        self.get_flags().contains(EntryFlags::Valid)
    }

    /// Whether this is a leaf entry not pointing to further [`PageTable`](super::PageTable)s.
    pub fn is_leaf(&self) -> bool {
        self.get_flags().intersects(EntryFlags::RWX)
    }

    /// Return the flags which are encoded in this entry
    pub fn get_flags(&self) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.entry & FLAG_MASK)
    }

    /// Return the address which this entry points to
    pub fn get_addr(&self) -> Result<PAddr, EntryInvalidErr> {
        match self.is_valid() {
            false => Err(EntryInvalidErr),
            true => Ok(paddr::from_ppn((self.entry & PPN_MASK) >> PPN_OFFSET)),
        }
    }

    /// Set the content of this entry.
    ///
    /// This function also automatically enables the entry by setting the [`Valid`](EntryFlags::Valid) flag.
    ///
    /// If you want to disable the entry use [`clear()`](PageTableEntry::clear) instead.
    ///
    /// # Safety
    /// Changing the entry of a PageTable inherently changes virtual address mappings.
    /// This can make other, completely unrelated, references and pointers invalid and must always be done with
    /// care.
    pub unsafe fn set(&mut self, addr: PAddr, flags: EntryFlags) {
        assert_eq!(
            paddr::page_offset(addr),
            0,
            "cannot set page table entry to unaligned PAddr {:#x}",
            addr
        );
        log::trace!(
            "setting page table entry {:#x}:{} to {:#x} with flags {flags:?}",
            (self as *mut Self as usize) & !(PAGESIZE - 1),
            ((self as *mut Self as usize) & (PAGESIZE - 1)) / core::mem::size_of::<Self>(),
            addr
        );

        self.entry = (paddr::ppn(addr) << PPN_OFFSET) | (flags | EntryFlags::Valid).bits();
    }

    /// Clear the content of this entry, setting it to 0x0 and removing all flags.
    ///
    /// # Safety
    /// Changing the entry of a PageTable inherently changes virtual address mappings.
    /// This can make other, completely unrelated, references and pointers invalid and must always be done with
    /// care.
    pub unsafe fn clear(&mut self) {
        self.entry = 0;
    }
}

impl Default for PageTableEntry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for PageTableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.get_addr() {
            Err(_) => f.write_str("PageTableEntry (invalid) { .. }"),
            Ok(addr) => f.write_fmt(format_args!(
                "PageTableEntry {{ addr: {:#010x}, flags: {:?} }}",
                addr,
                self.get_flags()
            )),
        }
    }
}

impl Binary for PageTableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Binary::fmt(&self.entry, f)
    }
}

impl LowerHex for PageTableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        LowerHex::fmt(&self.entry, f)
    }
}

bitflags! {
    /// The flags that can be set on a [`PageTableEntry`]
    #[derive(Copy, Clone, Eq, PartialEq)]
    pub struct EntryFlags: u32 {
        /// If set, the MMU considers this a valid entry in the page table and uses it for address mapping
        const Valid = 1 << 0;
        /// Allows reading from the mapped page
        const Read = 1 << 1;
        /// Allows writing from the mapped page
        const Write = 1 << 2;
        /// Allows executing code from the mapped page
        const Execute = 1 << 3;
        /// Makes the page accessible **from user mode**.
        /// Supervisor mode may then only access it when `sstatus.SUM` is set and never execute from it.
        const User = 1 << 4;
        /// If set, the MMU considers this entry to be present in **all** address space IDs and caches them accordingly.
        const Global = 1 << 5;
        /// Set by the MMU when something has read from the page since the mapping was set up
        const Accessed = 1 << 6;
        /// Set by the MMU when something has written to the page since the mapping was set up
        const Dirty = 1 << 7;

        const RWX = Self::Read.bits() | Self::Write.bits() | Self::Execute.bits();

        /// The flags describing who may access a mapping and how
        const PERMISSIONS = Self::RWX.bits() | Self::User.bits() | Self::Global.bits();
    }
}

impl Debug for EntryFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for (bit, c) in [
            (EntryFlags::Dirty, 'D'),
            (EntryFlags::Accessed, 'A'),
            (EntryFlags::Global, 'G'),
            (EntryFlags::User, 'U'),
            (EntryFlags::Execute, 'X'),
            (EntryFlags::Write, 'W'),
            (EntryFlags::Read, 'R'),
            (EntryFlags::Valid, 'V'),
        ] {
            f.write_char(if self.contains(bit) { c } else { '-' })?;
        }
        Ok(())
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct EntryInvalidErr;

#[cfg(test)]
mod test {
    use super::*;
    use std::format;

    #[test]
    fn test_address_is_correctly_loaded() {
        let entry = PageTableEntry {
            entry: (0x80203 << 10) | 0b1111,
        };
        assert_eq!(entry.get_addr().unwrap(), 0x8020_3000);
        assert!(entry.is_leaf());
    }

    #[test]
    fn test_address_is_correctly_set() {
        let mut entry = PageTableEntry::empty();
        unsafe { entry.set(0x8004_2000, EntryFlags::Read | EntryFlags::User) };
        assert_eq!(entry.entry, (0x80042 << 10) | 0b1_0011);
        assert_eq!(
            entry.get_flags(),
            EntryFlags::Valid | EntryFlags::Read | EntryFlags::User
        );
    }

    #[test]
    fn test_non_leaf_entry() {
        let mut entry = PageTableEntry::empty();
        assert_eq!(entry.get_addr(), Err(EntryInvalidErr));
        unsafe { entry.set(0x8000_1000, EntryFlags::Valid) };
        assert!(entry.is_valid());
        assert!(!entry.is_leaf());
        unsafe { entry.clear() };
        assert!(!entry.is_valid());
    }

    #[test]
    #[should_panic(expected = "unaligned")]
    fn test_unaligned_address_is_rejected() {
        let mut entry = PageTableEntry::empty();
        unsafe { entry.set(0x8000_0010, EntryFlags::Read) };
    }

    #[test]
    fn test_flags_debug_output() {
        let flags = EntryFlags::Valid | EntryFlags::Read | EntryFlags::Write | EntryFlags::User;
        assert_eq!(format!("{flags:?}"), "---U-WRV");
    }
}

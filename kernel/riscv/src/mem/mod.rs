//! Data-Structures and Definitions for Sv32 Virtual-Addressing
//!
//! # Virtual Addressing Basics
//!
//! Sv32 implementations support a 32-bit virtual address space, divided into 4 KiB pages.
//! An Sv32 address is partitioned as shown in the below figure.
//!
//! ```text
//! 31           22 21          12 11            0
//! ┌──────────────┬──────────────┬───────────────┐
//! │    VPN[1]    │    VPN[0]    │  page offset  │
//! └──────────────┴──────────────┴───────────────┘
//!     10bits         10bits          12bits
//!              Sv32 Virtual Address
//! ```
//!
//! The two VPN (virtual page number) segments index a two-level page table hierarchy.
//! The root table holds 1024 entries, each of which either maps a 4 MiB megapage directly or points to a
//! second-level table of another 1024 entries that map single 4 KiB pages.
//! The 12-bit page offset is untranslated and carried over into the physical address.
//!
//! ```text
//! 33                   22 21          12 11            0
//! ┌──────────────────────┬──────────────┬───────────────┐
//! │        PPN[1]        │    PPN[0]    │  page offset  │
//! └──────────────────────┴──────────────┴───────────────┘
//!          12bits             10bits          12bits
//!                  Sv32 Physical Address
//! ```
//!
//! Physical addresses are 34 bits wide in theory.
//! This crate models them as `u32` which covers all memory of the supported boards.

mod mapping;
mod page_table_entry;
mod page_tables;
pub mod paddr;
pub mod vaddr;

pub use mapping::*;
pub use paddr::PAddr;
pub use page_table_entry::*;
pub use page_tables::*;
pub use vaddr::VAddr;

use core::ops::{Deref, DerefMut};

/// How large each page in the memory of a riscv board is.
///
/// This effects the alignment and sizes of some data structures that directly interface with the CPU e.g. PageTables
pub const PAGESIZE: usize = 4096;

/// The `MODE` bit of the `satp` register that selects Sv32 translation
pub const SATP_SV32: usize = 1 << 31;

/// Type definition for a slice of bytes that is exactly one page large and aligned to it as well
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(C, align(4096))]
pub struct MemoryPage([u8; PAGESIZE]);

impl Deref for MemoryPage {
    type Target = [u8; PAGESIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for MemoryPage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self([0u8; PAGESIZE])
    }
}

/// Compute the `satp` value that activates Sv32 translation through the root page table located at `root`.
///
/// No ASID is used.
pub fn satp_sv32(root: PAddr) -> usize {
    assert_eq!(
        paddr::page_offset(root),
        0,
        "root page table at {root:#x} is not page aligned"
    );
    SATP_SV32 | paddr::ppn(root) as usize
}

/// Round `value` up to the next multiple of `align` which must be a power of two
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

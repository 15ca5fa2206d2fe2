//! Handling of CPU control and status registers
//!
//! This module implements some dummy structs which each model a certain cpu register as it is defined in
//! Chapter 4 of the [Risc-V Privileged Specification](https://github.com/riscv/riscv-isa-manual/releases/download/Priv-v1.12/riscv-privileged-20211203.pdf)

use crate::mem::PAddr;
use crate::trap::TrapEvent;
use bitflags::bitflags;
use core::arch::asm;

/// Generate code to read from a specific register.
///
/// # Example:
/// ```text
/// let val = read_reg!("sstatus");
/// ```
macro_rules! read_reg {
    ($csr:literal) => {{
        let res: usize;
        asm!(concat!("csrr {}, ", $csr), out(reg) res);
        res
    }};
}

/// Generate code to write to a specific register.
macro_rules! write_reg {
    ($csr:literal, $value:expr) => {
        asm!(concat!("csrw ", $csr, ", {}"), in(reg) $value)
    };
}

/// Generate code to set specific register bits but leave others untouched
macro_rules! set_reg {
    ($csr:literal, $value:expr) => {
        asm!(concat!("csrs ", $csr, ", {}"), in(reg) $value)
    };
}

/// Generate code to clear specific register bits but leave others untouched
macro_rules! clear_reg {
    ($csr:literal, $value:expr) => {
        asm!(concat!("csrc ", $csr, ", {}"), in(reg) $value)
    };
}

/// Supervisor Status Register.
///
/// Only the bits that decide where `SRET` returns to are modelled.
pub struct SStatus {}

bitflags! {
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct SStatusFlags: usize {
        /// The privilege mode a hart was executing in before entering supervisor mode.
        /// `SRET` returns to user mode if it is `0`.
        const SPP = 1 << 8;
        /// Whether supervisor interrupts were enabled prior to trapping into supervisor mode.
        /// `SRET` copies it into `SIE`.
        const SPIE = 1 << 5;
    }
}

impl SStatus {
    pub fn read() -> SStatusFlags {
        SStatusFlags::from_bits_truncate(unsafe { read_reg!("sstatus") })
    }

    /// Set the given flags and leave the others untouched.
    ///
    /// # Safety
    /// Because writing to this register can change how the processor operates it is fundamentally unsafe.
    pub unsafe fn set(flags: SStatusFlags) {
        set_reg!("sstatus", flags.bits())
    }

    /// Clear the given flags and leave the others untouched.
    ///
    /// # Safety
    /// Because writing to this register can change how the processor operates it is fundamentally unsafe.
    pub unsafe fn clear(flags: SStatusFlags) {
        clear_reg!("sstatus", flags.bits())
    }
}

/// Supervisor Trap Vector Base Address Register.
///
/// Holds the address at which the hart starts executing when a trap is taken.
/// Only direct mode is used so all traps enter at the same address.
pub struct StVec {}

impl StVec {
    /// Direct all traps to the function located at `handler`.
    ///
    /// # Safety
    /// `handler` must be a correctly aligned trap entry routine which never returns normally.
    pub unsafe fn write(handler: usize) {
        assert_eq!(handler & 0b11, 0, "trap handler {handler:#x} must be 4-byte aligned");
        write_reg!("stvec", handler)
    }
}

/// Supervisor Scratch Register.
///
/// Holds the top of the kernel stack belonging to the currently running process so that the trap entry can swap
/// to it.
pub struct SScratch {}

impl SScratch {
    /// # Safety
    /// The trap entry code relies on this register pointing to a usable kernel stack.
    pub unsafe fn write(value: usize) {
        write_reg!("sscratch", value)
    }
}

/// Supervisor Exception Program Counter.
///
/// The address of the instruction that was interrupted by a trap and to which `SRET` returns.
pub struct Sepc {}

impl Sepc {
    pub fn read() -> usize {
        unsafe { read_reg!("sepc") }
    }

    /// # Safety
    /// Returning from a trap continues execution at `value`.
    pub unsafe fn write(value: usize) {
        write_reg!("sepc", value)
    }
}

/// Supervisor Cause Register.
///
/// Indicates the event that caused the last trap.
pub struct Scause {}

impl Scause {
    pub fn read_raw() -> usize {
        unsafe { read_reg!("scause") }
    }

    pub fn read() -> TrapEvent {
        TrapEvent::from(Self::read_raw())
    }
}

/// Supervisor Trap Value Register.
///
/// Holds the faulting address or instruction of the last trap, depending on its cause.
pub struct StVal {}

impl StVal {
    pub fn read() -> usize {
        unsafe { read_reg!("stval") }
    }
}

/// Supervisor Address Translation and Protection Register.
pub struct Satp {}

impl Satp {
    /// Activate Sv32 translation through the root page table located at `root` and flush stale translations.
    ///
    /// # Safety
    /// The currently executing code and its stack must be mapped in the new address space.
    pub unsafe fn activate(root: PAddr) {
        let value = crate::mem::satp_sv32(root);
        asm!(
            "sfence.vma",
            "csrw satp, {}",
            "sfence.vma",
            in(reg) value,
        );
    }
}

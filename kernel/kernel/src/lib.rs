//! A minimal kernel for 32-bit RISC-V machines.
//!
//! It runs a handful of user processes cooperatively, each in its own Sv32 address space, and offers them a tiny
//! flat file system that is persisted as a tar image on a virtio block device.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod console;
pub mod fs;
pub mod process;
pub mod sched;
pub mod trap;
pub mod uaccess;
pub mod vspace;

mod syscalls;

#[cfg(target_arch = "riscv32")]
#[path = "arch/riscv32.rs"]
pub mod arch;

#[cfg(test)]
mod test_utils;

use crate::console::Console;
use crate::process::ProcessTable;
use tarfs::{BlockDevice, FileTable};

/// Exclusive access to all kernel state that trap handling may touch
pub struct KernelContext<'a> {
    pub procs: &'a mut ProcessTable,
    pub files: &'a mut FileTable,
    pub disk: &'a mut dyn BlockDevice,
    pub console: &'a dyn Console,
}

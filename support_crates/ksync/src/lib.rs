//! Kernel Synchronisation Primitives
#![no_std]

mod kernel_cell;

pub use kernel_cell::{Guard, KernelCell};

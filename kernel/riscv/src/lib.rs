#![no_std]

#[cfg(test)]
extern crate std;

#[cfg(target_arch = "riscv32")]
pub mod cpu;
pub mod mem;
pub mod trap;
pub mod utils;

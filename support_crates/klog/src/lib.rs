#![no_std]

#[cfg(test)]
extern crate std;

mod kernel_logger;
mod sink;

pub use kernel_logger::KernelLogger;
pub use sink::*;

//! Memory allocators usable without a global heap
#![no_std]

#[cfg(test)]
extern crate std;

mod bump_allocator;
mod traits;

pub use bump_allocator::BumpAllocator;
pub use traits::{AllocError, AllocInit, Allocator, FRAME_SIZE};

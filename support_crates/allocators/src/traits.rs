use core::alloc::{Layout, LayoutError};
use thiserror_no_std::Error;

/// Size and alignment of the frames handed out by [`Allocator::allocate_frames`]
pub const FRAME_SIZE: usize = 4096;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AllocError {
    #[error("out of memory")]
    InsufficientMemory,
    #[error("unsatisfiable allocation layout")]
    LayoutError(#[from] LayoutError),
}

/// Content of freshly allocated memory
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub enum AllocInit {
    /// Left as found. Only for memory that the caller overwrites completely before reading it.
    Uninitialized,
    #[default]
    Zeroed,
}

/// Source of page tables, user frames and device buffers.
///
/// Memory lives as long as `'mem` and is never returned.
pub trait Allocator<'mem> {
    /// Hand out a block that satisfies `layout`.
    ///
    /// # Panics
    /// When `layout` is zero-sized.
    fn allocate(&self, layout: Layout, init: AllocInit) -> Result<&'mem mut [u8], AllocError>;

    /// Hand out `count` physically contiguous frames starting on a [`FRAME_SIZE`] boundary.
    fn allocate_frames(&self, count: usize, init: AllocInit) -> Result<&'mem mut [u8], AllocError> {
        let size = FRAME_SIZE
            .checked_mul(count)
            .ok_or(AllocError::InsufficientMemory)?;
        self.allocate(Layout::from_size_align(size, FRAME_SIZE)?, init)
    }
}

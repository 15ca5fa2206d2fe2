use crate::{AllocError, AllocInit, Allocator};
use core::alloc::Layout;
use core::ptr;
use ksync::KernelCell;

#[derive(Debug, Eq, PartialEq, Hash)]
struct AllocatorState<'mem> {
    backing_mem: &'mem mut [u8],
    bytes_allocated: usize,
    num_allocations: usize,
}

/// A simple allocator implementation which bumps a marker in the backing memory to denote what has already been
/// allocated.
///
/// ```text
///   ┌────────────────── backing memory ────────────────────┐
///   │                                                      │
/// [0xA, 0xA, 0xA, 0xA, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0]
///                  ^
///       marker ────┘
/// ```
///
/// Allocations of arbitrary size and alignment are supported.
/// The marker only ever moves forward, so once the backing memory is used up every further allocation fails with
/// [`AllocError::InsufficientMemory`].
#[derive(Debug)]
pub struct BumpAllocator<'mem> {
    state: KernelCell<AllocatorState<'mem>>,
}

impl<'mem> BumpAllocator<'mem> {
    /// Create a new bump allocator that allocates from the given backing memory region.
    pub fn new(backing_mem: &'mem mut [u8]) -> Self {
        log::debug!(
            "bump allocator manages {:p} -- {:p} ({} bytes)",
            backing_mem.as_ptr(),
            backing_mem.as_ptr_range().end,
            backing_mem.len()
        );
        Self {
            state: KernelCell::new(AllocatorState {
                backing_mem,
                bytes_allocated: 0,
                num_allocations: 0,
            }),
        }
    }

    /// Create a new allocator that allocates from the memory region between `start` and `end`
    ///
    /// # Safety
    /// The entire memory area must be accessible and otherwise completely unused.
    pub unsafe fn new_raw(start: *mut u8, end: *mut u8) -> Self {
        assert!(start <= end);
        Self::new(&mut *ptr::slice_from_raw_parts_mut(
            start,
            end as usize - start as usize,
        ))
    }

    /// How much free space (in bytes) remains in the allocators backing memory.
    ///
    /// Note that alignment padding may make less than this amount actually allocatable.
    pub fn free_bytes(&self) -> usize {
        let state = self.state.borrow_mut();
        state.backing_mem.len() - state.bytes_allocated
    }

    /// How many allocations have been handed out so far
    pub fn num_allocations(&self) -> usize {
        self.state.borrow_mut().num_allocations
    }
}

impl<'mem> Allocator<'mem> for BumpAllocator<'mem> {
    fn allocate(&self, layout: Layout, init: AllocInit) -> Result<&'mem mut [u8], AllocError> {
        assert!(layout.size() > 0, "must allocate at least 1 byte");

        let result = {
            let mut state = self.state.borrow_mut();

            let unaligned_ptr = state.backing_mem.as_ptr() as usize + state.bytes_allocated;
            let aligned_ptr = unaligned_ptr
                .checked_add(layout.align() - 1)
                .ok_or(AllocError::InsufficientMemory)?
                & !(layout.align() - 1);
            let bytes_to_allocate = aligned_ptr - unaligned_ptr + layout.size();

            // check that there even is enough space to allocate the requested amount
            if state
                .backing_mem
                .len()
                .saturating_sub(state.bytes_allocated)
                < bytes_to_allocate
            {
                log::warn!(
                    "bump allocator cannot fit {} bytes (align {}), only {} bytes left",
                    layout.size(),
                    layout.align(),
                    state.backing_mem.len() - state.bytes_allocated
                );
                return Err(AllocError::InsufficientMemory);
            }

            state.num_allocations += 1;
            state.bytes_allocated += bytes_to_allocate;

            // the marker guarantees that handed out slices never overlap
            unsafe { &mut *ptr::slice_from_raw_parts_mut(aligned_ptr as *mut u8, layout.size()) }
        };

        log::trace!(
            "allocated {} bytes: {:p} -- {:p}",
            layout.size(),
            result.as_ptr(),
            result.as_ptr_range().end
        );

        match init {
            AllocInit::Zeroed => result.fill(0),
            AllocInit::Uninitialized => {}
        }

        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::FRAME_SIZE;
    use std::boxed::Box;

    #[repr(C, align(4096))]
    struct Arena([u8; 4 * 4096]);

    fn arena() -> &'static mut [u8] {
        let arena = Box::leak(Box::new(Arena([0xFF; 4 * 4096])));
        &mut arena.0
    }

    #[test]
    fn test_allocations_are_aligned_and_disjoint() {
        let alloc = BumpAllocator::new(arena());
        let a = alloc
            .allocate(Layout::from_size_align(10, 1).unwrap(), AllocInit::Zeroed)
            .unwrap();
        let b = alloc
            .allocate(Layout::from_size_align(4096, 4096).unwrap(), AllocInit::Zeroed)
            .unwrap();
        assert_eq!(b.as_ptr() as usize % 4096, 0);
        assert!(a.as_ptr_range().end <= b.as_ptr());
        assert_eq!(alloc.num_allocations(), 2);
    }

    #[test]
    fn test_init_selects_content() {
        let alloc = BumpAllocator::new(arena());
        let zeroed = alloc
            .allocate(Layout::from_size_align(64, 8).unwrap(), AllocInit::Zeroed)
            .unwrap();
        assert!(zeroed.iter().all(|&b| b == 0));
        let raw = alloc
            .allocate(Layout::from_size_align(64, 8).unwrap(), AllocInit::Uninitialized)
            .unwrap();
        assert!(raw.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_frames_start_on_frame_boundary() {
        let alloc = BumpAllocator::new(arena());
        alloc
            .allocate(Layout::from_size_align(3, 1).unwrap(), AllocInit::Zeroed)
            .unwrap();
        let frame = alloc.allocate_frames(1, AllocInit::Zeroed).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame.as_ptr() as usize % FRAME_SIZE, 0);
        assert_eq!(
            alloc.allocate_frames(usize::MAX, AllocInit::Zeroed),
            Err(AllocError::InsufficientMemory)
        );
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let alloc = BumpAllocator::new(arena());
        let pages = alloc
            .allocate_frames(4, AllocInit::Zeroed)
            .unwrap();
        assert_eq!(pages.len(), 4 * 4096);
        assert_eq!(alloc.free_bytes(), 0);
        assert_eq!(
            alloc.allocate_frames(1, AllocInit::Zeroed),
            Err(AllocError::InsufficientMemory)
        );
    }

    #[test]
    fn test_alignment_padding_counts_against_capacity() {
        let alloc = BumpAllocator::new(arena());
        alloc
            .allocate(Layout::from_size_align(1, 1).unwrap(), AllocInit::Uninitialized)
            .unwrap();
        // the padding up to the next page makes the remaining three pages the maximum
        assert!(alloc
            .allocate_frames(4, AllocInit::Zeroed)
            .is_err());
        assert!(alloc
            .allocate_frames(3, AllocInit::Zeroed)
            .is_ok());
    }
}

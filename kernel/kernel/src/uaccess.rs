//! Copying data between the kernel and the memory of a user process
//!
//! User pointers are never dereferenced directly.
//! Instead, every page of a user buffer is translated through the page tables of the process and must be mapped
//! with user permissions.

use crate::vspace::AddressSpace;
use riscv::mem::{vaddr, EntryFlags, VAddr, PAGESIZE};
use syscall_abi::SyscallError;
use thiserror_no_std::Error;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum UserAccessError {
    #[error("user address {addr:#x} is not mapped")]
    Unmapped { addr: VAddr },
    #[error("user address {addr:#x} is not accessible with {required:?} permissions")]
    Forbidden { addr: VAddr, required: EntryFlags },
    #[error("user buffer at {addr:#x} with length {len} does not fit into the address space")]
    OutOfBounds { addr: usize, len: usize },
}

impl From<UserAccessError> for SyscallError {
    fn from(value: UserAccessError) -> Self {
        log::debug!("rejecting syscall argument: {value}");
        SyscallError::InvalidArg
    }
}

/// Fill `buf` with the user memory starting at `addr`
pub fn copy_from_user(
    vspace: &AddressSpace,
    addr: usize,
    buf: &mut [u8],
) -> Result<(), UserAccessError> {
    for_each_user_chunk(vspace, addr, buf.len(), EntryFlags::Read, |offset, chunk| {
        buf[offset..offset + chunk.len()].copy_from_slice(chunk);
    })
}

/// Copy `data` into user memory starting at `addr`
pub fn copy_to_user(vspace: &AddressSpace, addr: usize, data: &[u8]) -> Result<(), UserAccessError> {
    for_each_user_chunk(vspace, addr, data.len(), EntryFlags::Write, |offset, chunk| {
        chunk.copy_from_slice(&data[offset..offset + chunk.len()]);
    })
}

/// Split the user buffer `addr..addr+len` at page boundaries and call `f` with the offset into the buffer and the
/// kernel-accessible memory of each piece.
///
/// Every page is checked before any piece is handed to `f` so that nothing is copied if the buffer is partially
/// inaccessible.
fn for_each_user_chunk(
    vspace: &AddressSpace,
    addr: usize,
    len: usize,
    required: EntryFlags,
    mut f: impl FnMut(usize, &mut [u8]),
) -> Result<(), UserAccessError> {
    let start = VAddr::try_from(addr).map_err(|_| UserAccessError::OutOfBounds { addr, len })?;
    let end = VAddr::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .ok_or(UserAccessError::OutOfBounds { addr, len })?;

    let required = required | EntryFlags::User;
    let chunks = || {
        let mut vaddr = start;
        core::iter::from_fn(move || {
            if vaddr >= end {
                return None;
            }
            let chunk_len = (PAGESIZE - vaddr::page_offset(vaddr) as usize).min((end - vaddr) as usize);
            let chunk = (vaddr, chunk_len);
            vaddr += chunk_len as VAddr;
            Some(chunk)
        })
    };

    for (vaddr, _) in chunks() {
        let translation = vspace
            .translate(vaddr)
            .ok_or(UserAccessError::Unmapped { addr: vaddr })?;
        if !translation.flags.contains(required) {
            return Err(UserAccessError::Forbidden {
                addr: vaddr,
                required,
            });
        }
    }

    for (vaddr, chunk_len) in chunks() {
        let translation = vspace
            .translate(vaddr)
            .ok_or(UserAccessError::Unmapped { addr: vaddr })?;
        let ptr = vspace.phys_map().map(translation.paddr) as *mut u8;
        let chunk = unsafe { core::slice::from_raw_parts_mut(ptr, chunk_len) };
        f((vaddr - start) as usize, chunk);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{test_layout, test_memory};

    const BASE: VAddr = 0x0100_0000;

    /// An address space with one read-only and two writable user pages followed by a supervisor-only page
    fn user_vspace() -> AddressSpace {
        let (alloc, phys_map) = test_memory(16);
        let mut vspace = AddressSpace::new(&alloc, &test_layout(), phys_map).unwrap();
        vspace
            .map_fresh(&alloc, BASE, 1, b"hello", EntryFlags::User | EntryFlags::Read)
            .unwrap();
        vspace
            .map_fresh(
                &alloc,
                BASE + 0x1000,
                2,
                &[],
                EntryFlags::User | EntryFlags::Read | EntryFlags::Write,
            )
            .unwrap();
        vspace
            .map_fresh(&alloc, BASE + 0x3000, 1, &[], EntryFlags::RWX)
            .unwrap();
        vspace
    }

    #[test]
    fn test_copy_from_user() {
        let vspace = user_vspace();
        let mut buf = [0; 5];
        copy_from_user(&vspace, BASE as usize, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_copy_across_page_boundary() {
        let vspace = user_vspace();
        let data: std::vec::Vec<u8> = (0..200).collect();
        let addr = BASE as usize + 0x2000 - 100;
        copy_to_user(&vspace, addr, &data).unwrap();

        let mut back = [0; 200];
        copy_from_user(&vspace, addr, &mut back).unwrap();
        assert_eq!(&back[..], &data[..]);
    }

    #[test]
    fn test_empty_buffers_need_no_mapping() {
        let vspace = user_vspace();
        copy_to_user(&vspace, 0x10, &[]).unwrap();
    }

    #[test]
    fn test_read_only_pages_are_not_written() {
        let vspace = user_vspace();
        assert_eq!(
            copy_to_user(&vspace, BASE as usize, b"x"),
            Err(UserAccessError::Forbidden {
                addr: BASE,
                required: EntryFlags::User | EntryFlags::Write
            })
        );
    }

    #[test]
    fn test_partially_forbidden_buffers_are_untouched() {
        let vspace = user_vspace();
        let addr = BASE as usize + 0x3000 - 2;
        assert_eq!(
            copy_to_user(&vspace, addr, b"abcd"),
            Err(UserAccessError::Forbidden {
                addr: BASE + 0x3000,
                required: EntryFlags::User | EntryFlags::Write
            })
        );
        let mut buf = [0xFF; 2];
        copy_from_user(&vspace, addr, &mut buf).unwrap();
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn test_kernel_memory_is_not_readable() {
        let vspace = user_vspace();
        let kernel = test_layout().kernel_base;
        let mut buf = [0; 4];
        assert!(matches!(
            copy_from_user(&vspace, kernel as usize, &mut buf),
            Err(UserAccessError::Forbidden { .. })
        ));
        assert_eq!(
            copy_from_user(&vspace, 0x10, &mut buf),
            Err(UserAccessError::Unmapped { addr: 0x10 })
        );
    }

    #[test]
    fn test_wrapping_buffers_are_rejected() {
        let vspace = user_vspace();
        let mut buf = [0; 16];
        assert_eq!(
            copy_from_user(&vspace, 0xFFFF_FFF8, &mut buf),
            Err(UserAccessError::OutOfBounds {
                addr: 0xFFFF_FFF8,
                len: 16
            })
        );
        assert_eq!(
            SyscallError::from(UserAccessError::Unmapped { addr: 0 }),
            SyscallError::InvalidArg
        );
    }
}

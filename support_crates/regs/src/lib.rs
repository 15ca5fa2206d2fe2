//! Typed views of memory mapped device registers
//!
//! A register block is described as a `#[repr(C)]` struct whose fields are [`Reg`]s.
//! Placing a reference to such a struct over the device's MMIO window then gives every
//! register a name, a width and a set of permitted operations:
//!
//! ```ignore
//! #[repr(C)]
//! struct Device {
//!     magic: RO<u32>,
//!     control: RW<u32>,
//!     doorbell: WO<u32>,
//! }
//! ```
//!
//! All accesses are performed as volatile reads or writes so that the compiler never elides, merges or
//! reorders them relative to other volatile accesses.
#![no_std]

use core::cell::UnsafeCell;
use core::fmt::{Debug, Formatter};
use core::marker::PhantomData;
use core::ptr;

/// Marker for registers that may only be read from
pub struct ReadOnly;

/// Marker for registers that may only be written to
pub struct WriteOnly;

/// Marker for registers that support both reading and writing
pub struct ReadWrite;

/// Access markers that permit reading
pub trait Readable {}

/// Access markers that permit writing
pub trait Writable {}

impl Readable for ReadOnly {}
impl Readable for ReadWrite {}
impl Writable for WriteOnly {}
impl Writable for ReadWrite {}

/// A single memory mapped register holding a `T`.
///
/// `Access` is one of [`ReadOnly`], [`WriteOnly`] or [`ReadWrite`] and decides which of
/// [`read()`](Reg::read), [`write()`](Reg::write) and [`modify()`](Reg::modify) are available.
#[repr(transparent)]
pub struct Reg<Access, T: Copy> {
    value: UnsafeCell<T>,
    _access: PhantomData<Access>,
}

/// A register that allows **only read** interactions
pub type RO<T> = Reg<ReadOnly, T>;

/// A register that allows **only write** interactions
pub type WO<T> = Reg<WriteOnly, T>;

/// A register that allows **read and write** interactions
pub type RW<T> = Reg<ReadWrite, T>;

impl<Access, T: Copy> Reg<Access, T> {
    /// Create a register that is backed by ordinary memory holding `value`.
    ///
    /// This is mostly useful for emulating a device in memory.
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
            _access: PhantomData,
        }
    }

    /// The address of this register
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut T {
        self.value.get()
    }
}

impl<Access: Readable, T: Copy> Reg<Access, T> {
    /// Read the current value of the register.
    ///
    /// # Safety
    /// Reading from a device register may have side effects on the device.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        ptr::read_volatile(self.as_ptr())
    }
}

impl<Access: Writable, T: Copy> Reg<Access, T> {
    /// Write a new value into the register.
    ///
    /// # Safety
    /// Writing to a device register may have side effects on the device.
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        ptr::write_volatile(self.as_ptr(), value)
    }
}

impl<T: Copy> Reg<ReadWrite, T> {
    /// Read the register, pass its value through `f` and write the result back.
    ///
    /// # Safety
    /// Both the read and the write may have side effects on the device.
    #[inline(always)]
    pub unsafe fn modify<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        self.write(f(self.read()))
    }
}

impl<Access, T: Copy> Debug for Reg<Access, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Reg @ {:p}", self.as_ptr())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[repr(C)]
    struct Block {
        id: RO<u32>,
        ctrl: RW<u32>,
        kick: WO<u16>,
    }

    #[test]
    fn test_read_write_roundtrip() {
        let reg = RW::new(5u32);
        unsafe {
            assert_eq!(reg.read(), 5);
            reg.write(42);
            assert_eq!(reg.read(), 42);
        }
    }

    #[test]
    fn test_modify_updates_in_place() {
        let reg = RW::new(0b0001u32);
        unsafe {
            reg.modify(|v| v | 0b0100);
            assert_eq!(reg.read(), 0b0101);
        }
    }

    #[test]
    fn test_write_only_register_is_observable_through_ptr() {
        let block = Block {
            id: RO::new(0x7472_6976),
            ctrl: RW::new(0),
            kick: WO::new(0),
        };
        unsafe {
            block.kick.write(3);
            assert_eq!(*block.kick.as_ptr(), 3);
            assert_eq!(block.id.read(), 0x7472_6976);
            assert_eq!(block.ctrl.read(), 0);
        }
    }

    #[test]
    fn test_register_block_has_packed_c_layout() {
        assert_eq!(core::mem::size_of::<RO<u32>>(), 4);
        assert_eq!(core::mem::offset_of!(Block, ctrl), 4);
        assert_eq!(core::mem::offset_of!(Block, kick), 8);
    }
}

//! ABI definitions for calling into the kernel and interpreting its results
//!
//! # Syscall Overview
//!
//! Currently, the following syscalls are defined:
//!
//! | Syscall | Number | Arguments | Return | Summary |
//! |--------|:-----------:|-----------|--------|---------|
//! | [put_char](put_char::PutChar) | *1* | [PutCharArgs](put_char::PutCharArgs) | [NoValue] | Put a single byte on the kernels attached console |
//! | [get_char](get_char::GetChar) | *2* | [NoValue] | `u8` | Read a single byte from the console, waiting until one is available |
//! | [exit](exit::Exit) | *3* | [ExitArgs](exit::ExitArgs) | *does not return* | Terminate the calling process |
//! | [read_file](read_file::ReadFile) | *4* | [FileArgs] | `usize` | Copy the content of a named file into a buffer |
//! | [write_file](write_file::WriteFile) | *5* | [FileArgs] | `usize` | Replace the content of a named file and persist it |
//! | [yield](yield::Yield) | *6* | [NoValue] | [NoValue] | Yield execution back to the scheduler |
//!
//! # Calling Conventions
//!
//! When executing an `ecall` (syscall) asm instructions, the kernel honors a certain custom calling
//! convention to read syscall arguments and return syscall results.
//!
//! ## Argument Registers
//!
//! When entering the kernel, it reads syscall arguments from the 5 registers `a0-a4`.
//! `a0` must hold a valid syscall number while the other 4 registers are used to store arguments
//! to that syscall.
//! Their exact meaning depend on the syscall.
//!
//! ## Return Registers
//!
//! When returning to userspace, the kernel writes data to the 2 registers `a0-a1`.
//! `a0` holds a general status code (0 = success or one of the [`SyscallError`](crate::SyscallError)
//! definitions) while `a1` holds the value produced by a successful syscall.

#![no_std]

#[cfg(test)]
extern crate std;

mod errors;
mod file_args;
pub mod exit;
pub mod get_char;
pub mod put_char;
pub mod read_file;
mod traits;
pub mod write_file;
pub mod r#yield;

pub use errors::SyscallError;
pub use file_args::FileArgs;
pub use traits::*;

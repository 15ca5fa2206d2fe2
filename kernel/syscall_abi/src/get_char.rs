//! Definitions for the `get_char` syscall
//!
//! The kernel does not return to the caller until a byte was read from the console.
//! While none is available, other processes are scheduled.

use crate::{NoValue, SyscallBinding, SyscallResult};

pub struct GetChar;

pub type GetCharReturn = SyscallResult<u8>;

impl SyscallBinding for GetChar {
    const SYSCALL_NO: usize = 2;
    type CallArgs = NoValue;
    type Return = GetCharReturn;
}

//! Definitions for the `read_file` syscall
//!
//! At most `buf_len` bytes of the file are copied into the buffer and the number of copied bytes is returned.

use crate::{FileArgs, SyscallBinding, SyscallResult};

pub struct ReadFile;

pub type ReadFileReturn = SyscallResult<usize>;

impl SyscallBinding for ReadFile {
    const SYSCALL_NO: usize = 4;
    type CallArgs = FileArgs;
    type Return = ReadFileReturn;
}

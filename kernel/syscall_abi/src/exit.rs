//! Definitions for the `exit` syscall

use crate::{NoValue, RawSyscallArgs, SyscallBinding, SyscallResult};

#[derive(Debug)]
pub struct Exit;

/// The exit code the process reports
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ExitArgs(pub usize);

impl From<RawSyscallArgs> for ExitArgs {
    fn from(value: RawSyscallArgs) -> Self {
        Self(value[0])
    }
}

impl From<ExitArgs> for RawSyscallArgs {
    fn from(value: ExitArgs) -> Self {
        [value.0, 0, 0, 0]
    }
}

impl SyscallBinding for Exit {
    const SYSCALL_NO: usize = 3;
    type CallArgs = ExitArgs;
    type Return = SyscallResult<NoValue>;
}

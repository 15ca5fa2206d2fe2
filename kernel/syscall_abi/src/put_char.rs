//! Definitions for the `put_char` syscall

use crate::{NoValue, RawSyscallArgs, SyscallBinding, SyscallError, SyscallResult};

pub struct PutChar;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PutCharArgs(pub u8);

pub type PutCharReturn = SyscallResult<NoValue>;

impl TryFrom<RawSyscallArgs> for PutCharArgs {
    type Error = SyscallError;

    fn try_from(value: RawSyscallArgs) -> Result<Self, Self::Error> {
        u8::try_from(value[0])
            .map(Self)
            .map_err(|_| SyscallError::InvalidArg)
    }
}

impl From<PutCharArgs> for RawSyscallArgs {
    fn from(value: PutCharArgs) -> Self {
        [value.0 as usize, 0, 0, 0]
    }
}

impl SyscallBinding for PutChar {
    const SYSCALL_NO: usize = 1;
    type CallArgs = PutCharArgs;
    type Return = PutCharReturn;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_only_bytes_are_accepted() {
        assert_eq!(PutCharArgs::try_from([b'a' as usize, 0, 0, 0]), Ok(PutCharArgs(b'a')));
        assert_eq!(
            PutCharArgs::try_from([0x1_00usize, 0, 0, 0]),
            Err(SyscallError::InvalidArg)
        );
    }
}

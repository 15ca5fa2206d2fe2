//! Definitions for the `write_file` syscall
//!
//! The file is created if it does not exist yet.
//! Its previous content is replaced by the buffer and the whole file system is written back to disk before the
//! syscall returns.

use crate::{FileArgs, SyscallBinding, SyscallResult};

pub struct WriteFile;

pub type WriteFileReturn = SyscallResult<usize>;

impl SyscallBinding for WriteFile {
    const SYSCALL_NO: usize = 5;
    type CallArgs = FileArgs;
    type Return = WriteFileReturn;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RawSyscallArgs;

    #[test]
    fn test_file_args_use_register_order() {
        let raw: RawSyscallArgs = [0x100, 5, 0x200, 1024];
        let args = FileArgs::from(raw);
        assert_eq!(args.name_len, 5);
        assert_eq!(args.buf_ptr, 0x200);
        assert_eq!(RawSyscallArgs::from(args), raw);
    }
}

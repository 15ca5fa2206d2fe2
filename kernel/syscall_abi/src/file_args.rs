use crate::RawSyscallArgs;

/// The arguments shared by the file syscalls.
///
/// Both the name and the buffer are passed as pointer and length in the address space of the calling process.
/// The name is not null-terminated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FileArgs {
    pub name_ptr: usize,
    pub name_len: usize,
    pub buf_ptr: usize,
    pub buf_len: usize,
}

impl From<RawSyscallArgs> for FileArgs {
    fn from(value: RawSyscallArgs) -> Self {
        let [name_ptr, name_len, buf_ptr, buf_len] = value;
        Self {
            name_ptr,
            name_len,
            buf_ptr,
            buf_len,
        }
    }
}

impl From<FileArgs> for RawSyscallArgs {
    fn from(value: FileArgs) -> Self {
        [value.name_ptr, value.name_len, value.buf_ptr, value.buf_len]
    }
}

use crate::fs::syscall_error;
use crate::sched::Schedule;
use crate::syscalls::handler_trait::SyscallHandler;
use crate::syscalls::SyscallContext;
use crate::uaccess::{copy_from_user, copy_to_user};
use crate::vspace::AddressSpace;
use crate::KernelContext;
use syscall_abi::read_file::{ReadFile, ReadFileReturn};
use syscall_abi::write_file::{WriteFile, WriteFileReturn};
use syscall_abi::{FileArgs, SyscallError, SyscallResult};
use tarfs::{FILE_CAPACITY, NAME_LEN};

pub(super) struct ReadFileHandler;

impl SyscallHandler for ReadFileHandler {
    type Syscall = ReadFile;

    fn handle(
        &mut self,
        kernel_ctx: &mut KernelContext,
        _syscall_ctx: &mut SyscallContext<'_>,
        args: FileArgs,
    ) -> (Schedule, ReadFileReturn) {
        (Schedule::Keep, read_file(kernel_ctx, args))
    }
}

/// Every successful write is flushed to disk right away so that it survives a reboot.
///
/// This is the only place that persists the file table.
pub(super) struct WriteFileHandler;

impl SyscallHandler for WriteFileHandler {
    type Syscall = WriteFile;

    fn handle(
        &mut self,
        kernel_ctx: &mut KernelContext,
        _syscall_ctx: &mut SyscallContext<'_>,
        args: FileArgs,
    ) -> (Schedule, WriteFileReturn) {
        (Schedule::Keep, write_file(kernel_ctx, args))
    }
}

fn read_file(ctx: &mut KernelContext, args: FileArgs) -> SyscallResult<usize> {
    let vspace = ctx.procs.current_vspace();
    let mut name = [0; NAME_LEN];
    let name = user_file_name(vspace, &args, &mut name)?;

    let mut data = [0; FILE_CAPACITY];
    let len = args.buf_len.min(FILE_CAPACITY);
    let copied = ctx.files.read(name, &mut data[..len]).map_err(syscall_error)?;
    copy_to_user(vspace, args.buf_ptr, &data[..copied])?;
    Ok(copied)
}

/// Replace the content of a file and persist the whole file table
fn write_file(ctx: &mut KernelContext, args: FileArgs) -> SyscallResult<usize> {
    if args.buf_len > FILE_CAPACITY {
        return Err(SyscallError::TooLarge);
    }
    let vspace = ctx.procs.current_vspace();
    let mut name = [0; NAME_LEN];
    let name = user_file_name(vspace, &args, &mut name)?;

    let mut data = [0; FILE_CAPACITY];
    let data = &mut data[..args.buf_len];
    copy_from_user(vspace, args.buf_ptr, data)?;

    let written = ctx.files.write(name, data).map_err(syscall_error)?;
    ctx.files.flush(&mut *ctx.disk).map_err(|e| {
        log::error!("could not persist file system: {e}");
        syscall_error(e)
    })?;
    Ok(written)
}

fn user_file_name<'n>(
    vspace: &AddressSpace,
    args: &FileArgs,
    buf: &'n mut [u8; NAME_LEN],
) -> SyscallResult<&'n [u8]> {
    if args.name_len == 0 || args.name_len > NAME_LEN {
        return Err(SyscallError::InvalidArg);
    }
    let name = &mut buf[..args.name_len];
    copy_from_user(vspace, args.name_ptr, name)?;
    Ok(name)
}

use crate::sched::Schedule;
use crate::syscalls::SyscallContext;
use crate::KernelContext;
use core::any::type_name;
use syscall_abi::{
    IntoRawSysResponse, NoValue, RawSyscallArgs, SyscallBinding, SyscallError, SyscallResult,
};

/// A trait for handling a specific syscall in the most bare-bones way possible.
///
/// Argument decoding and writing results into the calling process' registers is entirely left up to the
/// implementation.
pub(super) trait RawSyscallHandler {
    type Syscall: SyscallBinding;

    fn handle_raw(
        &mut self,
        kernel_ctx: &mut KernelContext,
        syscall_ctx: &mut SyscallContext<'_>,
        raw_args: RawSyscallArgs,
    ) -> Schedule;
}

/// A trait for handling most syscalls.
///
/// The `RawSyscallHandler` auto-implementation on top of this guarantees the following:
/// 1. Decode syscall specific arguments from `RawSyscallArgs` and log them.
///    Arguments that cannot be decoded are answered with [`SyscallError::InvalidArg`] without calling the handler.
/// 2. *Execute this handler*
/// 3. Log the result and write it into the calling process' registers
pub(super) trait SyscallHandler {
    type Syscall: SyscallBinding;

    fn handle(
        &mut self,
        kernel_ctx: &mut KernelContext,
        syscall_ctx: &mut SyscallContext<'_>,
        args: <<Self as SyscallHandler>::Syscall as SyscallBinding>::CallArgs,
    ) -> (
        Schedule,
        <<Self as SyscallHandler>::Syscall as SyscallBinding>::Return,
    );
}

impl<Handler: SyscallHandler> RawSyscallHandler for Handler {
    type Syscall = <Handler as SyscallHandler>::Syscall;

    fn handle_raw(
        &mut self,
        kernel_ctx: &mut KernelContext,
        syscall_ctx: &mut SyscallContext<'_>,
        raw_args: RawSyscallArgs,
    ) -> Schedule {
        let syscall_name = type_name::<<Handler as SyscallHandler>::Syscall>();

        // parse syscall arguments
        let args = match <<Handler as SyscallHandler>::Syscall as SyscallBinding>::CallArgs::try_from(raw_args) {
            Ok(args) => args,
            Err(_) => {
                log::debug!("could not decode {syscall_name} syscall args {raw_args:x?}");
                syscall_ctx.frame.write_syscall_return(
                    SyscallResult::<NoValue>::Err(SyscallError::InvalidArg).into_response(),
                );
                return Schedule::Keep;
            }
        };

        // execute the handler
        log::trace!("handling {syscall_name} syscall with args {args:x?}");
        let (schedule, result) = self.handle(kernel_ctx, syscall_ctx, args);
        log::trace!("{syscall_name} syscall result is {result:x?} with new schedule {schedule:?}");

        // write the result back to userspace
        syscall_ctx
            .frame
            .write_syscall_return(result.into_response());

        schedule
    }
}

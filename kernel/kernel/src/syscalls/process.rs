//! Syscalls through which a process gives up the cpu

use crate::sched::Schedule;
use crate::syscalls::handler_trait::SyscallHandler;
use crate::syscalls::SyscallContext;
use crate::KernelContext;
use syscall_abi::exit::{Exit, ExitArgs};
use syscall_abi::r#yield::{Yield, YieldReturn};
use syscall_abi::{NoValue, SyscallResult};

/// Terminates the caller.
///
/// The result is never seen by the process since it is not scheduled again.
pub(super) struct ExitHandler;

impl SyscallHandler for ExitHandler {
    type Syscall = Exit;

    fn handle(
        &mut self,
        kernel_ctx: &mut KernelContext,
        _syscall_ctx: &mut SyscallContext<'_>,
        args: ExitArgs,
    ) -> (Schedule, SyscallResult<NoValue>) {
        kernel_ctx.procs.exit_current(args.0);
        (Schedule::RunNext, Ok(NoValue))
    }
}

/// Lets the next runnable process run.
///
/// If the caller is the only runnable one, it simply continues.
pub(super) struct YieldHandler;

impl SyscallHandler for YieldHandler {
    type Syscall = Yield;

    fn handle(
        &mut self,
        _kernel_ctx: &mut KernelContext,
        _syscall_ctx: &mut SyscallContext<'_>,
        _args: NoValue,
    ) -> (Schedule, YieldReturn) {
        (Schedule::RunNext, Ok(NoValue))
    }
}

use crate::sched::Schedule;
use crate::syscalls::handler_trait::{RawSyscallHandler, SyscallHandler};
use crate::syscalls::SyscallContext;
use crate::KernelContext;
use syscall_abi::get_char::{GetChar, GetCharReturn};
use syscall_abi::put_char::{PutChar, PutCharArgs, PutCharReturn};
use syscall_abi::{IntoRawSysResponse, NoValue, RawSyscallArgs};

pub(super) struct PutCharHandler;

impl SyscallHandler for PutCharHandler {
    type Syscall = PutChar;

    fn handle(
        &mut self,
        kernel_ctx: &mut KernelContext,
        _syscall_ctx: &mut SyscallContext<'_>,
        args: PutCharArgs,
    ) -> (Schedule, PutCharReturn) {
        kernel_ctx.console.write_char(args.0);
        (Schedule::Keep, Ok(NoValue))
    }
}

/// Reads from the console without blocking the kernel.
///
/// If no input is pending, the `ecall` is repeated the next time the caller is scheduled.
pub(super) struct GetCharHandler;

impl RawSyscallHandler for GetCharHandler {
    type Syscall = GetChar;

    fn handle_raw(
        &mut self,
        kernel_ctx: &mut KernelContext,
        syscall_ctx: &mut SyscallContext<'_>,
        _raw_args: RawSyscallArgs,
    ) -> Schedule {
        match kernel_ctx.console.read_char() {
            Some(c) => {
                syscall_ctx
                    .frame
                    .write_syscall_return(GetCharReturn::Ok(c).into_response());
                Schedule::Keep
            }
            None => {
                syscall_ctx.resume_pc = syscall_ctx.trap_info.epc;
                Schedule::RunNext
            }
        }
    }
}

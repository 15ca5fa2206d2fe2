//! Dispatching of syscalls to their handlers

mod console;
mod file;
mod handler_trait;
mod process;

use crate::sched::Schedule;
use crate::syscalls::console::{GetCharHandler, PutCharHandler};
use crate::syscalls::file::{ReadFileHandler, WriteFileHandler};
use crate::syscalls::handler_trait::RawSyscallHandler;
use crate::syscalls::process::{ExitHandler, YieldHandler};
use crate::KernelContext;
use riscv::trap::{TrapFrame, TrapInfo};
use syscall_abi::exit::Exit;
use syscall_abi::get_char::GetChar;
use syscall_abi::put_char::PutChar;
use syscall_abi::r#yield::Yield;
use syscall_abi::read_file::ReadFile;
use syscall_abi::write_file::WriteFile;
use syscall_abi::*;

pub(self) struct SyscallContext<'a> {
    /// The registers of the calling process
    pub frame: &'a mut TrapFrame,
    pub trap_info: &'a TrapInfo,
    /// Where the calling process continues once it runs again
    pub resume_pc: usize,
}

/// Handle a syscall from userspace.
///
/// The syscall number and arguments are read from `frame` and the result is written back into it.
///
/// Returns whether another process should be scheduled and the program counter with which the calling process
/// resumes.
pub fn handle_syscall(
    kernel_ctx: &mut KernelContext,
    frame: &mut TrapFrame,
    trap_info: &TrapInfo,
) -> (Schedule, usize) {
    let syscall_no = frame.syscall_number();
    let raw_args: RawSyscallArgs = frame.syscall_args();
    let mut syscall_ctx = SyscallContext {
        frame,
        trap_info,
        resume_pc: trap_info.epc + 4,
    };

    let schedule = match syscall_no {
        PutChar::SYSCALL_NO => PutCharHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args),
        GetChar::SYSCALL_NO => GetCharHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args),
        Exit::SYSCALL_NO => ExitHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args),
        ReadFile::SYSCALL_NO => ReadFileHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args),
        WriteFile::SYSCALL_NO => {
            WriteFileHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args)
        }
        Yield::SYSCALL_NO => YieldHandler.handle_raw(kernel_ctx, &mut syscall_ctx, raw_args),
        _ => {
            log::warn!(
                "received unknown syscall {} with args {:x?}",
                syscall_no,
                raw_args
            );
            syscall_ctx.frame.write_syscall_return(
                SyscallResult::<NoValue>::Err(SyscallError::UnknownSyscall).into_response(),
            );
            Schedule::Keep
        }
    };

    (schedule, syscall_ctx.resume_pc)
}

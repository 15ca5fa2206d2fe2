//! Handling of traps that were taken from user mode

use crate::sched::Schedule;
use crate::syscalls::handle_syscall;
use crate::KernelContext;
use riscv::trap::{Exception, TrapEvent, TrapFrame, TrapInfo};

/// Handle the trap described by `info` which interrupted the current process with the registers in `frame`.
///
/// Returns whether another process should be scheduled and the program counter with which the interrupted
/// process resumes.
///
/// # Panics
/// Every trap other than a syscall is fatal.
pub fn handle_trap(
    kernel_ctx: &mut KernelContext,
    frame: &mut TrapFrame,
    info: &TrapInfo,
) -> (Schedule, usize) {
    match info.cause {
        TrapEvent::Exception(Exception::EnvCallFromUMode) => {
            handle_syscall(kernel_ctx, frame, info)
        }
        cause => panic!(
            "unexpected trap {cause:?} in process {} at pc={:#x} (stval={:#x}), {frame:x?}",
            kernel_ctx.procs.current().pid(),
            info.epc,
            info.stval
        ),
    }
}

/// Halt on traps that were taken while the kernel itself was executing.
///
/// Such a trap must not touch any kernel state since the interrupted code may hold it.
pub fn reject_kernel_trap(info: &TrapInfo, from_supervisor: bool) {
    if from_supervisor {
        panic!(
            "trap {:?} in supervisor mode at pc={:#x} (stval={:#x})",
            info.cause, info.epc, info.stval
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::process::test::table_with;
    use tarfs::ram_disk::RamDisk;
    use tarfs::FileTable;

    struct NoConsole;

    impl klog::CharSink for NoConsole {
        fn write_char(&self, _c: u8) {}
    }

    impl crate::console::Console for NoConsole {
        fn read_char(&self) -> Option<u8> {
            None
        }
    }

    #[test]
    #[should_panic(expected = "unexpected trap Exception(StorePageFault) in process 1")]
    fn test_faults_are_fatal() {
        let (mut procs, _alloc, _phys_map) = table_with(1);
        procs.current = 1;
        let mut files = FileTable::new();
        let mut disk = RamDisk::new(1);
        let mut ctx = KernelContext {
            procs: &mut procs,
            files: &mut files,
            disk: &mut disk,
            console: &NoConsole,
        };
        let info = TrapInfo {
            epc: 0x1000_0010,
            cause: TrapEvent::Exception(Exception::StorePageFault),
            stval: 0x10,
        };
        handle_trap(&mut ctx, &mut TrapFrame::default(), &info);
    }

    #[test]
    #[should_panic(expected = "trap Exception(LoadPageFault) in supervisor mode at pc=0x80201000")]
    fn test_kernel_traps_are_fatal() {
        let info = TrapInfo {
            epc: 0x8020_1000,
            cause: TrapEvent::Exception(Exception::LoadPageFault),
            stval: 0,
        };
        reject_kernel_trap(&info, true);
    }

    #[test]
    fn test_user_traps_pass() {
        let info = TrapInfo {
            epc: 0x1000_0000,
            cause: TrapEvent::Exception(Exception::EnvCallFromUMode),
            stval: 0,
        };
        reject_kernel_trap(&info, false);
    }
}

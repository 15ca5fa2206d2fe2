//! Data Structures for handling trap information

use core::fmt::{Debug, Formatter};
use static_assertions::assert_eq_size;

/// The general purpose registers of an interrupted context.
///
/// ## ABI
/// The layout of this data structure is important because it is written and read by the trap entry assembly.
/// Registers are stored as consecutive words in the exact order of the fields below.
/// `zero` is never stored and `sp` comes last because it is only recovered after all others were saved.
#[repr(C)]
#[derive(Default, Clone, Eq, PartialEq)]
pub struct TrapFrame {
    pub ra: usize,
    pub gp: usize,
    pub tp: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub s0: usize,
    pub s1: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    pub sp: usize,
}

/// How many registers a [`TrapFrame`] holds
pub const TRAP_FRAME_REGS: usize = 31;

assert_eq_size!(TrapFrame, [usize; TRAP_FRAME_REGS]);

impl TrapFrame {
    /// The number of the syscall that was requested, found in register `a0`
    pub fn syscall_number(&self) -> usize {
        self.a0
    }

    /// Get the arguments of a syscall.
    ///
    /// These are the registers `a1`-`a4`.
    pub fn syscall_args(&self) -> [usize; 4] {
        [self.a1, self.a2, self.a3, self.a4]
    }

    /// Write the return data of a syscall into the registers `a0` and `a1`.
    pub fn write_syscall_return(&mut self, data: [usize; 2]) {
        self.a0 = data[0];
        self.a1 = data[1];
    }
}

impl Debug for TrapFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrapFrame")
            .field("ra", &format_args!("{:#x}", self.ra))
            .field("sp", &format_args!("{:#x}", self.sp))
            .field("a0", &format_args!("{:#x}", self.a0))
            .field("a1", &format_args!("{:#x}", self.a1))
            .field("a2", &format_args!("{:#x}", self.a2))
            .field("a3", &format_args!("{:#x}", self.a3))
            .field("a4", &format_args!("{:#x}", self.a4))
            .finish_non_exhaustive()
    }
}

/// Context information about a trap that was triggered on a RISC-V CPU.
#[derive(Debug, Eq, PartialEq)]
pub struct TrapInfo {
    /// The exception program counter.
    ///
    /// This is the program counter at the point at which the trap was triggered.
    /// Essentially, the program counter of the interrupted code.
    pub epc: usize,

    /// The event that caused the trap to trigger.
    pub cause: TrapEvent,

    /// Supervisor bad address or instruction data.
    ///
    /// If the `cause` field indicates that the cpu encountered a bad instruction or tried to access a bad memory
    /// address, this field holds that bad instruction or bad address.
    /// However, this value is very specific to the instruction cause so care should be taken when interpreting it.
    pub stval: usize,
}

impl TrapInfo {
    /// Construct an instance by reading the values that are currently stored in the corresponding CPU registers
    #[cfg(target_arch = "riscv32")]
    pub fn from_current_regs() -> Self {
        Self {
            epc: crate::cpu::Sepc::read(),
            cause: crate::cpu::Scause::read(),
            stval: crate::cpu::StVal::read(),
        }
    }
}

/// An indication of the event that caused a trap to trigger
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrapEvent {
    Interrupt(Interrupt),
    Exception(Exception),
}

impl From<usize> for TrapEvent {
    fn from(value: usize) -> Self {
        let interrupt_bit = 1 << (usize::BITS - 1);
        let cause = (value & !interrupt_bit) as u32;
        if value & interrupt_bit != 0 {
            TrapEvent::Interrupt(Interrupt::from(cause))
        } else {
            TrapEvent::Exception(Exception::from(cause))
        }
    }
}

/// An interrupt code indicating the cause of a trap
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Interrupt {
    SupervisorSoftwareInterrupt,
    SupervisorTimerInterrupt,
    SupervisorExternalInterrupt,
    Unknown(u32),
}

impl From<u32> for Interrupt {
    fn from(value: u32) -> Self {
        match value {
            1 => Interrupt::SupervisorSoftwareInterrupt,
            5 => Interrupt::SupervisorTimerInterrupt,
            9 => Interrupt::SupervisorExternalInterrupt,
            other => Interrupt::Unknown(other),
        }
    }
}

/// An exception indicating the cause of a trap
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Exception {
    InstructionAddressMisaligned,
    InstructionAccessFault,
    IllegalInstruction,
    Breakpoint,
    LoadAddressMisaligned,
    LoadAccessFault,
    StoreAddressMisaligned,
    StoreAccessFault,
    EnvCallFromUMode,
    EnvCallFromSMode,
    InstructionPageFault,
    LoadPageFault,
    StorePageFault,
    Unknown(u32),
}

impl From<u32> for Exception {
    fn from(value: u32) -> Self {
        match value {
            0 => Exception::InstructionAddressMisaligned,
            1 => Exception::InstructionAccessFault,
            2 => Exception::IllegalInstruction,
            3 => Exception::Breakpoint,
            4 => Exception::LoadAddressMisaligned,
            5 => Exception::LoadAccessFault,
            6 => Exception::StoreAddressMisaligned,
            7 => Exception::StoreAccessFault,
            8 => Exception::EnvCallFromUMode,
            9 => Exception::EnvCallFromSMode,
            12 => Exception::InstructionPageFault,
            13 => Exception::LoadPageFault,
            15 => Exception::StorePageFault,
            other => Exception::Unknown(other),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ecall_cause_is_decoded() {
        assert_eq!(
            TrapEvent::from(8),
            TrapEvent::Exception(Exception::EnvCallFromUMode)
        );
        assert_eq!(
            TrapEvent::from(13),
            TrapEvent::Exception(Exception::LoadPageFault)
        );
    }

    #[test]
    fn test_interrupt_cause_is_decoded() {
        let timer = (1 << (usize::BITS - 1)) | 5;
        assert_eq!(
            TrapEvent::from(timer),
            TrapEvent::Interrupt(Interrupt::SupervisorTimerInterrupt)
        );
        assert_eq!(
            TrapEvent::from(42),
            TrapEvent::Exception(Exception::Unknown(42))
        );
    }

    #[test]
    fn test_syscall_registers() {
        let mut frame = TrapFrame {
            a0: 4,
            a1: 10,
            a2: 11,
            a3: 12,
            a4: 13,
            a5: 99,
            ..Default::default()
        };
        assert_eq!(frame.syscall_number(), 4);
        assert_eq!(frame.syscall_args(), [10, 11, 12, 13]);

        frame.write_syscall_return([0, 5]);
        assert_eq!((frame.a0, frame.a1, frame.a2), (0, 5, 11));
    }

    #[test]
    fn test_frame_layout_matches_save_order() {
        use core::mem::{offset_of, size_of};
        let word = size_of::<usize>();
        assert_eq!(offset_of!(TrapFrame, ra), 0);
        assert_eq!(offset_of!(TrapFrame, a0), 10 * word);
        assert_eq!(offset_of!(TrapFrame, s0), 18 * word);
        assert_eq!(offset_of!(TrapFrame, sp), 30 * word);
    }
}

//! Process control blocks and the fixed-size table that owns them
//!
//! A process is created once and never reclaimed, so at most [`PROCS_MAX`] processes exist during one boot.
//! Slot [`IDLE_SLOT`] is reserved for the idle process which runs in the boot context whenever nothing else is
//! runnable.

use crate::config::{
    MemoryLayout, IDLE_SLOT, KERNEL_STACK_SIZE, PROCS_MAX, USER_BASE, USER_IMAGE_MAX,
    USER_STACK_PAGES,
};
use crate::vspace::AddressSpace;
use allocators::Allocator;
use core::mem::size_of;
use riscv::mem::{align_up, EntryFlags, MapError, PhysMapping, VAddr, PAGESIZE};
use riscv::trap::TrapFrame;
use static_assertions::const_assert_eq;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProcessState {
    Unused,
    Runnable,
    Exited,
}

/// How much room the trap entry code reserves at the top of a kernel stack for a [`TrapFrame`].
///
/// It is rounded up so that the kernel stack pointer stays 16-byte aligned.
pub const TRAP_FRAME_SLOT: usize = align_up(size_of::<TrapFrame>(), 16);

/// The callee-saved registers that `switch_context` keeps on the kernel stack of a suspended process.
///
/// `ra` is where the suspended process continues once it is switched to again.
#[repr(C, align(16))]
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct SwitchFrame {
    pub ra: usize,
    /// `s0` - `s11`
    pub s: [usize; 12],
}

#[repr(C, align(16))]
pub struct KernelStack([u8; KERNEL_STACK_SIZE]);

const_assert_eq!(KERNEL_STACK_SIZE % 16, 0);

pub struct Process {
    pub(crate) pid: usize,
    pub(crate) state: ProcessState,
    /// Kernel stack pointer of the suspended process, pointing at a [`SwitchFrame`]
    pub(crate) saved_sp: usize,
    pub(crate) vspace: Option<AddressSpace>,
    stack: KernelStack,
}

impl Process {
    const UNUSED: Process = Process {
        pid: 0,
        state: ProcessState::Unused,
        saved_sp: 0,
        vspace: None,
        stack: KernelStack([0; KERNEL_STACK_SIZE]),
    };

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn vspace(&self) -> Option<&AddressSpace> {
        self.vspace.as_ref()
    }

    pub fn saved_sp(&self) -> usize {
        self.saved_sp
    }

    /// The stack pointer with which a trap from this process' user context enters the kernel
    pub fn kernel_stack_top(&self) -> usize {
        self.stack.0.as_ptr_range().end as usize
    }

    /// Prepare the kernel stack so that switching to this process for the first time jumps to `trampoline` which
    /// then enters user mode at `entry` with the stack pointer `user_sp`.
    fn prime_stack(&mut self, trampoline: usize, entry: VAddr, user_sp: usize) {
        let top = self.stack.0.as_mut_ptr_range().end;
        let mut s = [0; 12];
        s[0] = entry as usize;
        unsafe {
            let frame = top.sub(TRAP_FRAME_SLOT).cast::<TrapFrame>();
            frame.write(TrapFrame {
                sp: user_sp,
                ..Default::default()
            });
            let switch = frame
                .cast::<u8>()
                .sub(size_of::<SwitchFrame>())
                .cast::<SwitchFrame>();
            switch.write(SwitchFrame { ra: trampoline, s });
            self.saved_sp = switch as usize;
        }
    }
}

pub struct ProcessTable {
    pub(crate) procs: [Process; PROCS_MAX],
    /// Slot of the process that is currently executing
    pub(crate) current: usize,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            procs: [Process::UNUSED; PROCS_MAX],
            current: IDLE_SLOT,
        }
    }

    /// Turn the currently executing boot context into the idle process.
    ///
    /// Its registers are saved the first time another process is switched to.
    pub fn create_idle(&mut self, vspace: AddressSpace) {
        let idle = &mut self.procs[IDLE_SLOT];
        assert_eq!(
            idle.state,
            ProcessState::Unused,
            "idle process was already created"
        );
        idle.pid = IDLE_SLOT;
        idle.vspace = Some(vspace);
        idle.state = ProcessState::Runnable;
        self.current = IDLE_SLOT;
    }

    /// Create a new process that executes `image` in user mode.
    ///
    /// The image is copied to [`USER_BASE`] and [`USER_STACK_PAGES`] pages of stack are mapped directly below it.
    /// The first time the process is switched to, execution continues at `trampoline` in supervisor mode with
    /// `s0` holding the user entry point.
    ///
    /// # Panics
    /// Running out of process slots or of memory for the address space is fatal.
    /// So is an image that is larger than [`USER_IMAGE_MAX`].
    pub fn create<'a>(
        &mut self,
        alloc: &impl Allocator<'a>,
        layout: &MemoryLayout,
        phys_map: PhysMapping,
        image: &[u8],
        trampoline: usize,
    ) -> usize {
        let slot = self
            .procs
            .iter()
            .enumerate()
            .position(|(slot, proc)| slot != IDLE_SLOT && proc.state == ProcessState::Unused)
            .unwrap_or_else(|| panic!("process table exhausted, all {PROCS_MAX} slots were used"));

        assert!(
            image.len() <= USER_IMAGE_MAX,
            "user image of {} bytes does not fit below the virtio registers ({USER_IMAGE_MAX} bytes)",
            image.len()
        );
        let image_pages = align_up(image.len(), PAGESIZE) / PAGESIZE;
        let vspace = match user_space(alloc, layout, phys_map, image, image_pages) {
            Ok(vspace) => vspace,
            Err(e) => panic!("could not create address space for process {slot}: {e}"),
        };
        let user_sp = USER_BASE as usize;

        let proc = &mut self.procs[slot];
        proc.pid = slot;
        proc.prime_stack(trampoline, USER_BASE, user_sp);
        proc.vspace = Some(vspace);
        proc.state = ProcessState::Runnable;
        log::info!(
            "created process {slot} from a {} byte image, user stack at {user_sp:#x}",
            image.len()
        );
        slot
    }

    /// Mark the currently executing process as exited.
    ///
    /// Its slot is not reused.
    pub fn exit_current(&mut self, code: usize) {
        assert_ne!(self.current, IDLE_SLOT, "the idle process cannot exit");
        let proc = &mut self.procs[self.current];
        proc.state = ProcessState::Exited;
        log::info!("process {} exited with code {code}", proc.pid);
    }

    pub fn current(&self) -> &Process {
        &self.procs[self.current]
    }

    /// The address space of the currently executing process
    pub fn current_vspace(&self) -> &AddressSpace {
        self.current()
            .vspace()
            .unwrap_or_else(|| panic!("process {} has no address space", self.current))
    }

    pub fn get(&self, slot: usize) -> Option<&Process> {
        self.procs.get(slot)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn user_space<'a>(
    alloc: &impl Allocator<'a>,
    layout: &MemoryLayout,
    phys_map: PhysMapping,
    image: &[u8],
    image_pages: usize,
) -> Result<AddressSpace, MapError> {
    let mut vspace = AddressSpace::new(alloc, layout, phys_map)?;
    vspace.map_fresh(
        alloc,
        USER_BASE,
        image_pages,
        image,
        EntryFlags::User | EntryFlags::RWX,
    )?;
    vspace.map_fresh(
        alloc,
        USER_BASE - (USER_STACK_PAGES * PAGESIZE) as VAddr,
        USER_STACK_PAGES,
        &[],
        EntryFlags::User | EntryFlags::Read | EntryFlags::Write,
    )?;
    Ok(vspace)
}

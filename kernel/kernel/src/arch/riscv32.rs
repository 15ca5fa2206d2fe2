//! Everything that only works on real riscv32 hardware: trap entry, context switches and booting
//!
//! Kernel state lives in statics guarded by [`KernelCell`]s.
//! Since the kernel is never re-entered, a trap handler can always borrow all of them.

use crate::config::{MemoryLayout, VIRTIO_BLK_PADDR};
use crate::fs::VirtioDisk;
use crate::process::{ProcessTable, SwitchFrame, TRAP_FRAME_SLOT};
use crate::sched::Schedule;
use crate::trap::{handle_trap, reject_kernel_trap};
use crate::vspace::AddressSpace;
use crate::KernelContext;
use allocators::{AllocInit, Allocator, BumpAllocator};
use core::alloc::Layout;
use core::arch::global_asm;
use core::mem::size_of;
use klog::SbiConsole;
use ksync::KernelCell;
use riscv::cpu::{SScratch, SStatus, SStatusFlags, Satp, Sepc, StVec};
use riscv::mem::PhysMapping;
use riscv::trap::{TrapFrame, TrapInfo, TRAP_FRAME_REGS};
use riscv::utils::wfi_spin;
use static_assertions::const_assert_eq;
use tarfs::FileTable;
use virtio::{BlkRequest, MmioTransport, VirtQueue, VirtioBlk, VirtioRegisters};

/// The console of the SBI firmware which is used for logging and by user processes
pub static CONSOLE: SbiConsole = SbiConsole;

static PROCS: KernelCell<ProcessTable> = KernelCell::new(ProcessTable::new());
static FILES: KernelCell<FileTable> = KernelCell::new(FileTable::new());
static DISK: KernelCell<Option<VirtioDisk<'static, MmioTransport<'static>>>> =
    KernelCell::new(None);

// the offsets used by the assembly below
const_assert_eq!(TRAP_FRAME_REGS, 31);
const_assert_eq!(TRAP_FRAME_SLOT, 128);
const_assert_eq!(size_of::<SwitchFrame>(), 64);

global_asm!(
    ".section .text",
    ".balign 4",
    ".global kernel_entry",
    "kernel_entry:",
    // sscratch holds the kernel stack of the current process
    "    csrrw sp, sscratch, sp",
    "    addi sp, sp, -128",
    "    sw ra, 0(sp)",
    "    sw gp, 4(sp)",
    "    sw tp, 8(sp)",
    "    sw t0, 12(sp)",
    "    sw t1, 16(sp)",
    "    sw t2, 20(sp)",
    "    sw t3, 24(sp)",
    "    sw t4, 28(sp)",
    "    sw t5, 32(sp)",
    "    sw t6, 36(sp)",
    "    sw a0, 40(sp)",
    "    sw a1, 44(sp)",
    "    sw a2, 48(sp)",
    "    sw a3, 52(sp)",
    "    sw a4, 56(sp)",
    "    sw a5, 60(sp)",
    "    sw a6, 64(sp)",
    "    sw a7, 68(sp)",
    "    sw s0, 72(sp)",
    "    sw s1, 76(sp)",
    "    sw s2, 80(sp)",
    "    sw s3, 84(sp)",
    "    sw s4, 88(sp)",
    "    sw s5, 92(sp)",
    "    sw s6, 96(sp)",
    "    sw s7, 100(sp)",
    "    sw s8, 104(sp)",
    "    sw s9, 108(sp)",
    "    sw s10, 112(sp)",
    "    sw s11, 116(sp)",
    "    csrr a0, sscratch",
    "    sw a0, 120(sp)",
    "    addi a0, sp, 128",
    "    csrw sscratch, a0",
    "    mv a0, sp",
    "    call rust_trap_handler",
    "trap_return:",
    "    lw ra, 0(sp)",
    "    lw gp, 4(sp)",
    "    lw tp, 8(sp)",
    "    lw t0, 12(sp)",
    "    lw t1, 16(sp)",
    "    lw t2, 20(sp)",
    "    lw t3, 24(sp)",
    "    lw t4, 28(sp)",
    "    lw t5, 32(sp)",
    "    lw t6, 36(sp)",
    "    lw a0, 40(sp)",
    "    lw a1, 44(sp)",
    "    lw a2, 48(sp)",
    "    lw a3, 52(sp)",
    "    lw a4, 56(sp)",
    "    lw a5, 60(sp)",
    "    lw a6, 64(sp)",
    "    lw a7, 68(sp)",
    "    lw s0, 72(sp)",
    "    lw s1, 76(sp)",
    "    lw s2, 80(sp)",
    "    lw s3, 84(sp)",
    "    lw s4, 88(sp)",
    "    lw s5, 92(sp)",
    "    lw s6, 96(sp)",
    "    lw s7, 100(sp)",
    "    lw s8, 104(sp)",
    "    lw s9, 108(sp)",
    "    lw s10, 112(sp)",
    "    lw s11, 116(sp)",
    "    lw sp, 120(sp)",
    "    sret",
    "",
    // first code that a new process executes, s0 holds its entry point
    ".global user_entry",
    "user_entry:",
    "    csrw sepc, s0",
    "    j trap_return",
    "",
    ".global switch_context",
    "switch_context:",
    "    addi sp, sp, -64",
    "    sw ra, 0(sp)",
    "    sw s0, 4(sp)",
    "    sw s1, 8(sp)",
    "    sw s2, 12(sp)",
    "    sw s3, 16(sp)",
    "    sw s4, 20(sp)",
    "    sw s5, 24(sp)",
    "    sw s6, 28(sp)",
    "    sw s7, 32(sp)",
    "    sw s8, 36(sp)",
    "    sw s9, 40(sp)",
    "    sw s10, 44(sp)",
    "    sw s11, 48(sp)",
    "    sw sp, 0(a0)",
    "    lw sp, 0(a1)",
    "    lw ra, 0(sp)",
    "    lw s0, 4(sp)",
    "    lw s1, 8(sp)",
    "    lw s2, 12(sp)",
    "    lw s3, 16(sp)",
    "    lw s4, 20(sp)",
    "    lw s5, 24(sp)",
    "    lw s6, 28(sp)",
    "    lw s7, 32(sp)",
    "    lw s8, 36(sp)",
    "    lw s9, 40(sp)",
    "    lw s10, 44(sp)",
    "    lw s11, 48(sp)",
    "    addi sp, sp, 64",
    "    ret",
);

extern "C" {
    /// Save the registers of the interrupted context into a [`TrapFrame`], call [`rust_trap_handler`] and restore
    /// them again.
    fn kernel_entry();

    /// Enter user mode at the address in `s0` with the registers of the [`TrapFrame`] on the current stack.
    ///
    /// `sstatus` must already select user mode as the `SRET` target, see [`boot`].
    fn user_entry();

    /// Push the callee-saved registers, store the stack pointer to `prev_sp`, load a new one from `next_sp` and pop
    /// the registers that were saved there.
    fn switch_context(prev_sp: *mut usize, next_sp: *const usize);
}

#[no_mangle]
extern "C" fn rust_trap_handler(frame: &mut TrapFrame) {
    let info = TrapInfo::from_current_regs();
    reject_kernel_trap(&info, SStatus::read().contains(SStatusFlags::SPP));

    let (schedule, resume_pc) = {
        let mut procs = PROCS.borrow_mut();
        let mut files = FILES.borrow_mut();
        let mut disk = DISK.borrow_mut();
        let disk = disk
            .as_mut()
            .expect("trap was taken before the block device was initialized");
        let mut ctx = KernelContext {
            procs: &mut procs,
            files: &mut files,
            disk,
            console: &CONSOLE,
        };
        handle_trap(&mut ctx, frame, &info)
    };

    if schedule == Schedule::RunNext {
        yield_now();
    }
    // other processes have overwritten sepc in the meantime
    unsafe { Sepc::write(resume_pc) };
}

/// Suspend the current process and resume the next one the scheduler picks.
///
/// Returns once the current process is scheduled again, which may be immediately.
pub fn yield_now() {
    let Some(switch) = PROCS.borrow_mut().schedule() else {
        return;
    };
    unsafe {
        Satp::activate(switch.next_root);
        SScratch::write(switch.kernel_stack_top);
        switch_context(switch.prev_sp, switch.next_sp);
    }
}

/// Bring up the system and start running processes.
///
/// The calling context becomes the idle process.
pub fn boot(shell_image: &[u8]) -> ! {
    let layout = MemoryLayout::from_linker();
    log::info!(
        "kernel starts at {:#x}, free memory is {:#x} -- {:#x}",
        layout.kernel_base,
        layout.free_ram_start,
        layout.free_ram_end
    );
    extern "C" {
        static __stack_top: u8;
    }
    unsafe {
        // traps before the first process switch run on the boot stack
        SScratch::write(core::ptr::addr_of!(__stack_top) as usize);
        StVec::write(kernel_entry as usize);
        // every SRET returns to user mode with interrupts enabled, trap entries from user mode keep it that way
        SStatus::clear(SStatusFlags::SPP);
        SStatus::set(SStatusFlags::SPIE);
    }

    let alloc = unsafe {
        BumpAllocator::new_raw(
            layout.free_ram_start as usize as *mut u8,
            layout.free_ram_end as usize as *mut u8,
        )
    };
    let phys_map = PhysMapping::identity();

    let mut disk = init_disk(&alloc);
    match FILES.borrow_mut().load(&mut disk) {
        Ok(count) => log::info!("loaded {count} files from disk"),
        Err(e) => log::error!("could not load the file system: {e}"),
    }
    *DISK.borrow_mut() = Some(disk);

    let mut procs = PROCS.borrow_mut();
    let idle_vspace = AddressSpace::new(&alloc, &layout, phys_map)
        .unwrap_or_else(|e| panic!("could not create the idle address space: {e}"));
    procs.create_idle(idle_vspace);
    if shell_image.is_empty() {
        log::warn!("no shell image was built into the kernel");
    } else {
        procs.create(&alloc, &layout, phys_map, shell_image, user_entry as usize);
    }
    drop(procs);

    log::debug!("{} bytes of free memory remain", alloc.free_bytes());
    idle_loop()
}

fn init_disk(alloc: &BumpAllocator<'static>) -> VirtioDisk<'static, MmioTransport<'static>> {
    let queue = alloc
        .allocate(Layout::new::<VirtQueue>(), AllocInit::Zeroed)
        .unwrap_or_else(|e| panic!("could not allocate the virtqueue: {e}"));
    let queue = unsafe { VirtQueue::init(queue.as_mut_ptr().cast()) };
    let request = alloc
        .allocate(Layout::new::<BlkRequest>(), AllocInit::Zeroed)
        .unwrap_or_else(|e| panic!("could not allocate the block request: {e}"));
    let request = unsafe { BlkRequest::init(request.as_mut_ptr().cast()) };

    let transport = unsafe { MmioTransport::new(VIRTIO_BLK_PADDR as usize as *mut VirtioRegisters) };
    let mut blk = VirtioBlk::new(transport, queue, request);
    if let Err(e) = blk.init() {
        panic!("could not initialize the virtio block device: {e}");
    }
    log::info!("virtio block device holds {} sectors", blk.capacity());
    VirtioDisk(blk)
}

fn idle_loop() -> ! {
    loop {
        yield_now();
        if !PROCS.borrow_mut().has_runnable() {
            log::info!("no runnable processes left, halting");
            wfi_spin();
        }
    }
}

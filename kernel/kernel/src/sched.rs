//! Cooperative round-robin scheduling

use crate::config::{IDLE_SLOT, PROCS_MAX};
use crate::process::{ProcessState, ProcessTable};
use core::ptr;
use riscv::mem::PAddr;

/// What should happen after the kernel is done handling a trap
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Schedule {
    /// Return to the process that caused the trap
    Keep,
    /// Let the scheduler pick the next process to run
    RunNext,
}

/// The information required to suspend one process and resume another.
///
/// The pointers point into the [`ProcessTable`] that produced the switch.
#[derive(Debug)]
pub struct Switch {
    /// Where the kernel stack pointer of the suspended process is stored
    pub prev_sp: *mut usize,
    /// Where the kernel stack pointer of the resumed process is loaded from
    pub next_sp: *const usize,
    /// Root page table of the resumed process
    pub next_root: PAddr,
    /// Kernel stack with which the resumed process enters the kernel on its next trap
    pub kernel_stack_top: usize,
}

impl ProcessTable {
    /// Select the process that runs after the current one.
    ///
    /// Slots are scanned starting right after the current one, wrapping around.
    /// The idle process is only selected when no other process is runnable.
    pub fn pick_next(&self) -> usize {
        (1..=PROCS_MAX)
            .map(|offset| (self.current + offset) % PROCS_MAX)
            .find(|&slot| slot != IDLE_SLOT && self.procs[slot].state == ProcessState::Runnable)
            .unwrap_or(IDLE_SLOT)
    }

    /// Whether any process other than the idle process can still run
    pub fn has_runnable(&self) -> bool {
        self.procs
            .iter()
            .enumerate()
            .any(|(slot, proc)| slot != IDLE_SLOT && proc.state == ProcessState::Runnable)
    }

    /// Make the next process current.
    ///
    /// `None` is returned if the current process stays the same.
    /// Otherwise, the caller must perform the returned [`Switch`].
    pub fn schedule(&mut self) -> Option<Switch> {
        let prev = self.current;
        let next = self.pick_next();
        if next == prev {
            return None;
        }

        let next_proc = &self.procs[next];
        let next_root = match next_proc.vspace() {
            Some(vspace) => vspace.root_paddr(),
            None => panic!("process {next} is runnable but has no address space"),
        };
        let kernel_stack_top = next_proc.kernel_stack_top();
        log::trace!("switching from process {prev} to {next}");

        self.current = next;
        Some(Switch {
            prev_sp: ptr::addr_of_mut!(self.procs[prev].saved_sp),
            next_sp: ptr::addr_of!(self.procs[next].saved_sp),
            next_root,
            kernel_stack_top,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::process::test::table_with;

    fn visit_order(procs: &mut ProcessTable, count: usize) -> std::vec::Vec<usize> {
        (0..count)
            .map(|_| {
                procs.schedule();
                procs.current().pid()
            })
            .collect()
    }

    #[test]
    fn test_every_runnable_process_is_visited_once_per_cycle() {
        let (mut procs, _alloc, _phys_map) = table_with(3);
        assert_eq!(visit_order(&mut procs, 6), [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_round_robin_continues_after_current() {
        let (mut procs, _alloc, _phys_map) = table_with(4);
        procs.current = 3;
        assert_eq!(visit_order(&mut procs, 4), [4, 1, 2, 3]);
    }

    #[test]
    fn test_exited_processes_are_skipped() {
        let (mut procs, _alloc, _phys_map) = table_with(3);
        procs.current = 2;
        procs.exit_current(1);
        assert_eq!(visit_order(&mut procs, 4), [3, 1, 3, 1]);
    }

    #[test]
    fn test_idle_runs_when_nothing_else_can() {
        let (mut procs, _alloc, _phys_map) = table_with(1);
        let switch = procs.schedule().unwrap();
        assert_eq!(procs.current().pid(), 1);
        assert_eq!(switch.next_sp, ptr::addr_of!(procs.procs[1].saved_sp));
        assert_eq!(switch.prev_sp, ptr::addr_of_mut!(procs.procs[IDLE_SLOT].saved_sp));

        // the only process keeps running
        assert!(procs.schedule().is_none());

        procs.exit_current(0);
        assert!(!procs.has_runnable());
        let switch = procs.schedule().unwrap();
        assert_eq!(procs.current().pid(), IDLE_SLOT);
        let idle = procs.get(IDLE_SLOT).unwrap();
        assert_eq!(switch.next_root, idle.vspace().unwrap().root_paddr());
        assert_eq!(switch.kernel_stack_top, idle.kernel_stack_top());
        assert!(procs.schedule().is_none());
    }
}

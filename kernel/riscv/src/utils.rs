//! Utilities for waiting on the hardware

/// Put the current hart to sleep until an interrupt wakes it up again.
///
/// Note that this only provides a hint to the hardware implementation to wait until an interrupt *might* need servicing.
/// No interrupt is guaranteed to actually be pending when this function returns.
#[inline(always)]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv32")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack))
    }
    #[cfg(not(target_arch = "riscv32"))]
    core::hint::spin_loop();
}

/// Call wait_for_interrupt() in a tight loop.
///
/// This effectively puts the hart to sleep forever without wasting as much power as a busy loop would require.
#[inline(always)]
pub fn wfi_spin() -> ! {
    loop {
        wait_for_interrupt();
    }
}

#![cfg_attr(target_arch = "riscv32", no_std, no_main)]

#[cfg(target_arch = "riscv32")]
mod entry {
    use core::arch::global_asm;
    use core::panic::PanicInfo;
    use core::ptr::addr_of_mut;
    use kernel::config::LOG_LEVEL;
    use klog::KernelLogger;

    static LOGGER: KernelLogger = KernelLogger::new(LOG_LEVEL, &kernel::arch::CONSOLE);

    static SHELL_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/shell.bin"));

    global_asm!(
        ".section .text.boot",
        ".global _start",
        "_start:",
        "    la sp, __stack_top",
        "    j kernel_main",
    );

    #[panic_handler]
    fn panic_handler(info: &PanicInfo) -> ! {
        log::error!("!!! Kernel Panic !!!\n  {}", info);
        riscv::utils::wfi_spin()
    }

    #[no_mangle]
    extern "C" fn kernel_main() -> ! {
        extern "C" {
            static mut __bss: u32;
            static mut __bss_end: u32;
        }
        unsafe { r0::zero_bss(addr_of_mut!(__bss), addr_of_mut!(__bss_end)) };

        if LOGGER.install().is_err() {
            riscv::utils::wfi_spin();
        }
        log::info!("tarkern is starting");

        kernel::arch::boot(SHELL_IMAGE)
    }
}

#[cfg(not(target_arch = "riscv32"))]
fn main() {}

use core::fmt;

/// A destination for diagnostic output that accepts one byte at a time
pub trait CharSink: Sync {
    fn write_char(&self, c: u8);
}

/// Adapter that makes formatted output available for any [`CharSink`]
pub struct CharWriter<'a>(pub &'a dyn CharSink);

impl fmt::Write for CharWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            self.0.write_char(c);
        }
        Ok(())
    }
}

/// The console that is provided by the SBI firmware
#[cfg(target_arch = "riscv32")]
pub struct SbiConsole;

#[cfg(target_arch = "riscv32")]
impl SbiConsole {
    /// Read a byte from the console if one is pending
    pub fn read_char(&self) -> Option<u8> {
        sbi::legacy::console_getchar()
    }
}

#[cfg(target_arch = "riscv32")]
impl CharSink for SbiConsole {
    fn write_char(&self, c: u8) {
        sbi::legacy::console_putchar(c)
    }
}

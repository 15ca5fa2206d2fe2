//! The character console that user processes talk to

use klog::CharSink;

/// A [`CharSink`] that can also be read from
pub trait Console: CharSink {
    /// Return the next pending input byte without blocking
    fn read_char(&self) -> Option<u8>;
}

#[cfg(target_arch = "riscv32")]
impl Console for klog::SbiConsole {
    fn read_char(&self) -> Option<u8> {
        klog::SbiConsole::read_char(self)
    }
}

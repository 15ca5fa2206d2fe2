//! A logging implementation which writes every record to a [`CharSink`]
use core::fmt::Write;

use crate::sink::{CharSink, CharWriter};
use log::{Level, Log, Metadata, Record, SetLoggerError};

pub struct KernelLogger {
    pub max_level: Level,
    sink: &'static dyn CharSink,
}

impl KernelLogger {
    pub const fn new(max_level: Level, sink: &'static dyn CharSink) -> KernelLogger {
        KernelLogger { max_level, sink }
    }

    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self).map(|_| log::set_max_level(self.max_level.to_level_filter()))
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level_moji = match record.level() {
                Level::Error => "❌",
                Level::Warn => "⚠️",
                Level::Info => "ℹ️",
                Level::Debug => "🛠️",
                Level::Trace => "👣",
            };
            // the sink itself cannot fail
            let _ = CharWriter(self.sink).write_fmt(format_args!(
                "{}  {}: {}\n",
                level_moji,
                record.target(),
                record.args(),
            ));
        }
    }

    fn flush(&self) {}
}

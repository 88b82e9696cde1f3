//! Logger backend for the `log` facade.
//!
//! Records are coloured by level and handed to a [LogSink] chosen by the embedding environment
//! (a serial console, a kernel ring buffer, a test capture).

use core::fmt::Arguments;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, set_logger, set_max_level};
use spin::Once;

/// Destination of formatted log lines.
pub trait LogSink: Sync {
    fn write_line(&self, line: Arguments);
}

pub struct Logger {
    sink: Once<&'static dyn LogSink>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && self.sink.is_completed()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31, // Red
            Level::Warn => 93,  // BrightYellow
            Level::Info => 37,  // White
            Level::Debug => 32, // Green
            Level::Trace => 90, // BrightBlack
        };
        if let Some(sink) = self.sink.get() {
            sink.write_line(format_args!(
                "\u{1B}[{}m[{:}] {}\u{1B}[0m",
                color,
                record.level(),
                record.args(),
            ));
        }
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger { sink: Once::new() };

/// Install the logger, writing to `sink` and dropping records above `level`.
///
/// Only the first call installs a sink; later calls report the `log` crate's error.
pub fn init(sink: &'static dyn LogSink, level: LevelFilter) -> Result<(), SetLoggerError> {
    set_logger(&LOGGER)?;
    LOGGER.sink.call_once(|| sink);
    set_max_level(level);
    Ok(())
}

/// Improved debug macro,
/// only compiled in debug mode.
#[macro_export]
macro_rules! debug_ex {
    // debug_ex!(target: "my_target", "a {} event", "log")
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            ::log::log!(target: $target, ::log::Level::Debug, $($arg)+)
        }
    };

    // debug_ex!("a {} event", "log")
    ($($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            ::log::log!(::log::Level::Debug, $($arg)+)
        }
    }
}

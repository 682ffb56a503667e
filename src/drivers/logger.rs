//! `log` backend on the serial console
//!
//! Diagnostics from the syscall layer go through the `log` facade. The
//! kernel installs [`KernelLogger`] once at boot; until then, and on the
//! host, log records are discarded.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Writes log records to the UART as `[LEVEL target] message`.
pub struct KernelLogger {
    level: LevelFilter,
}

impl KernelLogger {
    /// Create a logger that keeps records at or above `level`.
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            crate::kprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger::new(LevelFilter::Debug);

/// Install the console logger.
///
/// Fails if a logger was already installed.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level.min(LOGGER.level));
    Ok(())
}

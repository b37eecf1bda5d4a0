//! Leveled logging for the VMP firmware crates.
//!
//! The firmware registers a sink with [`set_log_fn`] once its console is up;
//! until then every message is silently discarded. Messages above the level
//! set with [`set_max_level`] are dropped before the sink is called, so the
//! register-file dump and per-call tracing cost nothing on a quiet build.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Log levels: lower is more severe
// ---------------------------------------------------------------------------

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// A call failed and the caller will see an error status.
    Error = 0,
    /// Unexpected state that was tolerated (e.g. a suspicious restored image).
    Warn = 1,
    /// High-level progress messages.
    Info = 2,
    /// Region table dumps and per-call decisions.
    Debug = 3,
    /// Very verbose, per-slot tracing.
    Trace = 4,
}

impl LogLevel {
    /// Returns the human-readable name (fixed-width for aligned output).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN ",
            Self::Info => "INFO ",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Error,
            1 => Self::Warn,
            2 => Self::Info,
            3 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().trim_end())
    }
}

// ---------------------------------------------------------------------------
// Sink registration
// ---------------------------------------------------------------------------

/// The signature of the global leveled log function.
pub type LogFn = fn(LogLevel, fmt::Arguments<'_>);

fn null_log(_level: LogLevel, _args: fmt::Arguments<'_>) {}

static LOG_FN: AtomicPtr<()> = AtomicPtr::new(null_log as *mut ());

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Registers the global log sink.
///
/// # Safety
///
/// The provided function must be safe to call from any context the VMP calls
/// run in, including with interrupts masked. May be called more than once
/// (e.g. an early UART sink replaced by the full console).
pub unsafe fn set_log_fn(f: LogFn) {
    LOG_FN.store(f as *mut (), Ordering::Release);
}

/// Sets the most verbose level that reaches the sink.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the most verbose level that reaches the sink.
pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Returns `true` if a message at `level` would reach the sink.
#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn load_log_fn() -> LogFn {
    let ptr = LOG_FN.load(Ordering::Acquire);
    // SAFETY: Only valid `LogFn` pointers (or the initial `null_log`) are
    // ever stored into LOG_FN.
    unsafe { core::mem::transmute::<*mut (), LogFn>(ptr) }
}

/// Implementation detail for [`klog!`]. Not public API.
#[doc(hidden)]
pub fn _log(level: LogLevel, args: fmt::Arguments<'_>) {
    if enabled(level) {
        load_log_fn()(level, args);
    }
}

/// Logs a message at the given level.
#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::_log($level, format_args!($($arg)*))
    };
}

/// Logs an error-level message.
#[macro_export]
macro_rules! kerr {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Error, $($arg)*) };
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Warn, $($arg)*) };
}

/// Logs an info-level message.
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Info, $($arg)*) };
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Debug, $($arg)*) };
}

/// Logs a trace-level message.
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Trace, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::vec::Vec;

    static CAPTURED: Mutex<Vec<LogLevel>> = Mutex::new(Vec::new());

    fn capture(level: LogLevel, _args: fmt::Arguments<'_>) {
        CAPTURED.lock().unwrap().push(level);
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::from_u8(200), LogLevel::Trace);
    }

    #[test]
    fn display_trims_padding() {
        assert_eq!(std::format!("{}", LogLevel::Warn), "WARN");
        assert_eq!(LogLevel::Warn.name().len(), LogLevel::Error.name().len());
    }

    // Single test so the global sink and level are not raced by another test.
    #[test]
    fn sink_receives_filtered_messages() {
        unsafe { set_log_fn(capture) };

        set_max_level(LogLevel::Warn);
        assert_eq!(max_level(), LogLevel::Warn);
        crate::kerr!("slot {} rejected", 3);
        crate::kwarn!("restored image not monotonic");
        crate::kdebug!("dropped");
        crate::ktrace!("dropped");

        set_max_level(LogLevel::Trace);
        crate::ktrace!("kept");

        let seen = CAPTURED.lock().unwrap().clone();
        assert_eq!(seen, [LogLevel::Error, LogLevel::Warn, LogLevel::Trace]);

        set_max_level(LogLevel::Info);
    }
}

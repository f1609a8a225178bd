//! Verbosity-gated logging for the timetable engine.
//!
//! Levels, set through `EngineConfig::verbosity`:
//! - 0: SILENT
//! - 1: CHANGES (entries stored, updated, deactivated)
//! - 2: CHECKS (rejected drafts, detected conflicts)
//! - 3: DEBUG (every candidate/entry comparison)
//!
//! Message arguments are only evaluated when the level is enabled.

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Whether messages at `level` are printed for the configured `verbosity`.
#[inline]
pub fn enabled(verbosity: u8, level: u8) -> bool {
    level != VERBOSITY_SILENT && verbosity >= level
}

/// Log entry writes (verbosity >= 1).
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_CHANGES) {
            eprintln!("[timetable] {}", format_args!($($arg)*));
        }
    };
}

/// Log validation and conflict outcomes (verbosity >= 2).
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_CHECKS) {
            eprintln!("[timetable] {}", format_args!($($arg)*));
        }
    };
}

/// Log per-comparison detail (verbosity >= 3), indented under its check.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_DEBUG) {
            eprintln!("[timetable]   {}", format_args!($($arg)*));
        }
    };
}

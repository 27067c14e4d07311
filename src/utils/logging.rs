//! Logging macros gated on a per-module `ENABLE_LOGS` flag.
//!
//! Telemetry code runs on every user interaction, so each module decides
//! whether its chatter reaches the `log` facade at all:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_debug!("queued payload, {} pending", 3);
//! ```

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Info-level logging, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

//! Operator interruption via atomic flag
//!
//! Covers SIGTERM/SIGINT sent to the watcher itself. Termination notices
//! from the metadata service go through [`crate::Notifier`] instead.

use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status used when a second signal forces exit
pub const FORCED_EXIT_CODE: i32 = 130;

/// Global shutdown flag — set by SIGTERM/SIGINT handler
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Request shutdown (for signal handlers)
pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}

/// Register SIGTERM/SIGINT handlers.
///
/// First signal: set the shutdown flag.
/// Second signal: exit immediately.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(FORCED_EXIT_CODE);
                }
            })?;
        }
    }
    Ok(())
}

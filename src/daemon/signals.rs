//! Signal handling: SIGTERM/SIGINT request a graceful stop of the display loop.
//!
//! Uses the `signal-hook` crate for safe signal registration. The handlers only
//! flip a flag; the loop and the system clock's sliced sleep poll it.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::daemon::loop_main::StopSignal;

/// Shutdown flag shared between the OS signal handlers and the loop.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register SIGTERM/SIGINT.
    ///
    /// Registration is best-effort; failures are logged to stderr but not fatal.
    #[must_use]
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    /// A handler that only reacts to [`request_shutdown`](Self::request_shutdown).
    #[must_use]
    pub fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    /// The raw flag, for code that must not depend on this module.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[SMX-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[SMX-SIGNAL] failed to register SIGINT: {e}");
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal for SignalHandler {
    fn should_stop(&mut self, _completed_cycles: u64) -> bool {
        self.should_shutdown()
    }

    fn reason(&self) -> &'static str {
        "signal"
    }
}

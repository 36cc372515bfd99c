//! Ctrl-C handling.
//!
//! The handler only sets a flag; long-running work polls it between units of
//! work and stops cleanly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag set when the user interrupts the process.
#[derive(Clone, Debug)]
pub struct InterruptHandler {
    flag: Arc<AtomicBool>,
}

impl InterruptHandler {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers this flag as the process-wide Ctrl-C handler.
    ///
    /// Can only succeed once per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let handler = self.clone();
        ctrlc::set_handler(move || handler.trigger())
    }

    /// Set the flag.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether an interrupt has been received.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for InterruptHandler {
    fn default() -> Self {
        Self::new()
    }
}

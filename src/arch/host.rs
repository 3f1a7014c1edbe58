//! Host port.
//!
//! There is no CPU state to switch on the host. A requested switch is only
//! latched, and [`sim`] lets a test play the part of the PendSV handler.

use core::sync::atomic::{AtomicBool, Ordering};

static SWITCH_PENDING: AtomicBool = AtomicBool::new(false);

pub fn init() {
    SWITCH_PENDING.store(false, Ordering::SeqCst);
}

pub fn schedule() {
    SWITCH_PENDING.store(true, Ordering::SeqCst);
}

/// Drives the global kernel without real context switches.
pub mod sim {
    use super::{Ordering, SWITCH_PENDING};

    /// Same as `run()`, minus handing over to the threads.
    pub fn start(on_startup: impl FnOnce()) {
        crate::arm_first_switch(on_startup);
    }

    /// Whether a switch has been requested and not yet performed.
    pub fn switch_pending() -> bool {
        SWITCH_PENDING.load(Ordering::SeqCst)
    }

    /// Performs a pending switch like the PendSV handler would.
    ///
    /// `saved_sp` stands in for the outgoing thread's stack pointer. Returns
    /// the incoming thread's stack pointer, `None` if nothing was pending.
    pub fn pend_sv(saved_sp: usize) -> Option<usize> {
        if !SWITCH_PENDING.swap(false, Ordering::SeqCst) {
            return None;
        }
        let saved_sp = if crate::has_current() { saved_sp } else { 0 };
        Some(crate::switch_context(saved_sp))
    }
}

//! Kernel contract violations.
//!
//! Nothing in here is recoverable: once a violation is detected the scheduler
//! state can no longer be trusted, so [`fault`] panics. The board's panic
//! handler decides between halting (debug) and resetting (production).

use core::fmt;

use crate::stack::MIN_STACK_WORDS;
use crate::thread::{Priority, MAX_PRIORITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// thread started above `MAX_PRIORITY`
    PriorityOutOfRange(Priority),
    /// thread started at a priority that is already in use
    PriorityTaken(Priority),
    /// stack region can't hold the initial frame plus working stack
    StackTooSmall { words: usize },
    /// the idle thread tried to delay itself
    IdleDelay,
    /// a thread asked to be delayed for zero ticks
    ZeroDelay(Priority),
    /// `delay()` called before any thread was running
    NoCurrentThread,
    /// a bitmap names a priority whose table slot is empty
    EmptySlot(Priority),
    /// a delayed thread has no ticks left
    ZeroTimeout(Priority),
    /// a switch was requested but there is no thread to switch to
    NothingToRun,
    /// `run()` resumed after handing over to the threads
    ReturnedFromRun,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriorityOutOfRange(p) => {
                write!(f, "priority {} out of range 0..={}", p, MAX_PRIORITY)
            }
            Self::PriorityTaken(p) => write!(f, "priority {} already in use", p),
            Self::StackTooSmall { words } => write!(
                f,
                "stack of {} words too small, need at least {}",
                words, MIN_STACK_WORDS
            ),
            Self::IdleDelay => f.write_str("idle thread cannot delay"),
            Self::ZeroDelay(p) => write!(f, "thread {} cannot delay for 0 ticks", p),
            Self::NoCurrentThread => f.write_str("no thread is running"),
            Self::EmptySlot(p) => write!(f, "priority {} has no thread", p),
            Self::ZeroTimeout(p) => write!(f, "delayed thread {} has zero timeout", p),
            Self::NothingToRun => f.write_str("switch requested without a thread to run"),
            Self::ReturnedFromRun => f.write_str("returned from run()"),
        }
    }
}

/// Kernel panic.
///
/// The caller's source location ends up in the panic info.
#[cold]
#[track_caller]
pub fn fault(violation: Violation) -> ! {
    panic!("kernel fault: {}", violation)
}

/// Scheduling priority. Higher values win, `0` belongs to the idle thread.
pub type Priority = u8;

/// Highest priority a thread can be started at.
pub const MAX_PRIORITY: Priority = 32;

/// Priority reserved for the idle thread.
pub const IDLE_PRIORITY: Priority = 0;

/// Number of thread table slots, one per priority including idle.
pub const THREAD_SLOTS: usize = MAX_PRIORITY as usize + 1;

/// Thread entry point. Threads never return.
pub type ThreadEntry = fn() -> !;

/// Thread control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thread {
    pub(crate) sp: usize,
    pub(crate) timeout: u32,
    pub(crate) prio: Priority,
}

impl Thread {
    pub(crate) const fn new(sp: usize, prio: Priority) -> Self {
        Self {
            sp,
            timeout: 0,
            prio,
        }
    }

    /// Saved stack pointer.
    ///
    /// Only meaningful while the thread is suspended; the live value of the
    /// running thread is in the CPU.
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Ticks left until the thread wakes up, `0` if it is not delayed.
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub fn prio(&self) -> Priority {
        self.prio
    }

    pub fn is_idle(&self) -> bool {
        self.prio == IDLE_PRIORITY
    }
}

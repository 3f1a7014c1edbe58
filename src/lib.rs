//! Preemptive, priority based kernel for single-core Cortex-M.
//!
//! Every thread has its own static priority in `0..=MAX_PRIORITY`; the
//! highest ready one runs. Priority `0` is the idle thread created by
//! [`init`], which runs whenever nothing else is ready. Threads give up the
//! CPU only by calling [`delay`]; the board calls [`tick`] from its periodic
//! timer interrupt, which wakes delayed threads and preempts lower
//! priority ones.
//!
//! ```ignore
//! artos::init(idle_stack, || cortex_m::asm::wfi());
//! artos::start_thread(5, blinky, blinky_stack);
//! artos::run(|| start_systick());
//! ```
#![cfg_attr(not(test), no_std)]

macro_rules! println {
    ($($arg:tt)*) => {{
        #[cfg(all(target_arch = "arm", target_feature = "thumb2", feature = "semihosting"))]
        cortex_m_semihosting::hprintln!($($arg)*);
        #[cfg(test)]
        std::println!($($arg)*);
        #[cfg(not(any(test, all(target_arch = "arm", target_feature = "thumb2", feature = "semihosting"))))]
        let _ = format_args!($($arg)*);
    }};
}

mod arch;
mod ensure_once;
mod stack;

pub mod fault;
pub mod prio_set;
pub mod scheduler;
pub mod thread;

#[cfg(not(all(target_arch = "arm", target_feature = "thumb2")))]
pub use arch::host::sim;
pub use fault::Violation;
pub use prio_set::PrioSet;
pub use scheduler::Scheduler;
pub use stack::{MIN_STACK_WORDS, STACK_SENTINEL};
pub use thread::{Priority, Thread, ThreadEntry, IDLE_PRIORITY, MAX_PRIORITY, THREAD_SLOTS};

use ensure_once::EnsureOnce;
use fault::fault;

static KERNEL: EnsureOnce<Scheduler> = EnsureOnce::new(Scheduler::new());

static IDLE_HOOK: EnsureOnce<fn()> = EnsureOnce::new(nop);

fn nop() {}

fn idle_thread() -> ! {
    let on_idle = IDLE_HOOK.with(|hook| *hook);
    loop {
        on_idle();
    }
}

/// Initializes the kernel.
///
/// Resets the scheduler state and starts the idle thread on `idle_stack`.
/// `on_idle` is called over and over whenever no other thread is ready; it
/// must not block or delay.
pub fn init(idle_stack: &'static mut [u32], on_idle: fn()) {
    arch::init();
    critical_section::with(|cs| {
        IDLE_HOOK.with_mut_cs(cs, |mut hook| *hook = on_idle);
        KERNEL.with_mut_cs(cs, |mut sched| {
            *sched = Scheduler::new();
            sched.start_thread(IDLE_PRIORITY, idle_thread, idle_stack);
        });
    });
    println!("artos: idle thread ready");
}

/// Starts a thread at `prio`.
///
/// The thread is ready right away and runs `entry` once it gets picked.
/// Starting two threads at the same priority is a kernel fault.
pub fn start_thread(prio: Priority, entry: ThreadEntry, stack: &'static mut [u32]) {
    let words = stack.len();
    KERNEL.with_mut(|mut sched| sched.start_thread(prio, entry, stack));
    println!("artos: thread {} started, {} stack words", prio, words);
}

/// Hands the CPU over to the threads. Never returns.
///
/// `on_startup` runs with interrupts masked right before the first switch;
/// this is where the board arms its tick source.
pub fn run(on_startup: impl FnOnce()) -> ! {
    println!("artos: starting scheduler");
    arm_first_switch(on_startup);
    // the switch out of here happens as soon as interrupts are unmasked
    fault(Violation::ReturnedFromRun)
}

pub(crate) fn arm_first_switch(on_startup: impl FnOnce()) {
    critical_section::with(|cs| {
        on_startup();
        if KERNEL.with_mut_cs(cs, |mut sched| sched.schedule()) {
            arch::schedule();
        }
    });
}

/// Tick handler, to be called from the board's periodic timer interrupt.
///
/// Counts down all delayed threads, then reschedules.
pub fn tick() {
    critical_section::with(|cs| {
        let switch = KERNEL.with_mut_cs(cs, |mut sched| {
            sched.tick();
            sched.schedule()
        });
        if switch {
            arch::schedule();
        }
    });
}

/// Blocks the calling thread for `ticks` ticks.
///
/// The wait ends on the `ticks`-th tick interrupt after the call, so it lasts
/// up to one tick less than `ticks` tick periods. `ticks` must be at least 1,
/// and the idle thread must not call this.
pub fn delay(ticks: u32) {
    critical_section::with(|cs| {
        if KERNEL.with_mut_cs(cs, |mut sched| sched.delay(ticks)) {
            arch::schedule();
        }
    });
}

/// Priority of the running thread, `None` before [`run`] handed over.
pub fn current_priority() -> Option<Priority> {
    KERNEL.with(|sched| sched.current())
}

pub(crate) extern "C" fn has_current() -> bool {
    KERNEL.with(|sched| sched.has_current())
}

pub(crate) extern "C" fn switch_context(saved_sp: usize) -> usize {
    KERNEL.with_mut(|mut sched| sched.switch_context(saved_sp))
}

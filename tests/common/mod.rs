#![allow(dead_code)]

use std::cell::Cell;

use artos::{Priority, Scheduler, IDLE_PRIORITY, MAX_PRIORITY};

pub fn spin() -> ! {
    loop {}
}

/// Leaked stack region that stays readable after the kernel took it.
///
/// The mutable region can be handed out once.
pub struct TestStack {
    ptr: *mut [u32],
    taken: Cell<bool>,
}

impl TestStack {
    pub fn new(words: usize) -> Self {
        Self {
            ptr: Box::into_raw(vec![0u32; words].into_boxed_slice()),
            taken: Cell::new(false),
        }
    }

    pub fn take(&self) -> &'static mut [u32] {
        assert!(!self.taken.replace(true), "stack handed out twice");
        // SAFETY: leaked allocation, and this is the only `&mut` ever made from it.
        unsafe { &mut *self.ptr }
    }

    pub fn words(&self) -> &[u32] {
        unsafe { &*self.ptr }
    }

    pub fn index_of(&self, sp: usize) -> usize {
        (sp - self.words().as_ptr() as usize) / core::mem::size_of::<u32>()
    }
}

pub fn stack() -> &'static mut [u32] {
    Box::leak(vec![0u32; 64].into_boxed_slice())
}

pub fn with_threads(prios: &[Priority]) -> Scheduler {
    let mut sched = Scheduler::new();
    sched.start_thread(IDLE_PRIORITY, spin, stack());
    for &prio in prios {
        sched.start_thread(prio, spin, stack());
    }
    sched
}

/// Checks the bitmap/table invariants for every priority.
pub fn assert_consistent(sched: &Scheduler) {
    let ready = sched.ready_set();
    let delayed = sched.delayed_set();
    assert_eq!(ready.bits() & delayed.bits(), 0, "ready and delayed overlap");

    for prio in 0..=MAX_PRIORITY {
        match sched.thread(prio) {
            None => {
                assert!(!ready.contains(prio), "{} ready without thread", prio);
                assert!(!delayed.contains(prio), "{} delayed without thread", prio);
            }
            Some(thread) => {
                let is_delayed = delayed.contains(prio);
                assert_eq!(is_delayed, thread.timeout() != 0, "timeout of {}", prio);
                assert_eq!(ready.contains(prio), prio != IDLE_PRIORITY && !is_delayed);
            }
        }
    }
}

/// Simple linear congruential generator.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state >> 33
    }

    pub fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() % (max - min))
    }
}

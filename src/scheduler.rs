use crate::fault::{fault, Violation};
use crate::prio_set::PrioSet;
use crate::stack::setup_stack;
use crate::thread::{Priority, Thread, ThreadEntry, IDLE_PRIORITY, MAX_PRIORITY, THREAD_SLOTS};

/// Scheduler state.
///
/// Holds the thread table (indexed by priority), the ready and delayed sets
/// and the `current`/`next` bookkeeping of the switch protocol. The methods
/// here only decide; actually switching stacks is up to the arch port, which
/// gets told to pend a switch whenever [`Scheduler::schedule`] returns `true`.
///
/// Callers must hold a critical section for every call.
#[derive(Debug)]
pub struct Scheduler {
    threads: [Option<Thread>; THREAD_SLOTS],
    current: Option<Priority>,
    next: Option<Priority>,
    ready: PrioSet,
    delayed: PrioSet,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            threads: [None; THREAD_SLOTS],
            current: None,
            next: None,
            ready: PrioSet::new(),
            delayed: PrioSet::new(),
        }
    }

    /// Registers a thread at `prio` and makes it ready.
    ///
    /// Synthesizes the initial frame on `stack` so the first switch to this
    /// thread starts it at `entry`. Priority `0` registers the idle thread,
    /// which never enters the ready set.
    pub fn start_thread(&mut self, prio: Priority, entry: ThreadEntry, stack: &'static mut [u32]) {
        if prio > MAX_PRIORITY {
            fault(Violation::PriorityOutOfRange(prio));
        }
        if self.threads[prio as usize].is_some() {
            fault(Violation::PriorityTaken(prio));
        }

        let sp = setup_stack(stack, entry);
        self.threads[prio as usize] = Some(Thread::new(sp, prio));
        if prio != IDLE_PRIORITY {
            self.ready.insert(prio);
        }
    }

    /// Picks the highest ready priority, or idle if nothing is ready.
    ///
    /// Returns `true` if a switch to a different thread has been armed and
    /// the caller has to request it from the port. Choosing the thread
    /// that's already running (or already armed) returns `false`.
    pub fn schedule(&mut self) -> bool {
        let prio = self.ready.highest().unwrap_or(IDLE_PRIORITY);
        if self.threads[prio as usize].is_none() {
            fault(Violation::EmptySlot(prio));
        }

        if Some(prio) == self.current {
            // supersede a switch that was armed but hasn't happened yet
            self.next = None;
            false
        } else if Some(prio) == self.next {
            false
        } else {
            self.next = Some(prio);
            true
        }
    }

    /// Advances all delayed threads by one tick.
    ///
    /// Only the delayed set is walked. Threads whose timeout runs out move to
    /// the ready set; when several expire on the same tick they are visited
    /// in ascending priority order. Returns the set of threads woken up.
    pub fn tick(&mut self) -> PrioSet {
        let mut woken = PrioSet::new();
        for prio in self.delayed {
            let thread = match self.threads[prio as usize].as_mut() {
                Some(thread) => thread,
                None => fault(Violation::EmptySlot(prio)),
            };
            if thread.timeout == 0 {
                fault(Violation::ZeroTimeout(prio));
            }

            thread.timeout -= 1;
            if thread.timeout == 0 {
                self.delayed.remove(prio);
                self.ready.insert(prio);
                woken.insert(prio);
            }
        }
        woken
    }

    /// Puts the current thread to sleep for `ticks` ticks and reschedules.
    ///
    /// `ticks` must be at least 1.
    /// Returns `true` if a switch has been armed, see [`Scheduler::schedule`].
    pub fn delay(&mut self, ticks: u32) -> bool {
        let prio = match self.current {
            Some(IDLE_PRIORITY) => fault(Violation::IdleDelay),
            Some(prio) => prio,
            None => fault(Violation::NoCurrentThread),
        };
        if ticks == 0 {
            fault(Violation::ZeroDelay(prio));
        }

        let thread = match self.threads[prio as usize].as_mut() {
            Some(thread) => thread,
            None => fault(Violation::EmptySlot(prio)),
        };
        thread.timeout = ticks;
        self.ready.remove(prio);
        self.delayed.insert(prio);

        self.schedule()
    }

    /// Portable half of the context switch.
    ///
    /// `saved_sp` is the outgoing thread's stack pointer after its software
    /// frame was pushed; it is ignored on the very first switch, when no
    /// thread is running yet. Makes the armed thread current and returns the
    /// stack pointer to restore. Without an armed thread, the current one
    /// keeps running.
    pub fn switch_context(&mut self, saved_sp: usize) -> usize {
        if let Some(prio) = self.current {
            match self.threads[prio as usize].as_mut() {
                Some(thread) => thread.sp = saved_sp,
                None => fault(Violation::EmptySlot(prio)),
            }
        }

        let prio = match self.next.take().or(self.current) {
            Some(prio) => prio,
            None => fault(Violation::NothingToRun),
        };
        let sp = match &self.threads[prio as usize] {
            Some(thread) => thread.sp,
            None => fault(Violation::EmptySlot(prio)),
        };
        self.current = Some(prio);
        sp
    }

    /// Whether a thread is running, i.e. there is something to save.
    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<Priority> {
        self.current
    }

    /// Thread armed to run after the pending switch.
    pub fn next(&self) -> Option<Priority> {
        self.next
    }

    pub fn ready_set(&self) -> PrioSet {
        self.ready
    }

    pub fn delayed_set(&self) -> PrioSet {
        self.delayed
    }

    pub fn thread(&self, prio: Priority) -> Option<&Thread> {
        self.threads.get(prio as usize)?.as_ref()
    }

    /// Priorities with a registered thread, idle included.
    pub fn priorities(&self) -> impl Iterator<Item = Priority> + '_ {
        self.threads
            .iter()
            .flatten()
            .map(|thread| thread.prio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::vec;

    fn spin() -> ! {
        loop {}
    }

    fn stack() -> &'static mut [u32] {
        Box::leak(vec![0u32; 64].into_boxed_slice())
    }

    fn with_threads(prios: &[Priority]) -> Scheduler {
        let mut sched = Scheduler::new();
        sched.start_thread(IDLE_PRIORITY, spin, stack());
        for &prio in prios {
            sched.start_thread(prio, spin, stack());
        }
        sched
    }

    /// schedule and, if armed, perform the switch
    fn step(sched: &mut Scheduler) {
        if sched.schedule() {
            sched.switch_context(0x1000);
        }
    }

    #[test]
    fn start_marks_ready() {
        let sched = with_threads(&[1, 7]);
        assert_eq!(sched.ready_set().bits(), 0b100_0001);
        assert!(sched.delayed_set().is_empty());
        assert_eq!(sched.thread(7).unwrap().prio(), 7);
        assert_eq!(sched.thread(7).unwrap().timeout(), 0);
        assert!(sched.thread(0).unwrap().is_idle());
        assert!(sched.thread(3).is_none());
        assert_eq!(sched.priorities().collect::<std::vec::Vec<_>>(), [0, 1, 7]);
    }

    #[test]
    #[should_panic(expected = "priority 33 out of range")]
    fn start_out_of_range() {
        with_threads(&[MAX_PRIORITY + 1]);
    }

    #[test]
    fn start_duplicate_leaves_table() {
        let mut sched = with_threads(&[4]);
        let before = sched.thread(4).copied();
        let ready = sched.ready_set();

        let res = catch_unwind(AssertUnwindSafe(|| sched.start_thread(4, spin, stack())));
        assert!(res.is_err());
        assert_eq!(sched.thread(4).copied(), before);
        assert_eq!(sched.ready_set(), ready);
    }

    #[test]
    fn cold_start_selects_highest() {
        let mut sched = with_threads(&[3, 5, 9]);
        assert!(sched.schedule());
        assert_eq!(sched.next(), Some(9));
        assert!(!sched.has_current());

        let sp = sched.switch_context(0);
        assert_eq!(sp, sched.thread(9).unwrap().sp());
        assert_eq!(sched.current(), Some(9));
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn idle_when_nothing_ready() {
        let mut sched = with_threads(&[]);
        assert!(sched.schedule());
        assert_eq!(sched.next(), Some(IDLE_PRIORITY));
    }

    #[test]
    fn no_redundant_switch() {
        let mut sched = with_threads(&[2]);
        assert!(sched.schedule());
        assert!(!sched.schedule());

        sched.switch_context(0);
        assert!(!sched.schedule());
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn superseded_switch_keeps_current() {
        let mut sched = with_threads(&[2]);
        step(&mut sched);
        assert_eq!(sched.current(), Some(2));

        // 2 delays, idle gets armed
        assert!(sched.delay(1));
        assert_eq!(sched.next(), Some(IDLE_PRIORITY));

        // woken before the switch happened
        sched.tick();
        assert!(!sched.schedule());
        assert_eq!(sched.next(), None);

        assert_eq!(sched.switch_context(0x2000), 0x2000);
        assert_eq!(sched.current(), Some(2));
    }

    #[test]
    fn switch_saves_outgoing_sp() {
        let mut sched = with_threads(&[1, 2]);
        step(&mut sched);
        assert_eq!(sched.current(), Some(2));

        assert!(sched.delay(5));
        let next_sp = sched.thread(1).unwrap().sp();
        assert_eq!(sched.switch_context(0xabc0), next_sp);
        assert_eq!(sched.thread(2).unwrap().sp(), 0xabc0);
        assert_eq!(sched.current(), Some(1));
    }

    #[test]
    fn delay_and_wake() {
        let mut sched = with_threads(&[3]);
        step(&mut sched);

        assert!(sched.delay(3));
        assert!(!sched.ready_set().contains(3));
        assert!(sched.delayed_set().contains(3));
        assert_eq!(sched.thread(3).unwrap().timeout(), 3);
        sched.switch_context(0x3000);
        assert_eq!(sched.current(), Some(IDLE_PRIORITY));

        assert!(sched.tick().is_empty());
        assert!(sched.tick().is_empty());
        assert!(sched.delayed_set().contains(3));
        assert_eq!(sched.thread(3).unwrap().timeout(), 1);

        assert!(sched.tick().contains(3));
        assert!(sched.ready_set().contains(3));
        assert!(!sched.delayed_set().contains(3));
        assert_eq!(sched.thread(3).unwrap().timeout(), 0);

        assert!(sched.schedule());
        assert_eq!(sched.switch_context(0x4000), 0x3000);
    }

    #[test]
    fn delay_zero_rejected() {
        let mut sched = with_threads(&[3]);
        step(&mut sched);
        let ready = sched.ready_set();
        let delayed = sched.delayed_set();

        let res = catch_unwind(AssertUnwindSafe(|| sched.delay(0)));
        assert!(res.is_err());
        assert_eq!(sched.ready_set(), ready);
        assert_eq!(sched.delayed_set(), delayed);
        assert_eq!(sched.thread(3).unwrap().timeout(), 0);
        assert_eq!(sched.next(), None);
    }

    #[test]
    #[should_panic(expected = "thread 3 cannot delay for 0 ticks")]
    fn delay_zero_faults() {
        let mut sched = with_threads(&[3]);
        step(&mut sched);
        sched.delay(0);
    }

    #[test]
    fn idle_cannot_delay() {
        let mut sched = with_threads(&[]);
        step(&mut sched);
        assert_eq!(sched.current(), Some(IDLE_PRIORITY));

        let res = catch_unwind(AssertUnwindSafe(|| sched.delay(2)));
        assert!(res.is_err());
        assert!(sched.ready_set().is_empty());
        assert!(sched.delayed_set().is_empty());
    }

    #[test]
    #[should_panic(expected = "no thread is running")]
    fn delay_before_start() {
        with_threads(&[1]).delay(1);
    }

    #[test]
    #[should_panic(expected = "priority 6 has no thread")]
    fn schedule_empty_slot() {
        let mut sched = with_threads(&[1]);
        sched.ready.insert(6);
        sched.schedule();
    }

    #[test]
    #[should_panic(expected = "priority 9 has no thread")]
    fn tick_empty_slot() {
        let mut sched = with_threads(&[1]);
        sched.delayed.insert(9);
        sched.tick();
    }

    #[test]
    #[should_panic(expected = "priority 5 has no thread")]
    fn switch_from_empty_slot() {
        let mut sched = with_threads(&[1]);
        sched.current = Some(5);
        sched.next = Some(1);
        sched.switch_context(0x1000);
    }

    #[test]
    #[should_panic(expected = "delayed thread 1 has zero timeout")]
    fn tick_zero_timeout() {
        let mut sched = with_threads(&[1]);
        sched.ready.remove(1);
        sched.delayed.insert(1);
        sched.tick();
    }

    #[test]
    #[should_panic(expected = "switch requested without a thread to run")]
    fn switch_without_threads() {
        Scheduler::new().switch_context(0);
    }
}

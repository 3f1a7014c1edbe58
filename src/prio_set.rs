use crate::thread::{Priority, MAX_PRIORITY};

/// Set of thread priorities `1..=MAX_PRIORITY`, one bit each.
///
/// Priority `p` lives in bit `p - 1`. The idle priority has no bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrioSet(u32);

impl PrioSet {
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    const fn bit(prio: Priority) -> u32 {
        debug_assert!(prio >= 1 && prio <= MAX_PRIORITY);
        1 << (prio - 1)
    }

    pub fn insert(&mut self, prio: Priority) {
        self.0 |= Self::bit(prio);
    }

    pub fn remove(&mut self, prio: Priority) {
        self.0 &= !Self::bit(prio);
    }

    pub fn contains(self, prio: Priority) -> bool {
        prio != 0 && prio <= MAX_PRIORITY && self.0 & Self::bit(prio) != 0
    }

    /// Highest priority in the set, found with a single leading-zero count.
    pub fn highest(self) -> Option<Priority> {
        if self.0 == 0 {
            None
        } else {
            Some((u32::BITS - self.0.leading_zeros()) as Priority)
        }
    }

    /// Iterates the set members in ascending priority order.
    ///
    /// Only set bits are visited.
    pub fn iter(self) -> Iter {
        Iter(self.0)
    }
}

impl IntoIterator for PrioSet {
    type Item = Priority;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Ascending iterator over a [`PrioSet`].
#[derive(Debug, Clone)]
pub struct Iter(u32);

impl Iterator for Iter {
    type Item = Priority;

    fn next(&mut self) -> Option<Priority> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros();
        // clear lowest set bit
        self.0 &= self.0 - 1;
        Some(bit as Priority + 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Iter {}

use core::cell::{Ref, RefCell, RefMut};

use critical_section::{CriticalSection, Mutex};

/// Interrupt-safe global cell.
///
/// Every access runs inside a critical section, either its own or the one
/// handed in by the caller.
pub(crate) struct EnsureOnce<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> EnsureOnce<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(inner)),
        }
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(Ref<T>) -> R,
    {
        critical_section::with(|cs| f(self.inner.borrow_ref(cs)))
    }

    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(RefMut<T>) -> R,
    {
        critical_section::with(|cs| self.with_mut_cs(cs, f))
    }

    pub fn with_mut_cs<F, R>(&self, cs: CriticalSection, f: F) -> R
    where
        F: FnOnce(RefMut<T>) -> R,
    {
        f(self.inner.borrow_ref_mut(cs))
    }
}

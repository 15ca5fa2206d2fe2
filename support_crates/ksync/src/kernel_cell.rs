use core::cell::UnsafeCell;
use core::fmt::{Debug, Formatter};
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// A cell granting exclusive access to kernel state on a single hart.
///
/// The kernel only ever has one thread of control so no waiting is ever required to access shared state.
/// However, a nested borrow means that the kernel re-entered itself (e.g. a trap while a borrow was held) which
/// would otherwise alias a mutable reference.
/// Such a nested borrow is therefore treated as a bug and [`borrow_mut()`](KernelCell::borrow_mut) panics.
pub struct KernelCell<T> {
    borrowed: AtomicBool,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for KernelCell<T> {}
unsafe impl<T: Send> Send for KernelCell<T> {}

/// A handle to the value inside a [`KernelCell`].
///
/// The cell is released again when the guard is dropped.
pub struct Guard<'cell, T> {
    cell: &'cell KernelCell<T>,
}

impl<T> KernelCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            borrowed: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Borrow the contained value if no other borrow is currently active
    pub fn try_borrow_mut(&self) -> Option<Guard<'_, T>> {
        self.borrowed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Guard { cell: self })
    }

    /// Borrow the contained value.
    ///
    /// # Panics
    /// Panics if the value is already borrowed.
    #[track_caller]
    pub fn borrow_mut(&self) -> Guard<'_, T> {
        match self.try_borrow_mut() {
            Some(guard) => guard,
            None => panic!(
                "kernel re-entered while {} was borrowed",
                core::any::type_name::<T>()
            ),
        }
    }

    /// Whether a [`Guard`] for this cell currently exists
    pub fn is_borrowed(&self) -> bool {
        self.borrowed.load(Ordering::Relaxed)
    }
}

impl<T> Debug for KernelCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelCell")
            .field("borrowed", &self.is_borrowed())
            .finish_non_exhaustive()
    }
}

impl<T> Deref for Guard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for Guard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        self.cell.borrowed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_borrow_is_released_on_drop() {
        let cell = KernelCell::new(1u32);
        {
            let mut guard = cell.borrow_mut();
            *guard += 1;
            assert!(cell.is_borrowed());
        }
        assert!(!cell.is_borrowed());
        assert_eq!(*cell.borrow_mut(), 2);
    }

    #[test]
    fn test_try_borrow_fails_while_borrowed() {
        let cell = KernelCell::new(());
        let _guard = cell.borrow_mut();
        assert!(cell.try_borrow_mut().is_none());
    }

    #[test]
    #[should_panic(expected = "kernel re-entered")]
    fn test_nested_borrow_panics() {
        let cell = KernelCell::new(0u8);
        let _outer = cell.borrow_mut();
        let _inner = cell.borrow_mut();
    }
}

//! # Local Borrow Lock
//!
//! A [`lock_api::RawRwLock`] for archives that never leave one thread.
//! Instead of blocking, conflicting access panics, the same way `RefCell`
//! reports a double borrow.

#![allow(unsafe_code)]

use std::cell::Cell;

use parking_lot::lock_api::{GuardNoSend, RawRwLock};

/// Exclusive lock held.
const WRITER: isize = -1;

/// Single-threaded reader/writer flag.
///
/// `!Sync`, so a `lock_api::RwLock` built on it cannot be shared between
/// threads.
#[derive(Debug)]
pub struct LocalRawRwLock {
    /// `0` free, `n > 0` readers, `-1` writer.
    state: Cell<isize>,
}

// SAFETY: state tracks readers and the writer exactly; a `Cell` cannot be
// observed torn because the type is `!Sync`.
unsafe impl RawRwLock for LocalRawRwLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        state: Cell::new(0),
    };

    type GuardMarker = GuardNoSend;

    fn lock_shared(&self) {
        assert!(
            self.try_lock_shared(),
            "archive is already borrowed exclusively"
        );
    }

    fn try_lock_shared(&self) -> bool {
        let state = self.state.get();
        if state == WRITER {
            return false;
        }
        self.state.set(state + 1);
        true
    }

    unsafe fn unlock_shared(&self) {
        debug_assert!(self.state.get() > 0);
        self.state.set(self.state.get() - 1);
    }

    fn lock_exclusive(&self) {
        assert!(self.try_lock_exclusive(), "archive is already borrowed");
    }

    fn try_lock_exclusive(&self) -> bool {
        if self.state.get() != 0 {
            return false;
        }
        self.state.set(WRITER);
        true
    }

    unsafe fn unlock_exclusive(&self) {
        debug_assert_eq!(self.state.get(), WRITER);
        self.state.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::lock_api::RwLock;

    #[test]
    fn test_many_readers() {
        let lock = RwLock::<LocalRawRwLock, u32>::new(5);
        let a = lock.read();
        let b = lock.read();
        assert_eq!(*a + *b, 10);
        assert!(lock.try_write().is_none());
    }

    #[test]
    fn test_writer_excludes_readers() {
        let lock = RwLock::<LocalRawRwLock, u32>::new(1);
        {
            let mut w = lock.write();
            *w = 2;
            assert!(lock.try_read().is_none());
        }
        assert_eq!(*lock.read(), 2);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn test_conflict_panics() {
        let lock = RwLock::<LocalRawRwLock, u32>::new(1);
        let _r = lock.read();
        let _w = lock.write();
    }
}

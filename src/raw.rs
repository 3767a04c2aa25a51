//! Shim over the platform's blocking lock primitive.
//!
//! The handle layer treats this as an opaque capability: construct, blocking
//! acquire, non-blocking acquire, release. Destruction is the containing
//! record's drop; the parking-lot primitive needs no explicit teardown.

#![allow(unsafe_code)]

use parking_lot::lock_api::RawMutex as RawMutexApi;

/// One native blocking lock. Owned by exactly one bound mutex record.
pub struct OsLock {
    raw: parking_lot::RawMutex,
}

impl OsLock {
    /// Creates an unlocked native lock.
    pub fn new() -> Self {
        Self {
            raw: <parking_lot::RawMutex as RawMutexApi>::INIT,
        }
    }

    /// Blocks the calling thread until the lock is acquired.
    pub fn acquire(&self) {
        self.raw.lock();
    }

    /// Acquires the lock if it is free; never blocks.
    pub fn try_acquire(&self) -> bool {
        self.raw.try_lock()
    }

    /// Releases the lock.
    ///
    /// Must pair with a held acquire; the handle layer forwards its
    /// POSIX-style caller contract here. No data lives behind this lock, so a
    /// violation degrades exclusion for later acquirers and nothing more.
    pub fn release(&self) {
        // SAFETY: the lock guards no memory; the unlock contract it forwards
        // is the exclusion discipline the caller manages manually.
        unsafe { self.raw.unlock() };
    }
}

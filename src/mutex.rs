//! POSIX-style mutex handles with race-free lazy binding.
//!
//! A [`Mutex`] starts unbound and owns no OS resource. The first lock on it
//! allocates a record holding the native lock and publishes that record into
//! the handle with a single compare-exchange; threads that lose the publish
//! race release their own freshly built record and continue with the
//! winner's. Exactly one record therefore survives per handle, and no thread
//! ever observes a half-built one.
//!
//! Lock and unlock discipline is manual, as in the POSIX surface this
//! mirrors; [`Mutex::lock_scoped`] layers a drop-releasing guard on top.
//!
//! # Example
//!
//! ```
//! use bindlock::Mutex;
//!
//! let mut m = Mutex::new();
//! m.init(None).expect("init");
//! m.lock().expect("lock");
//! m.unlock().expect("unlock");
//! m.destroy();
//! assert!(!m.is_bound());
//! ```

#![allow(unsafe_code)]

use std::alloc::{alloc, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use crate::attr::MutexAttr;
use crate::raw::OsLock;

/// Error returned when a mutex record cannot be allocated.
///
/// This is the out-of-memory signal for [`Mutex::init`] and for the lazy
/// binding performed by [`Mutex::lock`] and [`Mutex::try_lock`]. The handle
/// is left in its previous state and the operation may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mutex record allocation failed")
    }
}

impl std::error::Error for AllocError {}

/// Error returned by [`Mutex::try_lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryLockError {
    /// The record could not be allocated while binding the handle.
    OutOfMemory,
    /// The lock is currently held elsewhere.
    WouldBlock,
}

impl fmt::Display for TryLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "mutex record allocation failed"),
            Self::WouldBlock => write!(f, "mutex is currently held"),
        }
    }
}

impl std::error::Error for TryLockError {}

impl From<AllocError> for TryLockError {
    fn from(_: AllocError) -> Self {
        Self::OutOfMemory
    }
}

/// Error returned by [`Mutex::unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockError {
    /// The handle is not bound to a lock: it was never initialized, or it
    /// was destroyed.
    Unbound,
}

impl fmt::Display for UnlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "mutex is not initialized"),
        }
    }
}

impl std::error::Error for UnlockError {}

/// Heap record owning one native lock. The unit the bind race publishes or
/// discards.
struct MutexRecord {
    lock: OsLock,
}

/// Allocates and initializes a record through the fallible allocator, so
/// exhaustion surfaces as an error instead of an abort.
fn new_record() -> Result<Box<MutexRecord>, AllocError> {
    let layout = Layout::new::<MutexRecord>();
    // SAFETY: MutexRecord has non-zero size, so the layout is valid for
    // `alloc`.
    let record = unsafe { alloc(layout) }.cast::<MutexRecord>();
    if record.is_null() {
        return Err(AllocError);
    }
    // SAFETY: `record` is non-null, properly aligned for MutexRecord, and
    // valid for a fresh write; ownership passes to the returned Box.
    unsafe {
        record.write(MutexRecord { lock: OsLock::new() });
        Ok(Box::from_raw(record))
    }
}

/// Record-lifecycle counters for one handle. Diagnostic only; the lock
/// algorithm never reads them.
struct BindCounters {
    /// Records successfully allocated for this handle.
    created: AtomicU64,
    /// Loser records released after a failed publish race.
    discarded: AtomicU64,
    /// Records released by destroy or by dropping the handle.
    destroyed: AtomicU64,
}

impl BindCounters {
    const fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> BindMetrics {
        BindMetrics {
            records_created: self.created.load(Ordering::Relaxed),
            records_discarded: self.discarded.load(Ordering::Relaxed),
            records_destroyed: self.destroyed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a handle's record-lifecycle counters, taken with
/// [`Mutex::metrics`].
///
/// The counters are cumulative across bind/destroy cycles and are updated
/// with relaxed ordering, so a snapshot taken while other threads race the
/// first lock may be mid-update; a snapshot taken after those threads are
/// joined is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindMetrics {
    /// Records successfully allocated over the handle's lifetime.
    pub records_created: u64,
    /// Records discarded after losing a first-lock publish race.
    pub records_discarded: u64,
    /// Records released by [`Mutex::destroy`] or by dropping the handle.
    pub records_destroyed: u64,
}

impl BindMetrics {
    /// Records allocated but not yet discarded or destroyed. A value above
    /// one means an earlier record was leaked by reinitializing a bound
    /// handle.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.records_created - self.records_discarded - self.records_destroyed
    }
}

/// A POSIX-style mutual-exclusion handle over the platform lock primitive.
///
/// A handle is either **unbound** (owns nothing; the freshly constructed
/// state) or **bound** (owns exactly one native lock record). Binding happens
/// explicitly through [`Mutex::init`] or lazily inside the first
/// [`Mutex::lock`] or [`Mutex::try_lock`]; racing first locks are resolved by
/// a single compare-exchange publish, and every losing thread releases its
/// redundant record before proceeding with the winner's. [`Mutex::destroy`]
/// returns the handle to the unbound state, after which it may be bound
/// again.
///
/// The handle is `const`-constructible, so both POSIX declaration styles
/// work: a `static` handle bound lazily by whichever thread locks it first,
/// or a local handle bound explicitly.
///
/// # Example
///
/// ```
/// use bindlock::Mutex;
///
/// static LOCK: Mutex = Mutex::new();
///
/// // The first lock binds the handle; later locks reuse the bound record.
/// LOCK.lock().expect("lock");
/// LOCK.unlock().expect("unlock");
/// assert!(LOCK.is_bound());
/// ```
pub struct Mutex {
    /// Null while unbound; otherwise the published record. Written by the
    /// first-lock compare-exchange, or under `&mut self` by init/destroy.
    record: AtomicPtr<MutexRecord>,
    counters: BindCounters,
}

impl Mutex {
    /// Creates an unbound handle.
    ///
    /// Usable as a `static` initializer; the handle binds on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            record: AtomicPtr::new(ptr::null_mut()),
            counters: BindCounters::new(),
        }
    }

    /// Binds the handle to a fresh record.
    ///
    /// The handle is reset to unbound first, so initializing a still-bound
    /// handle leaks its previous record; destroy first when reusing a
    /// handle. The attribute argument is accepted for POSIX surface parity
    /// and its fields do not change locking behavior.
    ///
    /// # Errors
    ///
    /// [`AllocError`] if the record cannot be allocated; the handle is left
    /// unbound.
    pub fn init(&mut self, _attr: Option<&MutexAttr>) -> Result<(), AllocError> {
        *self.record.get_mut() = ptr::null_mut();
        let fresh = Box::into_raw(new_record()?);
        *self.counters.created.get_mut() += 1;
        *self.record.get_mut() = fresh;
        Ok(())
    }

    /// Acquires the lock, binding the handle first if it has never been
    /// bound.
    ///
    /// Blocks until the lock is acquired; there is no timeout. Binding is
    /// race-free: when several threads lock an unbound handle concurrently,
    /// exactly one allocated record is published and the others are released
    /// before their `lock` proceeds.
    ///
    /// Re-locking from the thread that already holds the lock deadlocks; the
    /// stored [`MutexKind`](crate::MutexKind) does not change this.
    ///
    /// # Errors
    ///
    /// [`AllocError`] if first-use binding cannot allocate the record; the
    /// handle stays unbound and the call may be retried.
    pub fn lock(&self) -> Result<(), AllocError> {
        let record = self.bind()?;
        // SAFETY: `record` was published by `bind` and stays allocated for
        // at least this borrow of the handle, because releasing it requires
        // `&mut self` or dropping the handle.
        unsafe { (*record).lock.acquire() };
        Ok(())
    }

    /// Attempts to acquire the lock without blocking, binding the handle
    /// first if it has never been bound.
    ///
    /// Either `lock` or `try_lock` alone initializes an unbound handle; a
    /// program that only ever calls `try_lock` still gets a bound, usable
    /// mutex.
    ///
    /// # Errors
    ///
    /// [`TryLockError::WouldBlock`] if the lock is currently held, and
    /// [`TryLockError::OutOfMemory`] if first-use binding cannot allocate
    /// the record.
    pub fn try_lock(&self) -> Result<(), TryLockError> {
        let record = self.bind()?;
        // SAFETY: as in `lock`.
        if unsafe { (*record).lock.try_acquire() } {
            Ok(())
        } else {
            Err(TryLockError::WouldBlock)
        }
    }

    /// Releases the lock.
    ///
    /// Must be called by the thread that holds the lock. Unlocking a lock
    /// that is not held, or held by another thread, is not detected and
    /// corrupts the exclusion contract for later lockers, matching the
    /// latitude POSIX gives its default mutex kind.
    ///
    /// # Errors
    ///
    /// [`UnlockError::Unbound`] if the handle has never been bound or was
    /// destroyed. This is a caller error, reported rather than ignored.
    pub fn unlock(&self) -> Result<(), UnlockError> {
        let record = self.record.load(Ordering::Acquire);
        if record.is_null() {
            return Err(UnlockError::Unbound);
        }
        // SAFETY: non-null means bound, and the record stays allocated for
        // this borrow of the handle (releasing it requires `&mut self`).
        unsafe { (*record).lock.release() };
        Ok(())
    }

    /// Acquires the lock and returns a guard that releases it when dropped.
    ///
    /// The guard borrows the handle, so the handle cannot be destroyed,
    /// reinitialized, or dropped while the guard exists.
    ///
    /// # Errors
    ///
    /// [`AllocError`] if first-use binding cannot allocate the record.
    pub fn lock_scoped(&self) -> Result<MutexGuard<'_>, AllocError> {
        let record = self.bind()?;
        // SAFETY: as in `lock`; the reborrow lives no longer than `self`,
        // and the record cannot be released while that borrow exists.
        let lock = unsafe { &(*record).lock };
        lock.acquire();
        Ok(MutexGuard {
            lock,
            _not_send: PhantomData,
        })
    }

    /// Releases the bound record, returning the handle to the unbound state.
    ///
    /// Idempotent: destroying an unbound handle is a no-op. Destroying a
    /// handle whose lock is still held is a caller error the implementation
    /// does not detect; the record is released regardless.
    pub fn destroy(&mut self) {
        let record = std::mem::replace(self.record.get_mut(), ptr::null_mut());
        if !record.is_null() {
            // SAFETY: the handle exclusively owns `record`, and `&mut self`
            // excludes any shared borrow that could still read it.
            drop(unsafe { Box::from_raw(record) });
            *self.counters.destroyed.get_mut() += 1;
        }
    }

    /// Returns true if the handle currently owns a lock record.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.record.load(Ordering::Acquire).is_null()
    }

    /// Takes a snapshot of the record-lifecycle counters.
    #[must_use]
    pub fn metrics(&self) -> BindMetrics {
        self.counters.snapshot()
    }

    /// Returns the bound record, binding the handle first if needed.
    ///
    /// The first-lock race resolves here: losers release their fresh record
    /// and continue with the record the failed compare-exchange observed,
    /// which is the winner's published value.
    fn bind(&self) -> Result<*mut MutexRecord, AllocError> {
        let current = self.record.load(Ordering::Acquire);
        if !current.is_null() {
            return Ok(current);
        }
        let fresh = Box::into_raw(new_record()?);
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        match self.record.compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(fresh),
            Err(published) => {
                // Lost the publish race. The fresh record never escaped this
                // thread, so it is still exclusively ours to release.
                // SAFETY: `fresh` came from Box::into_raw above and was not
                // published.
                drop(unsafe { Box::from_raw(fresh) });
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                Ok(published)
            }
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Releases a [`Mutex`] lock when dropped.
///
/// Returned by [`Mutex::lock_scoped`]. The guard borrows the handle, so the
/// handle cannot be destroyed or reinitialized while a guard exists. The
/// guard stays on the thread that acquired it; the native lock requires
/// release from the acquiring thread's context.
pub struct MutexGuard<'a> {
    lock: &'a OsLock,
    /// Keeps the guard off other threads; release must happen on the
    /// acquiring thread.
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for MutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexGuard").finish_non_exhaustive()
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

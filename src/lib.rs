//! POSIX-style mutexes with a race-free lazy binding protocol.
//!
//! The crate models the `pthread_mutex_t` lifecycle over the platform lock
//! primitive. A [`Mutex`] handle is a cheap, `const`-constructible value that
//! owns no OS resource until it is bound to one, either explicitly through
//! [`Mutex::init`] or lazily by the first [`Mutex::lock`] or
//! [`Mutex::try_lock`]. Lazy binding is safe under contention: each racing
//! thread builds a private record and tries to publish it with one
//! compare-exchange, and every loser releases its own record and continues
//! with the winner's, so exactly one record survives per handle.
//!
//! [`MutexAttr`] carries the POSIX attribute surface (kind, process sharing,
//! priority protocol, priority ceiling). Attributes are validated and stored
//! for API parity; they do not change how the underlying lock behaves.
//!
//! Lock and unlock are manual calls, with [`Mutex::unlock`] failing on a
//! handle that was never bound. [`Mutex::lock_scoped`] wraps the same lock
//! in a guard that releases on drop for callers who prefer RAII.
//!
//! # Example
//!
//! ```
//! use bindlock::{Mutex, MutexAttr, MutexKind};
//!
//! // Explicit POSIX-style binding with an attribute record.
//! let mut attr = MutexAttr::new();
//! attr.set_kind(MutexKind::Errorcheck);
//!
//! let mut m = Mutex::new();
//! m.init(Some(&attr)).expect("init");
//! m.lock().expect("lock");
//! m.unlock().expect("unlock");
//! m.destroy();
//!
//! // Lazy binding: a static handle binds on first lock.
//! static SHARED: Mutex = Mutex::new();
//! SHARED.lock().expect("lock");
//! SHARED.unlock().expect("unlock");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attr;
mod mutex;
mod raw;

#[cfg(test)]
pub(crate) mod test_utils;

pub use attr::{AttrError, MutexAttr, MutexKind, ProcessShared, Protocol};
pub use mutex::{AllocError, BindMetrics, Mutex, MutexGuard, TryLockError, UnlockError};

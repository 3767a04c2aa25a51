//! Mutex attribute records.
//!
//! POSIX-style configuration carried for API-surface compatibility: the
//! values are stored and returned faithfully but the lock algorithm never
//! consults them. Only process-private mutexes are supported; every other
//! field accepts all of its typed values unconditionally.

use std::fmt;

/// Error returned by fallible [`MutexAttr`] setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrError {
    /// Process-shared mutexes are not supported; only
    /// [`ProcessShared::Private`] is accepted.
    SharedUnsupported,
}

impl fmt::Display for AttrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedUnsupported => write!(f, "process-shared mutexes are not supported"),
        }
    }
}

impl std::error::Error for AttrError {}

/// Mutex behavior selector.
///
/// Stored for compatibility; locking does not vary by kind. In particular
/// [`Recursive`](MutexKind::Recursive) does not make re-locking by the owner
/// safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MutexKind {
    /// No usage checking; re-locking from the owning thread deadlocks.
    Normal = 0,
    /// POSIX recursive kind. Stored only, never honored by locking.
    Recursive = 1,
    /// POSIX error-checking kind. Stored only, never honored by locking.
    Errorcheck = 2,
}

impl MutexKind {
    /// The kind selected when none is chosen explicitly. POSIX defines the
    /// default kind as an alias of the normal kind.
    pub const DEFAULT: MutexKind = MutexKind::Normal;

    /// Converts a POSIX integer value; `None` if out of domain.
    #[must_use]
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Recursive),
            2 => Some(Self::Errorcheck),
            _ => None,
        }
    }

    /// The POSIX integer value.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Process visibility of a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ProcessShared {
    /// Visible only within the creating process. The only supported value.
    Private = 0,
    /// Shareable across process boundaries. Rejected by
    /// [`MutexAttr::set_process_shared`].
    Shared = 1,
}

impl ProcessShared {
    /// Converts a POSIX integer value; `None` if out of domain.
    #[must_use]
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Private),
            1 => Some(Self::Shared),
            _ => None,
        }
    }

    /// The POSIX integer value.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Priority protocol of a mutex. Stored for compatibility, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Protocol {
    /// Priority is unaffected by holding the mutex.
    None = 0,
    /// POSIX priority inheritance. Stored only, never enforced.
    Inherit = 1,
    /// POSIX priority ceiling. Stored only, never enforced.
    Protect = 2,
}

impl Protocol {
    /// Converts a POSIX integer value; `None` if out of domain.
    #[must_use]
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Inherit),
            2 => Some(Self::Protect),
            _ => None,
        }
    }

    /// The POSIX integer value.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// POSIX-style mutex attributes.
///
/// A plain value record: build one, adjust its fields, pass it to
/// [`Mutex::init`](crate::Mutex::init). The lock algorithm accepts and
/// ignores it; the record exists for source compatibility with
/// attribute-driven APIs, and callers must not expect the stored kind,
/// protocol, or priority ceiling to change locking behavior.
///
/// # Example
///
/// ```
/// use bindlock::{MutexAttr, MutexKind, ProcessShared};
///
/// let mut attr = MutexAttr::new();
/// attr.set_kind(MutexKind::Errorcheck);
/// assert_eq!(attr.kind(), MutexKind::Errorcheck);
/// assert_eq!(attr.process_shared(), ProcessShared::Private);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexAttr {
    kind: MutexKind,
    process_shared: ProcessShared,
    protocol: Protocol,
    priority_ceiling: i32,
}

impl MutexAttr {
    /// Creates an attribute record with the POSIX defaults: the default
    /// kind, process-private, no priority protocol, zero priority ceiling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kind: MutexKind::DEFAULT,
            process_shared: ProcessShared::Private,
            protocol: Protocol::None,
            priority_ceiling: 0,
        }
    }

    /// Returns the stored kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }

    /// Stores a kind. Unconditional; the value has no locking effect.
    pub fn set_kind(&mut self, kind: MutexKind) {
        self.kind = kind;
    }

    /// Returns the stored process visibility.
    ///
    /// Always [`ProcessShared::Private`], since no other value can be stored.
    #[inline]
    #[must_use]
    pub fn process_shared(&self) -> ProcessShared {
        self.process_shared
    }

    /// Stores a process visibility.
    ///
    /// # Errors
    ///
    /// [`AttrError::SharedUnsupported`] for [`ProcessShared::Shared`]; the
    /// record is left unchanged.
    pub fn set_process_shared(&mut self, value: ProcessShared) -> Result<(), AttrError> {
        if value != ProcessShared::Private {
            return Err(AttrError::SharedUnsupported);
        }
        self.process_shared = value;
        Ok(())
    }

    /// Returns the stored priority protocol.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Stores a priority protocol. Unconditional; the value is never
    /// enforced.
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    /// Returns the stored priority ceiling.
    #[inline]
    #[must_use]
    pub fn priority_ceiling(&self) -> i32 {
        self.priority_ceiling
    }

    /// Stores a priority ceiling. Any value is stored faithfully; none is
    /// validated or enforced.
    pub fn set_priority_ceiling(&mut self, ceiling: i32) {
        self.priority_ceiling = ceiling;
    }
}

impl Default for MutexAttr {
    fn default() -> Self {
        Self::new()
    }
}

//! Error kinds shared by every leaf component: the numeric kernels, the
//! test memory arena, the mutex wrapper, and the thread runtime.
//!
//! The kinds are deliberately coarse (mirroring what the components
//! actually distinguish on their error paths) rather than one variant
//! per call site.

use thiserror::Error;

/// Error produced by a kcore operation.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A constraint on a caller-supplied value failed: zero `nrdigits`,
    /// a zero divisor, a malformed decimal string, a corrupted arena
    /// block, or an out-of-range RT-signal index.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A magnitude or exponent would exceed the representable range.
    #[error("overflow: {0}")]
    Overflow(String),

    /// The active memory manager refused an allocation.
    #[error("out of memory")]
    OutOfMemory,

    /// A checked mutex detected the owning thread relocking itself.
    #[error("mutex would deadlock (recursive lock by owner)")]
    DeadLk,

    /// A checked mutex detected an unlock by a non-owner, a double
    /// unlock, or destruction while still held.
    #[error("operation not permitted on mutex: {0}")]
    Perm(&'static str),

    /// A checked mutex is still locked and cannot be destroyed.
    #[error("mutex busy")]
    Busy,

    /// A non-blocking operation found no work: an empty wait list, an
    /// empty RT-signal queue, or a fully busy thread pool.
    #[error("would block / no work available")]
    Again,

    /// The OS reported that a thread or resource no longer exists
    /// (`ESRCH`/`ENOENT`), typically a join on an already-reaped thread.
    #[error("resource does not exist")]
    NotExist,

    /// A raw OS-level failure that does not map onto one of the kinds
    /// above; the underlying `errno` is preserved via `io::Error`.
    #[error("os error: {0}")]
    Os(#[from] std::io::Error),
}

impl KernelError {
    /// Build an [`KernelError::InvalidInput`] from a `Display`-able reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        KernelError::InvalidInput(reason.into())
    }

    /// Build an [`KernelError::Overflow`] from a `Display`-able reason.
    pub fn overflow(reason: impl Into<String>) -> Self {
        KernelError::Overflow(reason.into())
    }

    /// Maps the last OS error (`errno`) onto a [`KernelError`], folding
    /// the handful of codes the runtime treats specially into their own
    /// variants and leaving everything else as [`KernelError::Os`].
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EAGAIN => KernelError::Again,
            libc::ENOENT | libc::ESRCH => KernelError::NotExist,
            libc::EDEADLK => KernelError::DeadLk,
            libc::EBUSY => KernelError::Busy,
            libc::EPERM => KernelError::Perm("operation not permitted"),
            _ => KernelError::Os(std::io::Error::from_raw_os_error(errno)),
        }
    }

    /// Captures `errno` from the current thread's `errno` slot.
    pub fn last_os_error() -> Self {
        Self::from_errno(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

/// Result alias used throughout kcore.
pub type Result<T> = std::result::Result<T, KernelError>;

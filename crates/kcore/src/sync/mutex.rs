//! An error-checking mutex wrapper over `libc::pthread_mutex_t`.
//!
//! The default flavor is the fast, no-check kind: a double lock by the
//! owning thread deadlocks at the OS level and unlocking a non-owner
//! is unspecified. [`Mutex::new_checked`] instead builds a
//! `PTHREAD_MUTEX_ERRORCHECK` mutex, which turns those programming
//! errors into [`KernelError::DeadLk`] / [`KernelError::Perm`].

use crate::error::{KernelError, Result};
use std::cell::UnsafeCell;

/// A mutex guarding `T`, in either fast (default) or error-checking
/// flavor.
pub struct Mutex<T> {
    raw: UnsafeCell<libc::pthread_mutex_t>,
    checked: bool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

/// RAII guard returned by [`Mutex::lock`]; unlocks on drop.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> Mutex<T> {
    /// Builds the default (fast, non-error-checking) flavor.
    pub fn new(value: T) -> Self {
        Self::build(value, libc::PTHREAD_MUTEX_NORMAL)
    }

    /// Builds the checked (`init_mutex`) flavor: double-lock by the
    /// owner fails with `DeadLk`, unlocking a non-owner or an already
    /// unlocked mutex fails with `Perm`.
    pub fn new_checked(value: T) -> Self {
        Self::build(value, libc::PTHREAD_MUTEX_ERRORCHECK)
    }

    fn build(value: T, kind: libc::c_int) -> Self {
        unsafe {
            let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            libc::pthread_mutexattr_init(&mut attr);
            libc::pthread_mutexattr_settype(&mut attr, kind);
            let mut raw: libc::pthread_mutex_t = std::mem::zeroed();
            libc::pthread_mutex_init(&mut raw, &attr);
            libc::pthread_mutexattr_destroy(&mut attr);
            Mutex { raw: UnsafeCell::new(raw), checked: kind == libc::PTHREAD_MUTEX_ERRORCHECK, data: UnsafeCell::new(value) }
        }
    }

    /// Locks the mutex, blocking the calling thread. On the checked
    /// flavor, a recursive lock by the current owner returns
    /// `DeadLk` instead of blocking forever.
    pub fn lock(&self) -> Result<MutexGuard<'_, T>> {
        let rc = unsafe { libc::pthread_mutex_lock(self.raw.get()) };
        if rc != 0 {
            let err = KernelError::from_errno(rc);
            log::warn!("pthread_mutex_lock failed: {err}");
            return Err(err);
        }
        Ok(MutexGuard { mutex: self })
    }

    /// Non-blocking lock attempt; returns `Busy` if already held.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, T>> {
        let rc = unsafe { libc::pthread_mutex_trylock(self.raw.get()) };
        if rc != 0 {
            let err = KernelError::from_errno(rc);
            log::debug!("pthread_mutex_trylock did not acquire: {err}");
            return Err(err);
        }
        Ok(MutexGuard { mutex: self })
    }

    /// `slock`: locks or aborts the process -- for call sites where a
    /// locking failure can only mean a programming bug, not a
    /// recoverable condition.
    pub fn slock(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| panic!("slock: mutex lock failed: {e}"))
    }

    fn unlock(&self) -> Result<()> {
        let rc = unsafe { libc::pthread_mutex_unlock(self.raw.get()) };
        if rc != 0 {
            let err = KernelError::from_errno(rc);
            log::error!("pthread_mutex_unlock failed: {err}");
            return Err(err);
        }
        Ok(())
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

impl<T> Drop for Mutex<T> {
    fn drop(&mut self) {
        // Checked flavor: destroying a still-locked mutex is `Busy`
        // at the OS level; there's nowhere to propagate that from a
        // destructor, so surface it loudly instead of leaking silently.
        let rc = unsafe { libc::pthread_mutex_destroy(self.raw.get()) };
        if rc != 0 && !std::thread::panicking() {
            let err = KernelError::from_errno(rc);
            log::error!("pthread_mutex_destroy failed: {err}");
            panic!("mutex destroyed while busy: {err}");
        }
    }
}

impl<'a, T> std::ops::Deref for MutexGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> std::ops::DerefMut for MutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        // `sunlock`: a failing unlock here means the lock/unlock
        // discipline is already broken, which is a programming bug.
        if let Err(e) = self.mutex.unlock() {
            if !std::thread::panicking() {
                panic!("sunlock: mutex unlock failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn guards_exclusive_access() {
        let m = Arc::new(Mutex::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = Arc::clone(&m);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *m.lock().unwrap() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*m.lock().unwrap(), 8000);
    }

    #[test]
    fn checked_mutex_detects_recursive_lock() {
        let m = Mutex::new_checked(());
        let _g1 = m.lock().unwrap();
        let err = m.lock();
        assert!(matches!(err, Err(KernelError::DeadLk)));
    }
}

//! Process-wide real-time signal registry: 16 reserved signals
//! (`RTMIN..RTMIN+15`), blocked in every thread, used as a queued
//! binary/counting event between threads.

use crate::error::{KernelError, Result};

/// Number of reserved real-time signal indices.
pub const COUNT: u32 = 16;

fn signal_number(index: u32) -> Result<libc::c_int> {
    if index >= COUNT {
        return Err(KernelError::invalid(format!("rt-signal index {index} out of range [0,{COUNT})")));
    }
    let rtmin = unsafe { libc::__libc_current_sigrtmin() };
    Ok(rtmin + index as libc::c_int)
}

/// Blocks `SIGINT` and all 16 reserved real-time signals in the
/// calling thread's mask. Every thread created afterwards by the
/// thread runtime inherits this mask, so the signals always arrive as
/// queued process-pending events, never as a default-disposition kill.
pub fn block_in_current_thread() -> Result<()> {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        let rtmin = libc::__libc_current_sigrtmin();
        for i in 0..COUNT as libc::c_int {
            libc::sigaddset(&mut set, rtmin + i);
        }
        let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
        if rc != 0 {
            return Err(KernelError::from_errno(rc));
        }
    }
    Ok(())
}

/// A handle onto the process-wide RT-signal facility. Stateless beyond
/// the signal mask installed by [`block_in_current_thread`]; all real
/// state lives in the kernel's per-process pending-signal queue.
pub struct RtSignals;

impl RtSignals {
    /// Enqueues one instance of signal `RTMIN+index` to this process.
    /// Returns `Again` if the kernel's signal queue is full.
    pub fn send(index: u32) -> Result<()> {
        let sig = signal_number(index)?;
        let value = libc::sigval { sival_ptr: std::ptr::null_mut() };
        let rc = unsafe { libc::sigqueue(libc::getpid(), sig, value) };
        if rc != 0 {
            let err = KernelError::last_os_error();
            log::warn!("sigqueue failed sending rt-signal {index}: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Consumes exactly `n` instances of signal `RTMIN+index`,
    /// blocking until each arrives and retrying transparently on
    /// `EINTR`.
    pub fn wait(index: u32, n: u32) -> Result<()> {
        let sig = signal_number(index)?;
        let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, sig);
        }
        for _ in 0..n {
            loop {
                let rc = unsafe { libc::sigwaitinfo(&set, std::ptr::null_mut()) };
                if rc == sig {
                    break;
                }
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                let err = KernelError::last_os_error();
                log::error!("sigwaitinfo failed waiting for rt-signal {index}: {err}");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Consumes one instance of signal `RTMIN+index` without blocking;
    /// `Again` if none is pending.
    pub fn trywait(index: u32) -> Result<()> {
        let sig = signal_number(index)?;
        let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, sig);
        }
        let timeout = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        let rc = unsafe { libc::sigtimedwait(&set, std::ptr::null_mut(), &timeout) };
        if rc == sig {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EAGAIN) {
            return Err(KernelError::Again);
        }
        let err = KernelError::last_os_error();
        log::error!("sigtimedwait failed polling rt-signal {index}: {err}");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_index() {
        assert!(matches!(RtSignals::send(COUNT), Err(KernelError::InvalidInput(_))));
    }

    #[test]
    fn send_then_trywait_consumes_one_instance() {
        block_in_current_thread().unwrap();
        RtSignals::send(0).unwrap();
        RtSignals::trywait(0).unwrap();
        assert!(matches!(RtSignals::trywait(0), Err(KernelError::Again)));
    }
}

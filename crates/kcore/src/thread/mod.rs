//! A runtime thread: an OS thread plus the per-thread state (`lock`,
//! wake handshake, command slot) the wait list and thread pool need to
//! suspend and resume it.
//!
//! The guard-paged five-part stack frame the original design builds
//! by hand (`guard | signal stack | guard | thread stack | guard`) is
//! not reproduced here -- see `DESIGN.md` for why. What is kept with
//! full fidelity is the choreography the frame exists to support:
//! suspend/resume over a dedicated signal, and transactional
//! all-or-nothing group startup.

pub mod pool;

use crate::error::{KernelError, Result};
use crate::sync::{rtsignal, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, OnceLock};

/// A unit of work handed to a worker thread by the thread pool.
pub type Task = Box<dyn FnOnce() + Send>;

/// Per-thread control block. `pthread` is filled in by the thread
/// itself immediately on start, before it can possibly be enqueued on
/// a wait list (and therefore before any other thread could try to
/// `resume` it), so reading it after that point never races.
pub struct Thread {
    pthread: OnceLock<libc::pthread_t>,
    /// Mirrors `wlist_next == 0`: set by `trywakeup`/`free` to mark
    /// that a wake was delivered specifically to this waiter, cleared
    /// by the waiter once it observes it.
    pub(crate) woken: Mutex<bool>,
    /// The command a wait-list wake hands to the waiter (a thread pool
    /// task, or `None` for a shutdown wake).
    pub(crate) command: Mutex<Option<Task>>,
}

impl Thread {
    fn new() -> Self {
        Thread { pthread: OnceLock::new(), woken: Mutex::new(false), command: Mutex::new(None) }
    }

    fn mark_started(&self) {
        let _ = self.pthread.set(unsafe { libc::pthread_self() });
    }

    /// Blocks the calling thread until `resume` is called for it.
    /// Retries transparently on `EINTR`, since `SIGINT` being blocked
    /// process-wide means a resume sent early is queued by the kernel,
    /// not lost.
    pub fn suspend(&self) -> Result<()> {
        let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, libc::SIGINT);
        }
        loop {
            let rc = unsafe { libc::sigwaitinfo(&set, std::ptr::null_mut()) };
            if rc == libc::SIGINT {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                let err = KernelError::last_os_error();
                log::error!("sigwaitinfo failed while suspended: {err}");
                return Err(err);
            }
        }
    }

    /// Sends this thread its suspend-breaking signal.
    pub fn resume(&self) -> Result<()> {
        let pthread = *self.pthread.get().ok_or_else(|| KernelError::invalid("resume of a thread that has not started"))?;
        let rc = unsafe { libc::pthread_kill(pthread, libc::SIGINT) };
        if rc != 0 {
            let err = KernelError::from_errno(rc);
            log::warn!("pthread_kill failed resuming thread: {err}");
            return Err(err);
        }
        Ok(())
    }
}

/// Stands in for the two counting semaphores (`isvalid_abort`,
/// `isfreeable`) the original design coordinates group startup with:
/// every member blocks in `wait` until either all `total` members have
/// arrived, or `abort` is raised by the creator because a sibling
/// failed to spawn.
struct StartupGate {
    total: usize,
    arrived: AtomicUsize,
    abort: AtomicBool,
    lock: std::sync::Mutex<()>,
    cv: Condvar,
}

impl StartupGate {
    fn new(total: usize) -> Self {
        StartupGate { total, arrived: AtomicUsize::new(0), abort: AtomicBool::new(false), lock: std::sync::Mutex::new(()), cv: Condvar::new() }
    }

    fn wait(&self) -> bool {
        let mut guard = self.lock.lock().unwrap();
        self.arrived.fetch_add(1, Ordering::AcqRel);
        self.cv.notify_all();
        loop {
            if self.abort.load(Ordering::Acquire) {
                return false;
            }
            if self.arrived.load(Ordering::Acquire) >= self.total {
                return true;
            }
            guard = self.cv.wait(guard).unwrap();
        }
    }

    fn abort(&self) {
        let _guard = self.lock.lock().unwrap();
        self.abort.store(true, Ordering::Release);
        self.cv.notify_all();
    }
}

/// A set of threads created together with all-or-nothing startup: if
/// any member thread fails to spawn, every thread that did start is
/// told to abort before running its task, and `new` reports the
/// failure rather than leaving a partially-started group.
pub struct Group {
    handles: Vec<std::thread::JoinHandle<()>>,
    members: Vec<std::sync::Arc<Thread>>,
}

impl Group {
    /// Spawns `count` threads, each running `task(member_index)`.
    /// `task` is cloned once per member (it typically just closes over
    /// shared state) so every member can run the same worker loop.
    pub fn new<F>(count: usize, task: F) -> Result<Self>
    where
        F: Fn(std::sync::Arc<Thread>, usize) + Send + Sync + 'static,
    {
        let task = std::sync::Arc::new(task);
        // Sized for the full `count`: members that do start block here
        // until every sibling either arrives too or the creator raises
        // `abort` after a spawn failure, which unblocks all of them
        // regardless of how many actually arrived.
        let gate = std::sync::Arc::new(StartupGate::new(count));

        let mut members = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        let mut spawn_error = None;

        for index in 0..count {
            let member = std::sync::Arc::new(Thread::new());
            let member_for_thread = std::sync::Arc::clone(&member);
            let task = std::sync::Arc::clone(&task);
            let gate = std::sync::Arc::clone(&gate);

            let spawned = std::thread::Builder::new().spawn(move || {
                member_for_thread.mark_started();
                rtsignal::block_in_current_thread().expect("failed to block runtime signals in worker thread");
                if !gate.wait() {
                    return;
                }
                task(member_for_thread.clone(), index);
            });

            match spawned {
                Ok(handle) => {
                    members.push(member);
                    handles.push(handle);
                }
                Err(e) => {
                    log::error!("failed to spawn worker thread {index}/{count}: {e}");
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = spawn_error {
            gate.abort();
            for handle in handles {
                let _ = handle.join();
            }
            return Err(KernelError::Os(e));
        }

        Ok(Group { handles, members })
    }

    pub fn members(&self) -> &[std::sync::Arc<Thread>] {
        &self.members
    }

    /// Joins every member of the group.
    pub fn join(self) -> Result<()> {
        for handle in self.handles {
            handle.join().map_err(|_| KernelError::invalid("worker thread panicked"))?;
        }
        Ok(())
    }
}

//! FIFO list of threads suspended on a condition.
//!
//! The original design threads a ring through each waiter's
//! `wlist_next` field to avoid a separate allocation per wait; this
//! version uses a `VecDeque` of `Arc<Thread>` instead, which is the
//! idiomatic Rust way to express the same FIFO without hand-rolled
//! intrusive linking. The handshake invariant -- a waiter can tell a
//! generic OS-signal wakeup apart from one `trywakeup` sent it
//! specifically -- is kept exactly, via [`Thread::woken`].

use crate::error::{KernelError, Result};
use crate::sync::Mutex as CheckedMutex;
use crate::thread::{Task, Thread};
use std::collections::VecDeque;
use std::sync::Arc;

/// A FIFO list of threads suspended on some condition, with a per-list
/// mutex guarding the queue.
pub struct WaitList {
    queue: CheckedMutex<VecDeque<Arc<Thread>>>,
}

impl WaitList {
    pub fn new() -> Self {
        WaitList { queue: CheckedMutex::new(VecDeque::new()) }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suspends the calling thread (`self`) until a matching
    /// `trywakeup` or `free` delivers a wake specifically to it. A
    /// suspend that returns without the handshake flag set is
    /// spurious (some unrelated signal broke the `sigwaitinfo`) and is
    /// retried transparently.
    pub fn wait(&self, me: &Arc<Thread>) -> Result<Option<Task>> {
        {
            let mut q = self.queue.lock()?;
            q.push_back(Arc::clone(me));
        }
        loop {
            me.suspend()?;
            let mut woken = me.woken.lock()?;
            if *woken {
                *woken = false;
                drop(woken);
                return Ok(me.command.lock()?.take());
            }
        }
    }

    /// Wakes the head of the FIFO, handing it `cmd`. Returns `Again`
    /// if the list is empty.
    pub fn trywakeup(&self, cmd: Option<Task>) -> Result<()> {
        let waiter = {
            let mut q = self.queue.lock()?;
            q.pop_front().ok_or(KernelError::Again)?
        };
        *waiter.command.lock()? = cmd;
        *waiter.woken.lock()? = true;
        waiter.resume()
    }

    /// Wakes every waiter currently queued with `cmd = None`.
    pub fn free(&self) -> Result<()> {
        loop {
            match self.trywakeup(None) {
                Ok(()) => continue,
                Err(KernelError::Again) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

//! A fixed-size worker pool built on [`crate::sync::WaitList`]: workers
//! block on the list, `tryruntask` wakes one and hands it a task.

use super::{Group, Task};
use crate::error::{KernelError, Result};
use crate::sync::WaitList;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct ThreadPool {
    list: Arc<WaitList>,
    size: Arc<AtomicUsize>,
    group: Option<Group>,
}

impl ThreadPool {
    /// Starts `count` worker threads, each looping: wait for a task,
    /// run it, repeat; a `None` task (sent by `free`) ends the loop.
    pub fn new(count: usize) -> Result<Self> {
        let list = Arc::new(WaitList::new());
        let size = Arc::new(AtomicUsize::new(count));

        let list_for_workers = Arc::clone(&list);
        let size_for_workers = Arc::clone(&size);
        let group = Group::new(count, move |thread, _index| loop {
            match list_for_workers.wait(&thread) {
                Ok(Some(task)) => task(),
                Ok(None) => {
                    size_for_workers.fetch_sub(1, Ordering::AcqRel);
                    break;
                }
                Err(_) => {
                    size_for_workers.fetch_sub(1, Ordering::AcqRel);
                    break;
                }
            }
        })?;

        Ok(ThreadPool { list, size, group: Some(group) })
    }

    /// Wakes one idle worker and hands it `task`; `Again` if every
    /// worker is currently busy (the wait list is empty).
    pub fn tryruntask(&self, task: Task) -> Result<()> {
        self.list.trywakeup(Some(task))
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Repeatedly wakes a worker with a shutdown (`None`) task until
    /// every worker has exited, then joins and tears the group down.
    pub fn free(mut self) -> Result<()> {
        while self.size.load(Ordering::Acquire) > 0 {
            match self.list.trywakeup(None) {
                Ok(()) => {}
                Err(KernelError::Again) => std::thread::yield_now(),
                Err(e) => return Err(e),
            }
        }
        if let Some(group) = self.group.take() {
            group.join()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn runs_tasks_across_workers() {
        let pool = ThreadPool::new(4).unwrap();
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..20 {
            loop {
                let c = Arc::clone(&counter);
                match pool.tryruntask(Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })) {
                    Ok(()) => break,
                    Err(KernelError::Again) => std::thread::yield_now(),
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }
        // Give the last few tasks a moment to finish before shutdown.
        std::thread::sleep(std::time::Duration::from_millis(50));
        pool.free().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}

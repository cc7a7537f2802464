//! Bounded worker pool for chore execution
//!
//! A fixed set of worker threads drains a FIFO queue. Each accepted chore is
//! submitted as one task; tasks never block each other beyond queueing, and a
//! panicking task is isolated to its own execution. `drain()` blocks until
//! the pool is idle, which is how tests wait for chore completion without
//! polling.

use annostore_core::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

type Task = Box<dyn FnOnce() + Send>;

struct PoolInner {
    queue: Mutex<VecDeque<Task>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
}

/// Fixed-size FIFO worker pool
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `num_threads` workers draining a queue bounded at `max_queue_depth`
    pub fn new(num_threads: usize, max_queue_depth: usize) -> Self {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let inner = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("annostore-chore-{i}"))
                .spawn(move || worker_loop(&inner))
                .expect("failed to spawn chore worker thread");
            workers.push(handle);
        }

        WorkerPool {
            inner,
            workers: Mutex::new(workers),
        }
    }

    /// Queue one task; `Err(Backpressure)` when full or shut down
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::Backpressure);
        }
        if self.inner.queue_depth.load(Ordering::Acquire) >= self.inner.max_queue_depth {
            return Err(Error::Backpressure);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until every queued and in-flight task has completed
    ///
    /// Workers keep running afterwards; this does not signal shutdown.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(Ordering::Acquire) > 0
            || self.inner.active_tasks.load(Ordering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Signal workers to exit after draining the queue, and join them
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Hold the queue lock while notifying: a worker between its shutdown
        // check and its wait holds this lock, so either it is already waiting
        // (and gets the notify) or it re-checks shutdown.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Decrements `active_tasks` and wakes drain waiters on drop, so bookkeeping
/// survives a panicking task.
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        let previously_active = self.inner.active_tasks.fetch_sub(1, Ordering::Release);
        if previously_active == 1 && self.inner.queue_depth.load(Ordering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break task;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };
        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
            error!("chore task panicked");
        }
    }
}

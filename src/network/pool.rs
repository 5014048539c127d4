//! Worker Pool
//!
//! Fixed set of threads pulling jobs off a crossbeam channel. Jobs submitted
//! while every worker is busy wait in the channel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{Result, VaultError};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    /// Job queue; `None` once the pool is closed
    sender: Option<Sender<Job>>,

    workers: Vec<JoinHandle<()>>,

    /// One message per worker that has left its loop
    exited: Receiver<usize>,
    exited_count: usize,

    /// Set to make workers discard jobs still in the queue
    cancelled: Arc<AtomicBool>,

    size: usize,
}

impl WorkerPool {
    /// Spawn `size` named worker threads
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(VaultError::Config("worker pool needs at least one thread".into()));
        }

        let (sender, jobs) = channel::unbounded::<Job>();
        let (exit_tx, exited) = channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let jobs = jobs.clone();
            let exit_tx = exit_tx.clone();
            let cancelled = Arc::clone(&cancelled);

            let handle = thread::Builder::new()
                .name(format!("filevault-worker-{}", index))
                .spawn(move || {
                    worker_loop(index, jobs, &cancelled);
                    let _ = exit_tx.send(index);
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
            exited,
            exited_count: 0,
            cancelled,
            size,
        })
    }

    /// Queue a job; fails once the pool is closed
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| VaultError::Network("worker pool is closed".into()))?;

        sender
            .send(Box::new(job))
            .map_err(|_| VaultError::Network("worker pool has no live workers".into()))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting for a worker
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Stop taking jobs; queued jobs still run
    pub fn close(&mut self) {
        self.sender.take();
    }

    /// Make workers drop queued jobs instead of running them
    pub fn cancel_pending(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait until every worker has exited or `timeout` passes
    ///
    /// Only meaningful after `close`. Returns true if all workers finished
    /// (their threads are joined).
    pub fn await_termination(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while self.exited_count < self.size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exited.recv_timeout(remaining) {
                Ok(index) => {
                    tracing::trace!("Worker {} exited", index);
                    self.exited_count += 1;
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked outside a job");
            }
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit on their own once the queue drains.
        self.close();
    }
}

fn worker_loop(index: usize, jobs: Receiver<Job>, cancelled: &AtomicBool) {
    for job in jobs.iter() {
        if cancelled.load(Ordering::SeqCst) {
            // Dropping the job drops the connection it owns.
            drop(job);
            continue;
        }

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Worker {} recovered from a panicking job", index);
        }
    }
}

//! Bounded pool of OS worker threads
//!
//! Jobs are `FnOnce` thunks executed on some pool thread. `wait` blocks
//! until every posted job has returned, which is how the broker drains its
//! consumer loops on stop. The pool itself is torn down on drop: workers are
//! signalled to shut down and joined.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    jobs: VecDeque<Job>,
    /// Jobs posted but not yet returned (queued or running).
    unfinished: usize,
    shutdown: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    job_ready: Condvar,
    all_done: Condvar,
}

/// Fixed-size pool of named worker threads.
///
/// A job that panics is caught and logged; the worker thread survives and
/// keeps serving jobs.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool with the given number of threads (at least one).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                unfinished: 0,
                shutdown: false,
            }),
            job_ready: Condvar::new(),
            all_done: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("qmux-worker-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Dispatch a job to run on some pool thread.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            state.jobs.push_back(Box::new(job));
            state.unfinished += 1;
        }
        self.shared.job_ready.notify_one();
    }

    /// Block until every posted job has returned.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while state.unfinished > 0 {
            self.shared.all_done.wait(&mut state);
        }
    }

    /// Number of worker threads in the pool.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
        }
        self.shared.job_ready.notify_all();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("worker thread terminated abnormally during shutdown");
            }
        }
    }
}

fn worker_loop(shared: &PoolShared) {
    log::trace!("worker thread started");

    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                if state.shutdown {
                    log::trace!("worker thread shutting down");
                    return;
                }
                shared.job_ready.wait(&mut state);
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("worker pool job panicked; the worker thread continues");
        }

        let mut state = shared.state.lock();
        state.unfinished -= 1;
        if state.unfinished == 0 {
            drop(state);
            shared.all_done.notify_all();
        }
    }
}

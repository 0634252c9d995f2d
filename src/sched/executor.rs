//! Single-threaded cooperative executor
//!
//! Tasks are polled in rotation. A task runs until it suspends (returns
//! `Pending` after registering its waker) or completes; the executor then
//! moves on to the next ready task. When no task is ready the thread parks
//! on a condvar-backed signal until some waker fires, so an idle worker
//! burns no CPU.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::{Condvar, Mutex};

/// Unpark signal shared by every task waker of one executor.
struct Signal {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn notify(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.condvar.notify_one();
    }

    fn wait(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.condvar.wait(&mut pending);
        }
        *pending = false;
    }
}

/// Per-task waker: marks the task ready and unparks the executor thread.
///
/// The ready flag is set before the signal fires, and the executor re-checks
/// the flags after consuming the signal, so a wake between the scan and the
/// park is never lost.
struct TaskWaker {
    ready: AtomicBool,
    signal: Arc<Signal>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.ready.store(true, Ordering::Release);
        self.signal.notify();
    }
}

struct Task {
    future: Pin<Box<dyn Future<Output = ()>>>,
    waker: Arc<TaskWaker>,
    completed: bool,
}

/// Cooperative scheduler for one OS thread.
///
/// Futures spawned here never leave the thread, so they need not be `Send`.
/// [`LocalExecutor::run`] drives every spawned task to completion; tasks
/// interleave only at `.await` points.
///
/// # Example
///
/// ```
/// use qmux::sched::{yield_now, LocalExecutor};
///
/// let mut executor = LocalExecutor::new();
/// executor.spawn(async {
///     yield_now().await;
/// });
/// executor.run();
/// ```
pub struct LocalExecutor {
    tasks: Vec<Task>,
    signal: Arc<Signal>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            signal: Arc::new(Signal::new()),
        }
    }

    /// Add a task. It starts ready and is first polled by [`LocalExecutor::run`].
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let waker = Arc::new(TaskWaker {
            ready: AtomicBool::new(true),
            signal: Arc::clone(&self.signal),
        });

        self.tasks.push(Task {
            future: Box::pin(future),
            waker,
            completed: false,
        });
    }

    /// Poll tasks in rotation until every spawned task has completed.
    ///
    /// Parks the calling thread while no task is ready; any waker fired by
    /// another thread unparks it.
    pub fn run(&mut self) {
        loop {
            let mut remaining = 0;
            let mut polled = false;

            for task in &mut self.tasks {
                if task.completed {
                    continue;
                }

                if task.waker.ready.swap(false, Ordering::AcqRel) {
                    polled = true;

                    let waker = Waker::from(Arc::clone(&task.waker));
                    let mut cx = Context::from_waker(&waker);

                    if task.future.as_mut().poll(&mut cx).is_ready() {
                        task.completed = true;
                        continue;
                    }
                }

                remaining += 1;
            }

            if remaining == 0 {
                break;
            }

            if !polled {
                self.signal.wait();
            }
        }

        self.tasks.clear();
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Future that suspends exactly once, then completes.
///
/// Awaiting it at the top of a loop iteration hands the worker thread to
/// the other tasks on the same executor before this task continues.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

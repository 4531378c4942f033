//! Worker pool
//!
//! A fixed-size pool of worker threads sharing one task queue. A task is a
//! [`Runner`]: a cancellable unit of work that checks its [`StopToken`] at
//! safe points. Workers call a backend-overridable [`WorkerHooks`] pair on
//! start and shutdown, which lets a backend pin per-thread state (engine
//! handles, scratch arenas) to the workers that will evaluate its queries.
//!
//! Submission is non-blocking. Dropping the pool drains the queue, then
//! joins every worker. Cancellation is cooperative and best-effort:
//! `TaskHandle::stop` raises the flag, the runner exits at its next check.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// A cooperative cancellation flag shared between a task and its handle.
#[derive(Debug, Default)]
pub struct StopToken {
    flag: AtomicBool,
}

impl StopToken {
    pub fn new() -> Self {
        StopToken::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// A cancellable unit of work.
///
/// `run` is invoked on a worker thread exactly once. Implementations must
/// poll `stop` at safe points and return early when it is raised.
pub trait Runner: Send + Sync + 'static {
    fn run(&self, stop: &StopToken);
}

/// Per-worker lifecycle hooks.
pub trait WorkerHooks: Send + Sync + 'static {
    /// Invoked on the worker thread before it takes its first task.
    fn initialize_worker(&self) {}

    /// Invoked on the worker thread right before it exits.
    fn finalize_worker(&self) {}
}

struct DefaultHooks;

impl WorkerHooks for DefaultHooks {}

#[derive(Debug)]
struct TaskState {
    done: Mutex<bool>,
    finished: Condvar,
}

/// A handle on a submitted task: request cancellation, poll or await
/// completion.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    stop: Arc<StopToken>,
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// Request the task to stop at its next safe point.
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn stop_token(&self) -> &Arc<StopToken> {
        &self.stop
    }

    pub fn is_finished(&self) -> bool {
        *self.state.done.lock().expect("task state lock poisoned")
    }

    /// Block until the task has run (or been skipped after cancellation).
    pub fn join(&self) {
        let mut done = self.state.done.lock().expect("task state lock poisoned");
        while !*done {
            done = self
                .state
                .finished
                .wait(done)
                .expect("task state lock poisoned");
        }
    }
}

struct Task {
    runner: Arc<dyn Runner>,
    stop: Arc<StopToken>,
    state: Arc<TaskState>,
}

struct PoolShared {
    queue: Mutex<VecDeque<Task>>,
    available: Condvar,
    shutdown: AtomicBool,
}

/// A fixed-size worker pool with cooperative task scheduling.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// A pool with `workers` threads; `0` selects the available hardware
    /// parallelism.
    pub fn new(workers: usize) -> Self {
        ThreadPool::with_hooks(workers, Arc::new(DefaultHooks))
    }

    /// A pool whose workers run the given lifecycle hooks.
    pub fn with_hooks(workers: usize, hooks: Arc<dyn WorkerHooks>) -> Self {
        let workers = if workers == 0 { num_cpus() } else { workers };
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let handles = (0..workers)
            .map(|index| {
                let shared = Arc::clone(&shared);
                let hooks = Arc::clone(&hooks);
                thread::Builder::new()
                    .name(format!("mkb-worker-{}", index))
                    .spawn(move || worker_loop(&shared, &hooks))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        ThreadPool { shared, workers: handles }
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Submit a runner for execution. Non-blocking.
    pub fn submit(&self, runner: Arc<dyn Runner>) -> TaskHandle {
        self.submit_with(runner, Arc::new(StopToken::new()))
    }

    /// Submit a runner whose stop token the caller already tracks
    /// elsewhere (e.g. in an active-query runner set).
    pub fn submit_with(&self, runner: Arc<dyn Runner>, stop: Arc<StopToken>) -> TaskHandle {
        let state = Arc::new(TaskState { done: Mutex::new(false), finished: Condvar::new() });
        let handle = TaskHandle { stop: Arc::clone(&stop), state: Arc::clone(&state) };
        {
            let mut queue = self.shared.queue.lock().expect("pool queue lock poisoned");
            queue.push_back(Task { runner, stop, state });
        }
        self.shared.available.notify_one();
        handle
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool").field("workers", &self.workers.len()).finish()
    }
}

fn worker_loop(shared: &PoolShared, hooks: &Arc<dyn WorkerHooks>) {
    hooks.initialize_worker();
    debug!("worker started");
    loop {
        let task = {
            let mut queue = shared.queue.lock().expect("pool queue lock poisoned");
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .expect("pool queue lock poisoned");
            }
        };
        let Some(task) = task else { break };

        // Cancellation is the runner's business; run is always invoked so
        // completion bookkeeping cannot be skipped.
        task.runner.run(&task.stop);

        let mut done = task.state.done.lock().expect("task state lock poisoned");
        *done = true;
        task.state.finished.notify_all();
    }
    hooks.finalize_worker();
    debug!("worker stopped");
}

fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

//! Dependency tracking on top of a rayon thread pool.
//!
//! A task is handed to the pool only once every completion it waits on has
//! fired, so workers never block on dependencies. Completions keep the list of
//! tasks waiting on them and release those tasks when they fire.
//!
//! A task fails when its work returns an error or panics. Tasks depending on a
//! failed completion do not run; they fail with the same reason.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

type Work = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

/// Completion state of one task, shared with every task waiting on it.
pub(crate) struct Completion {
    state: Mutex<CompletionState>,
    fired: Condvar,
}

struct CompletionState {
    done: bool,
    failure: Option<String>,
    dependents: Vec<Arc<Task>>,
}

impl Completion {
    fn new() -> Self {
        Self {
            state: Mutex::new(CompletionState {
                done: false,
                failure: None,
                dependents: Vec::new(),
            }),
            fired: Condvar::new(),
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state.lock().done
    }

    /// Blocks until the task finished, returning why it failed if it did.
    pub(crate) fn wait(&self) -> Result<(), String> {
        let mut state = self.state.lock();
        while !state.done {
            self.fired.wait(&mut state);
        }
        match &state.failure {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    /// Registers `task` to be released when this completion fires.
    ///
    /// Returns `false` if it already fired; a failure is passed on to `task`
    /// either way.
    fn add_dependent(&self, task: &Arc<Task>) -> bool {
        let mut state = self.state.lock();
        if state.done {
            if let Some(reason) = &state.failure {
                task.inherit(reason);
            }
            return false;
        }
        state.dependents.push(Arc::clone(task));
        true
    }

    fn fire(&self, failure: Option<String>) -> Vec<Arc<Task>> {
        let mut state = self.state.lock();
        state.done = true;
        state.failure = failure;
        let dependents = core::mem::take(&mut state.dependents);
        self.fired.notify_all();
        dependents
    }
}

struct Task {
    pool: Arc<Shared>,
    work: Mutex<Option<Work>>,
    /// Unfired dependencies, plus one held by the submitter until it is
    /// done registering.
    pending: AtomicUsize,
    /// First failure among the dependencies.
    inherited: Mutex<Option<String>>,
    completion: Arc<Completion>,
}

struct Shared {
    threads: rayon::ThreadPool,
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl Task {
    fn inherit(&self, reason: &str) {
        self.inherited
            .lock()
            .get_or_insert_with(|| reason.to_string());
    }

    /// Drops one pending dependency, handing the task to the pool when none
    /// remain.
    fn release(self: Arc<Self>) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let pool = Arc::clone(&self.pool);
            pool.threads.spawn(move || self.run());
        }
    }

    fn run(self: Arc<Self>) {
        let mut finish = Finish {
            task: &self,
            outcome: None,
        };

        let inherited = self.inherited.lock().take();
        let outcome = match inherited {
            Some(reason) => Err(alloc::format!("dependency failed: {reason}")),
            None => {
                let work = self.work.lock().take();
                work.map_or(Ok(()), |work| work())
            }
        };
        finish.outcome = Some(outcome);
    }

    fn finish(&self, outcome: Result<(), String>) {
        let failure = outcome.err();
        if let Some(reason) = &failure {
            log::error!("host task failed: {reason}");
        }

        for dependent in self.completion.fire(failure.clone()) {
            if let Some(reason) = &failure {
                dependent.inherit(reason);
            }
            dependent.release();
        }

        let mut in_flight = self.pool.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.pool.idle.notify_all();
        }
    }
}

/// Fires the task's completion when dropped, also while unwinding from a
/// panicking kernel.
struct Finish<'a> {
    task: &'a Task,
    outcome: Option<Result<(), String>>,
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("kernel panicked".to_string()));
        self.task.finish(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Fixed-size pool running submitted work in dependency order.
pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub(crate) fn new(threads: usize, name: &str) -> Result<Self, rayon::ThreadPoolBuildError> {
        let name = name.to_string();
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |index| alloc::format!("{name}-{index}"))
            .panic_handler(|payload| {
                log::error!("host kernel panicked: {}", panic_message(payload.as_ref()));
            })
            .build()?;

        Ok(Self {
            shared: Arc::new(Shared {
                threads,
                in_flight: Mutex::new(0),
                idle: Condvar::new(),
            }),
        })
    }

    pub(crate) fn threads(&self) -> usize {
        self.shared.threads.current_num_threads()
    }

    /// Schedules `work` to run once every completion in `wait` has fired.
    pub(crate) fn spawn<F>(&self, work: F, wait: &[Arc<Completion>]) -> Arc<Completion>
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let task = Arc::new(Task {
            pool: Arc::clone(&self.shared),
            work: Mutex::new(Some(Box::new(work))),
            pending: AtomicUsize::new(wait.len() + 1),
            inherited: Mutex::new(None),
            completion: Arc::clone(&completion),
        });

        *self.shared.in_flight.lock() += 1;

        for dependency in wait {
            if !dependency.add_dependent(&task) {
                Arc::clone(&task).release();
            }
        }
        task.release();

        completion
    }

    /// Blocks until no task is waiting or running.
    pub(crate) fn wait_idle(&self) {
        let mut in_flight = self.shared.in_flight.lock();
        while *in_flight > 0 {
            self.shared.idle.wait(&mut in_flight);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.wait_idle();
    }
}

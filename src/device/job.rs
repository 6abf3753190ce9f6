//! Asynchronous submission handles.

use alloc::sync::Arc;
use core::fmt;

use crate::backend::{BackendJob, ComputeBackend};
use crate::error::ArrayResult;
use crate::kernel::KernelId;

/// Handle to one submission.
///
/// Cloning is cheap and shares the underlying backend job. A job stays alive
/// while any array or caller holds it; dependents only hold its signal, so
/// dropping every `Job` never affects submissions that already waited on it.
pub struct Job<B: ComputeBackend> {
    inner: Arc<JobInner<B>>,
}

struct JobInner<B: ComputeBackend> {
    id: u64,
    kernel: KernelId,
    handle: B::Job,
}

impl<B: ComputeBackend> Job<B> {
    pub(crate) fn new(id: u64, kernel: KernelId, handle: B::Job) -> Self {
        Self {
            inner: Arc::new(JobInner { id, kernel, handle }),
        }
    }

    /// Submission sequence number on its device.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Kernel this job runs.
    pub fn kernel(&self) -> KernelId {
        self.inner.kernel
    }

    /// Completion signal for use as a wait dependency.
    pub fn signal(&self) -> B::Signal {
        self.inner.handle.signal()
    }

    /// Blocks until the job has executed.
    ///
    /// Fails if the job, or a job it waited on, failed on the device. The
    /// failure is reported by every later call too.
    pub fn wait(&self) -> ArrayResult<()> {
        if !self.inner.handle.is_complete() {
            log::trace!("waiting on job {} (`{}`)", self.inner.id, self.inner.kernel);
        }
        self.inner.handle.wait()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.handle.is_complete()
    }

    /// Whether both handles refer to the same submission.
    pub fn same_job(&self, other: &Job<B>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<B: ComputeBackend> Clone for Job<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ComputeBackend> fmt::Debug for Job<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.inner.id)
            .field("kernel", &self.inner.kernel.name())
            .field("complete", &self.is_complete())
            .finish()
    }
}

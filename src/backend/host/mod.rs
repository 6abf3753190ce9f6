//! Reference host backend.
//!
//! Buffers live in host memory and kernels run on a worker pool. Submissions
//! return immediately; each one starts only after its wait signals fire, so
//! ordering across jobs is exactly what the dispatch layer requested and
//! nothing more.

mod program;
mod scheduler;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use self::program::Program;
use self::scheduler::{Completion, WorkerPool};
use super::{BackendJob, BufferRange, ComputeBackend, DeviceBuffer, out_of_range};
use crate::device::DeviceConfig;
use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{DataShape, KernelId, KernelSpec, ParamShape, Params, WorkgroupDims};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// Host memory buffer.
///
/// Cloning shares the allocation; in-flight jobs hold clones so memory stays
/// valid until they finish even if the owning array is dropped.
#[derive(Debug, Clone)]
pub struct HostBuffer {
    id: u64,
    data: Arc<RwLock<Vec<f32>>>,
}

impl HostBuffer {
    fn new(data: Vec<f32>) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            data: Arc::new(RwLock::new(data)),
        }
    }
}

impl DeviceBuffer for HostBuffer {
    fn id(&self) -> u64 {
        self.id
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}

/// A catalog kernel bound to one signature.
#[derive(Debug)]
pub struct HostOperation {
    kernel: KernelId,
    program: Program,
    buffer_count: usize,
    params: ParamShape,
    workgroup: WorkgroupDims,
}

impl HostOperation {
    pub fn kernel(&self) -> KernelId {
        self.kernel
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    pub fn params(&self) -> ParamShape {
        self.params
    }

    pub fn workgroup(&self) -> WorkgroupDims {
        self.workgroup
    }
}

/// Completion signal of a host job.
#[derive(Clone)]
pub struct HostSignal(Arc<Completion>);

impl core::fmt::Debug for HostSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("HostSignal").field(&self.0.is_done()).finish()
    }
}

/// In-flight host submission.
pub struct HostJob {
    completion: Arc<Completion>,
}

impl BackendJob for HostJob {
    type Signal = HostSignal;

    fn signal(&self) -> HostSignal {
        HostSignal(Arc::clone(&self.completion))
    }

    fn wait(&self) -> ArrayResult<()> {
        self.completion.wait().map_err(ArrayError::launch)
    }

    fn is_complete(&self) -> bool {
        self.completion.is_done()
    }
}

/// Backend running kernels on host worker threads.
pub struct HostBackend {
    index: usize,
    pool: WorkerPool,
}

impl HostBackend {
    /// Index of the device this backend was created for.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.threads()
    }
}

impl ComputeBackend for HostBackend {
    type Buffer = HostBuffer;
    type Operation = HostOperation;
    type Signal = HostSignal;
    type Job = HostJob;

    fn create(config: &DeviceConfig) -> ArrayResult<Self> {
        let name = alloc::format!("cubek-host{}", config.index);
        let pool = WorkerPool::new(config.workers, &name).map_err(|err| {
            ArrayError::launch(alloc::format!("failed to start host workers: {err}"))
        })?;

        Ok(Self {
            index: config.index,
            pool,
        })
    }

    fn name(&self) -> &'static str {
        "host"
    }

    fn create_buffer(&self, len: usize) -> ArrayResult<HostBuffer> {
        Ok(HostBuffer::new(alloc::vec![0.0; len]))
    }

    fn copy_to_buffer(&self, data: &[f32]) -> ArrayResult<HostBuffer> {
        Ok(HostBuffer::new(data.to_vec()))
    }

    fn read_buffer(&self, buffer: &HostBuffer) -> ArrayResult<Vec<f32>> {
        Ok(buffer.data.read().clone())
    }

    fn read_range(&self, buffer: &HostBuffer, offset: usize, len: usize) -> ArrayResult<Vec<f32>> {
        let source = buffer.data.read();
        offset
            .checked_add(len)
            .and_then(|end| source.get(offset..end))
            .map(<[f32]>::to_vec)
            .ok_or_else(|| out_of_range(offset, len, source.len()))
    }

    fn write_buffer(&self, buffer: &HostBuffer, offset: usize, data: &[f32]) -> ArrayResult<()> {
        let mut target = buffer.data.write();
        let capacity = target.len();
        let range = offset
            .checked_add(data.len())
            .and_then(|end| target.get_mut(offset..end))
            .ok_or_else(|| out_of_range(offset, data.len(), capacity))?;
        range.copy_from_slice(data);
        Ok(())
    }

    fn compile(
        &self,
        kernel: &KernelSpec,
        buffer_count: usize,
        params: ParamShape,
        workgroup: WorkgroupDims,
    ) -> ArrayResult<HostOperation> {
        if buffer_count != kernel.buffer_count {
            return Err(ArrayError::launch(alloc::format!(
                "`{}` binds {} buffers, got {buffer_count}",
                kernel.name,
                kernel.buffer_count
            )));
        }
        if params.packing != kernel.packing {
            return Err(ArrayError::unsupported(alloc::format!(
                "`{}` expects {:?} parameters, got {:?}",
                kernel.name,
                kernel.packing,
                params.packing
            )));
        }

        Ok(HostOperation {
            kernel: kernel.id,
            program: Program::for_kernel(&kernel.id)?,
            buffer_count,
            params,
            workgroup,
        })
    }

    fn submit(
        &self,
        operation: &HostOperation,
        buffers: &[&HostBuffer],
        _shape: DataShape,
        params: Params,
        wait: &[HostSignal],
    ) -> ArrayResult<HostJob> {
        if buffers.len() != operation.buffer_count {
            return Err(ArrayError::launch(alloc::format!(
                "`{}` submitted with {} buffers, compiled for {}",
                operation.kernel,
                buffers.len(),
                operation.buffer_count
            )));
        }
        if params.shape() != operation.params {
            return Err(ArrayError::launch(alloc::format!(
                "`{}` submitted with {:?}, compiled for {:?}",
                operation.kernel,
                params.shape(),
                operation.params
            )));
        }

        let program = operation.program;
        let kernel = operation.kernel;
        let in_place = kernel.in_place;
        let buffers: Vec<HostBuffer> = buffers.iter().map(|buffer| (*buffer).clone()).collect();
        let wait: Vec<Arc<Completion>> = wait.iter().map(|signal| Arc::clone(&signal.0)).collect();

        let completion = self.pool.spawn(
            move || {
                // In-place kernels overwrite their first input; otherwise the
                // result is the trailing buffer.
                let split = if in_place {
                    buffers.first().map(|first| (&buffers[..], first))
                } else {
                    buffers.split_last().map(|(last, rest)| (rest, last))
                };
                let Some((inputs, output)) = split else {
                    return Err(alloc::format!("`{kernel}` submitted without buffers"));
                };

                let values: Vec<Vec<f32>> =
                    inputs.iter().map(|b| b.data.read().clone()).collect();
                let result = program.run(&values, &params);

                let mut target = output.data.write();
                if result.len() > target.len() {
                    return Err(alloc::format!(
                        "`{kernel}` produced {} elements for an output of {}",
                        result.len(),
                        target.len()
                    ));
                }
                target[..result.len()].copy_from_slice(&result);
                Ok(())
            },
            &wait,
        );

        Ok(HostJob { completion })
    }

    fn flush(&self, ranges: &[BufferRange<'_, HostBuffer>]) -> ArrayResult<()> {
        // Host memory is coherent.
        log::trace!("host flush of {} ranges", ranges.len());
        Ok(())
    }

    fn wait_all(&self) -> ArrayResult<()> {
        self.pool.wait_idle();
        Ok(())
    }
}

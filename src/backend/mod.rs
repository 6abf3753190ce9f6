//! Compute backend interface.
//!
//! The dispatch layer never touches device memory or kernels directly; it goes
//! through a [`ComputeBackend`]. Two implementations ship with the crate:
//!
//! - [`host::HostBackend`]: reference backend executing kernels on a worker
//!   pool, with the same asynchronous wait-signal semantics as a device queue.
//! - `cube::CubeBackend` (feature `cubecl`): kernels compiled and launched
//!   through CubeCL.

use alloc::vec::Vec;

use crate::device::DeviceConfig;
use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{DataShape, KernelSpec, ParamShape, Params, WorkgroupDims};

pub mod host;

#[cfg(feature = "cubecl")]
pub mod cube;

/// Device memory holding `f32` elements.
pub trait DeviceBuffer: Send + Sync {
    /// Identity of the allocation. Stable for the buffer's lifetime.
    fn id(&self) -> u64;

    /// Number of elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to an in-flight submission.
pub trait BackendJob: Send + Sync {
    type Signal: Clone + Send + Sync;

    /// Completion signal that later submissions can wait on.
    ///
    /// May be called any number of times; every copy fires together.
    fn signal(&self) -> Self::Signal;

    /// Blocks until the submission has finished executing.
    ///
    /// Returns [`ArrayError::LaunchError`](crate::ArrayError::LaunchError) if
    /// it failed. A submission waiting on a failed one fails as well.
    fn wait(&self) -> ArrayResult<()>;

    fn is_complete(&self) -> bool;
}

/// Range of a buffer to make visible to the device.
#[derive(Debug)]
pub struct BufferRange<'a, B> {
    pub buffer: &'a B,
    pub offset: usize,
    pub len: usize,
}

impl<'a, B: DeviceBuffer> BufferRange<'a, B> {
    /// The whole buffer.
    pub fn full(buffer: &'a B) -> Self {
        Self {
            buffer,
            offset: 0,
            len: buffer.len(),
        }
    }
}

/// A device able to allocate buffers, compile kernels and run submissions.
pub trait ComputeBackend: Send + Sync + Sized + 'static {
    type Buffer: DeviceBuffer;
    type Operation: Send + Sync;
    type Signal: Clone + Send + Sync;
    type Job: BackendJob<Signal = Self::Signal>;

    /// Opens the device selected by `config`.
    fn create(config: &DeviceConfig) -> ArrayResult<Self>;

    fn name(&self) -> &'static str;

    /// Allocates a buffer of `len` elements.
    fn create_buffer(&self, len: usize) -> ArrayResult<Self::Buffer>;

    /// Allocates a buffer initialized with `data`.
    fn copy_to_buffer(&self, data: &[f32]) -> ArrayResult<Self::Buffer>;

    /// Copies the buffer back to the host. Does not wait for pending jobs.
    fn read_buffer(&self, buffer: &Self::Buffer) -> ArrayResult<Vec<f32>>;

    /// Copies `len` elements starting at `offset` back to the host.
    ///
    /// The default reads the whole buffer and slices it.
    fn read_range(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        len: usize,
    ) -> ArrayResult<Vec<f32>> {
        let data = self.read_buffer(buffer)?;
        offset
            .checked_add(len)
            .and_then(|end| data.get(offset..end))
            .map(<[f32]>::to_vec)
            .ok_or_else(|| out_of_range(offset, len, data.len()))
    }

    /// Overwrites `data.len()` elements starting at `offset`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: usize, data: &[f32]) -> ArrayResult<()>;

    /// Compiles a kernel for one buffer-count/parameter/workgroup signature.
    fn compile(
        &self,
        kernel: &KernelSpec,
        buffer_count: usize,
        params: ParamShape,
        workgroup: WorkgroupDims,
    ) -> ArrayResult<Self::Operation>;

    /// Enqueues a compiled operation without blocking.
    ///
    /// The operation starts only after every signal in `wait` has fired.
    fn submit(
        &self,
        operation: &Self::Operation,
        buffers: &[&Self::Buffer],
        shape: DataShape,
        params: Params,
        wait: &[Self::Signal],
    ) -> ArrayResult<Self::Job>;

    /// Makes host writes to the given ranges visible to the device.
    fn flush(&self, ranges: &[BufferRange<'_, Self::Buffer>]) -> ArrayResult<()>;

    /// Blocks until every submission issued so far has completed.
    fn wait_all(&self) -> ArrayResult<()>;
}

pub(crate) fn out_of_range(offset: usize, len: usize, capacity: usize) -> ArrayError {
    ArrayError::memory(alloc::format!(
        "range of {len} elements at offset {offset} exceeds buffer of {capacity}"
    ))
}

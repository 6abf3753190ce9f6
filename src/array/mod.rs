//! Device arrays.
//!
//! An [`Array`] owns one device buffer and remembers the last job that wrote
//! it, plus the jobs reading it since. Operations submit asynchronously and
//! return immediately; host reads wait for the pending write first.

mod binary;
mod builder;
mod clamp;
mod dispatch;
mod matmul;
mod operand;
mod ops;
mod unary;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::backend::host::HostBackend;
use crate::backend::{ComputeBackend, DeviceBuffer};
use crate::device::{Device, Job};
use crate::error::{ArrayError, ArrayResult};

pub use builder::ArrayBuilder;
pub use matmul::MAX_MATMUL_RANK;
pub use operand::Operand;

/// Dimension sizes, outermost first.
pub type Shape = SmallVec<[usize; 4]>;

/// Jobs touching an array's buffer that have not been observed complete.
struct Pending<B: ComputeBackend> {
    /// Most recent job writing the buffer.
    write: Option<Job<B>>,
    /// Jobs reading the buffer since that write.
    reads: SmallVec<[Job<B>; 2]>,
}

impl<B: ComputeBackend> Pending<B> {
    fn new(write: Option<Job<B>>) -> Self {
        Self {
            write,
            reads: SmallVec::new(),
        }
    }
}

/// Array of `f32` living on a device.
pub struct Array<'d, B: ComputeBackend = HostBackend> {
    device: &'d Device<B>,
    shape: Shape,
    buffer: B::Buffer,
    pending: Mutex<Pending<B>>,
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    /// Starts building an array on `device`.
    pub fn builder(device: &'d Device<B>) -> ArrayBuilder<'d, '_, B> {
        ArrayBuilder::new(device)
    }

    /// One-dimensional array copied from `data`.
    pub fn from_slice(device: &'d Device<B>, data: &[f32]) -> ArrayResult<Self> {
        ArrayBuilder::new(device).data(data).build()
    }

    /// Array of the given shape copied from row-major `data`.
    pub fn from_shape_slice(
        device: &'d Device<B>,
        shape: &[usize],
        data: &[f32],
    ) -> ArrayResult<Self> {
        ArrayBuilder::new(device).shape(shape).data(data).build()
    }

    /// Array of the given shape with backend-defined contents.
    pub fn empty(device: &'d Device<B>, shape: &[usize]) -> ArrayResult<Self> {
        ArrayBuilder::new(device).shape(shape).build()
    }

    /// Array of the given shape filled with zeros.
    pub fn zeros(device: &'d Device<B>, shape: &[usize]) -> ArrayResult<Self> {
        Self::full(device, shape, 0.0)
    }

    /// Array of the given shape filled with `value`.
    pub fn full(device: &'d Device<B>, shape: &[usize], value: f32) -> ArrayResult<Self> {
        let len = builder::checked_len(shape)?;
        let data = alloc::vec![value; len];
        ArrayBuilder::new(device).shape(shape).data(&data).build()
    }

    fn from_parts(
        device: &'d Device<B>,
        shape: Shape,
        buffer: B::Buffer,
        write: Option<Job<B>>,
    ) -> Self {
        Self {
            device,
            shape,
            buffer,
            pending: Mutex::new(Pending::new(write)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Always `false`: every dimension is positive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn device(&self) -> &'d Device<B> {
        self.device
    }

    /// The device buffer backing this array.
    pub fn buffer(&self) -> &B::Buffer {
        &self.buffer
    }

    /// Identity of the backing buffer. In-place operations keep it.
    pub fn buffer_id(&self) -> u64 {
        self.buffer.id()
    }

    /// The last job writing this array, if it has not been waited on.
    pub fn job(&self) -> Option<Job<B>> {
        self.pending.lock().write.clone()
    }

    /// Whether no write to this array is pending.
    pub fn is_ready(&self) -> bool {
        self.pending.lock().write.as_ref().is_none_or(|job| job.is_complete())
    }

    /// Blocks until the last write to this array has executed.
    pub fn wait(&self) -> ArrayResult<()> {
        let Some(job) = self.job() else {
            return Ok(());
        };
        job.wait()?;

        let mut pending = self.pending.lock();
        if pending.write.as_ref().is_some_and(|current| current.same_job(&job)) {
            pending.write = None;
        }
        Ok(())
    }

    /// Copies the contents to the host, waiting for the pending write.
    pub fn to_vec(&self) -> ArrayResult<Vec<f32>> {
        self.wait()?;
        self.device.backend().read_buffer(&self.buffer)
    }

    /// Reads one element by flat row-major index.
    pub fn get(&self, index: usize) -> ArrayResult<f32> {
        let len = self.len();
        if index >= len {
            return Err(ArrayError::IndexOutOfBounds { index, len });
        }
        self.wait()?;
        let values = self.device.backend().read_range(&self.buffer, index, 1)?;
        values
            .first()
            .copied()
            .ok_or(ArrayError::IndexOutOfBounds { index, len })
    }

    /// Overwrites elements starting at flat index `offset`.
    ///
    /// Waits for every job reading or writing the buffer first.
    pub fn write(&mut self, offset: usize, data: &[f32]) -> ArrayResult<()> {
        let len = self.len();
        if offset.checked_add(data.len()).is_none_or(|end| end > len) {
            return Err(ArrayError::IndexOutOfBounds {
                index: offset.saturating_add(data.len()).saturating_sub(1),
                len,
            });
        }

        self.settle()?;
        self.device.backend().write_buffer(&self.buffer, offset, data)
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: f32) -> ArrayResult<()> {
        let data = alloc::vec![value; self.len()];
        self.write(0, &data)
    }

    /// Changes the logical shape. The element count must not change.
    pub fn reshape(&mut self, shape: &[usize]) -> ArrayResult<()> {
        let len = builder::checked_len(shape)?;
        if len != self.len() {
            return Err(ArrayError::InvalidReshape {
                from: self.shape.to_vec(),
                to: shape.to_vec(),
            });
        }
        self.shape = Shape::from_slice(shape);
        Ok(())
    }

    /// Makes host writes to this array visible to the device.
    pub fn flush(&self) -> ArrayResult<()> {
        self.device.flush(&[self])
    }

    /// Waits for every outstanding job touching the buffer.
    fn settle(&mut self) -> ArrayResult<()> {
        let pending = self.pending.get_mut();
        if let Some(job) = &pending.write {
            job.wait()?;
        }
        for job in &pending.reads {
            job.wait()?;
        }
        pending.write = None;
        pending.reads.clear();
        Ok(())
    }
}

impl<B: ComputeBackend> fmt::Debug for Array<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape.as_slice())
            .field("buffer", &self.buffer.id())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Materializes the array, waiting for its pending write.
impl<B: ComputeBackend> fmt::Display for Array<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.to_vec().map_err(|err| {
            log::error!("failed to materialize array for display: {err}");
            fmt::Error
        })?;
        let mut out = String::new();
        format_nested(&mut out, &self.shape, &values);
        f.write_str(&out)
    }
}

fn format_nested(out: &mut String, shape: &[usize], values: &[f32]) {
    use core::fmt::Write;

    out.push('[');
    match shape {
        [] | [_] => {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{value}");
            }
        }
        [outer, inner @ ..] => {
            let stride = values.len() / outer.max(&1);
            for (i, chunk) in values.chunks(stride.max(1)).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                format_nested(out, inner, chunk);
            }
        }
    }
    out.push(']');
}

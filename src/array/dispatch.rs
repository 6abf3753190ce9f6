//! Submission plumbing shared by every array operation.
//!
//! Out-of-place operations read their operands and write a fresh array; the
//! submission waits on each operand's pending write and is recorded as a
//! reader of each operand. In-place operations also wait on every reader of
//! the target, so a later write never races an earlier read.

use smallvec::SmallVec;

use super::{Array, Shape};
use crate::backend::ComputeBackend;
use crate::device::Job;
use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{DataShape, KernelCatalog, KernelId, Params, WorkgroupDims};

/// Everything needed to submit one kernel over a set of arrays.
pub(super) struct Launch<'x, 'd, B: ComputeBackend> {
    pub kernel: KernelId,
    pub workgroup: WorkgroupDims,
    pub shape: DataShape,
    pub params: Params,
    /// Array operands other than the target, in binding order.
    pub inputs: &'x [&'x Array<'d, B>],
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    /// Rejects operands that do not live on this array's device.
    pub(super) fn check_device(&self, other: &Array<'_, B>) -> ArrayResult<()> {
        if core::ptr::eq(self.device, other.device) {
            Ok(())
        } else {
            Err(ArrayError::unsupported(
                "operands are allocated on different devices",
            ))
        }
    }

    /// Rejects elementwise operands of a different shape or device.
    pub(super) fn check_elementwise(&self, other: &Array<'_, B>) -> ArrayResult<()> {
        self.check_device(other)?;
        if self.shape != other.shape {
            return Err(ArrayError::shape_mismatch(&self.shape, &other.shape));
        }
        Ok(())
    }

    /// Element count as carried in kernel parameters.
    pub(super) fn kernel_size(&self) -> ArrayResult<u32> {
        let len = self.len();
        u32::try_from(len).map_err(|_| {
            ArrayError::unsupported(alloc::format!(
                "{len} elements exceed the kernel index range"
            ))
        })
    }

    /// Elementwise launch over this array with the catalog's packing.
    pub(super) fn elementwise<'x>(
        &self,
        kernel: KernelId,
        inputs: &'x [&'x Array<'d, B>],
        scalars: &[f32],
    ) -> ArrayResult<Launch<'x, 'd, B>> {
        let spec = KernelCatalog::global().get(&kernel)?;
        let size = self.kernel_size()?;
        Ok(Launch {
            kernel,
            workgroup: spec.workgroup,
            shape: DataShape::new(size, 1, 1),
            params: spec.packing.pack(size, scalars)?,
            inputs,
        })
    }

    /// Submits `launch` reading `self` and `launch.inputs`, writing a new array.
    pub(super) fn launch(
        &self,
        launch: Launch<'_, 'd, B>,
        shape: Shape,
    ) -> ArrayResult<Array<'d, B>> {
        let len = shape.iter().product();
        let output = self.device.create_buffer(len)?;

        let mut waits: SmallVec<[Job<B>; 4]> = SmallVec::new();
        waits.extend(self.job());
        for input in launch.inputs {
            waits.extend(input.job());
        }
        let wait: SmallVec<[&Job<B>; 4]> = waits.iter().collect();

        let job = {
            let mut buffers: SmallVec<[&B::Buffer; 4]> = SmallVec::new();
            buffers.push(&self.buffer);
            buffers.extend(launch.inputs.iter().map(|input| &input.buffer));
            buffers.push(&output);

            self.device.submit(
                launch.kernel,
                launch.workgroup,
                &buffers,
                launch.shape,
                launch.params,
                &wait,
            )?
        };

        self.record_read(&job);
        for input in launch.inputs {
            input.record_read(&job);
        }

        Ok(Array::from_parts(self.device, shape, output, Some(job)))
    }

    /// Submits `launch` overwriting `self` in place.
    pub(super) fn launch_inplace(&mut self, launch: Launch<'_, 'd, B>) -> ArrayResult<()> {
        let pending = self.pending.get_mut();

        let mut waits: SmallVec<[Job<B>; 4]> = SmallVec::new();
        waits.extend(pending.write.iter().cloned());
        waits.extend(pending.reads.iter().cloned());
        for input in launch.inputs {
            waits.extend(input.job());
        }
        let wait: SmallVec<[&Job<B>; 4]> = waits.iter().collect();

        let mut buffers: SmallVec<[&B::Buffer; 4]> = SmallVec::new();
        buffers.push(&self.buffer);
        buffers.extend(launch.inputs.iter().map(|input| &input.buffer));

        let job = self.device.submit(
            launch.kernel,
            launch.workgroup,
            &buffers,
            launch.shape,
            launch.params,
            &wait,
        )?;

        for input in launch.inputs {
            input.record_read(&job);
        }

        let pending = self.pending.get_mut();
        pending.write = Some(job);
        pending.reads.clear();
        Ok(())
    }

    /// Remembers `job` as reading this array until it completes.
    fn record_read(&self, job: &Job<B>) {
        let mut pending = self.pending.lock();
        pending.reads.retain(|read| !read.is_complete());
        pending.reads.push(job.clone());
    }
}

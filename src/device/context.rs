//! Device context and submission.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::cache::{CacheStats, OperationCache, OperationKey};
use super::config::DeviceConfig;
use super::job::Job;
use crate::array::Array;
use crate::backend::host::HostBackend;
use crate::backend::{BufferRange, ComputeBackend};
use crate::error::ArrayResult;
use crate::kernel::{DataShape, KernelCatalog, KernelId, ParamShape, Params, WorkgroupDims};

/// Owns one backend device and its compiled-operation cache.
///
/// Arrays borrow the device; it must outlive every array allocated on it.
pub struct Device<B: ComputeBackend = HostBackend> {
    backend: B,
    config: DeviceConfig,
    cache: OperationCache<B::Operation>,
    next_job: AtomicU64,
}

impl Device<HostBackend> {
    /// Opens a host device with default settings.
    pub fn host() -> ArrayResult<Self> {
        Self::new(DeviceConfig::default())
    }
}

impl<B: ComputeBackend> Device<B> {
    /// Opens the device selected by `config`.
    pub fn new(config: DeviceConfig) -> ArrayResult<Self> {
        let backend = B::create(&config)?;
        log::debug!(
            "opened {} device {} (priority {})",
            backend.name(),
            config.index,
            config.priority
        );
        Ok(Self::with_backend(backend, config))
    }

    /// Wraps an already opened backend.
    pub fn with_backend(backend: B, config: DeviceConfig) -> Self {
        Self {
            backend,
            config,
            cache: OperationCache::new(),
            next_job: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of compiled operations held by the cache.
    pub fn cached_operations(&self) -> usize {
        self.cache.len()
    }

    pub fn create_buffer(&self, len: usize) -> ArrayResult<B::Buffer> {
        self.backend.create_buffer(len)
    }

    pub fn copy_to_buffer(&self, data: &[f32]) -> ArrayResult<B::Buffer> {
        self.backend.copy_to_buffer(data)
    }

    /// Fetches or compiles the operation for an exact signature.
    pub fn operation(
        &self,
        kernel: KernelId,
        buffer_count: usize,
        params: ParamShape,
        workgroup: WorkgroupDims,
    ) -> ArrayResult<Arc<B::Operation>> {
        let key = OperationKey {
            kernel,
            buffer_count,
            params,
            workgroup,
        };

        self.cache.get_or_create(key, |key| {
            let spec = KernelCatalog::global().get(&key.kernel)?;
            self.backend
                .compile(spec, key.buffer_count, key.params, key.workgroup)
        })
    }

    /// Submits a kernel without blocking.
    ///
    /// `buffers` are ordered inputs first, then outputs. The device starts the
    /// work only after every job in `wait` has completed. Shapes are not
    /// validated here.
    pub fn submit(
        &self,
        kernel: KernelId,
        workgroup: WorkgroupDims,
        buffers: &[&B::Buffer],
        shape: DataShape,
        params: Params,
        wait: &[&Job<B>],
    ) -> ArrayResult<Job<B>> {
        let operation = self.operation(kernel, buffers.len(), params.shape(), workgroup)?;

        let mut signals: SmallVec<[B::Signal; 4]> = SmallVec::new();
        for (i, job) in wait.iter().enumerate() {
            if wait[..i].iter().any(|seen| seen.same_job(job)) {
                continue;
            }
            signals.push(job.signal());
        }

        let handle = self
            .backend
            .submit(&operation, buffers, shape, params, &signals)?;
        let id = self.next_job.fetch_add(1, Ordering::Relaxed);

        log::trace!(
            "submitted job {id} `{kernel}` buffers={} waits={} shape={:?}",
            buffers.len(),
            signals.len(),
            shape
        );

        Ok(Job::new(id, kernel, handle))
    }

    /// Makes host writes to the arrays visible to the device.
    pub fn flush(&self, arrays: &[&Array<'_, B>]) -> ArrayResult<()> {
        let ranges: SmallVec<[BufferRange<'_, B::Buffer>; 4]> = arrays
            .iter()
            .map(|array| BufferRange::full(array.buffer()))
            .collect();
        self.backend.flush(&ranges)
    }

    /// Blocks until every submission on this device has completed.
    pub fn wait_all(&self) -> ArrayResult<()> {
        log::trace!("waiting for all jobs on device {}", self.config.index);
        self.backend.wait_all()
    }

    /// Number of submissions issued so far.
    pub fn submissions(&self) -> u64 {
        self.next_job.load(Ordering::Relaxed)
    }
}

impl<B: ComputeBackend> fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{BinaryOp, OperandKind};

    fn device() -> Device {
        Device::new(DeviceConfig::default().with_workers(2)).unwrap()
    }

    #[test]
    fn test_operation_reused_per_signature() {
        let device = device();
        let kernel = KernelId::binary(BinaryOp::Mul, OperandKind::VS, false);
        let scaled = |size| Params::VectorScalar { size, scalar: 2.0 };
        let shape = scaled(8).shape();

        let a = device.operation(kernel, 2, shape, WorkgroupDims::elementwise()).unwrap();
        let b = device.operation(kernel, 2, shape, WorkgroupDims::elementwise()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = scaled(9).shape();
        let c = device.operation(kernel, 2, other, WorkgroupDims::elementwise()).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(device.cached_operations(), 2);
    }

    #[test]
    fn test_submit_unknown_kernel() {
        let device = device();
        let kernel = KernelId::binary(BinaryOp::Add, OperandKind::SV, false);
        let buffer = device.create_buffer(2).unwrap();

        let result = device.submit(
            kernel,
            WorkgroupDims::elementwise(),
            &[&buffer, &buffer],
            DataShape::new(2, 1, 1),
            Params::VectorScalar {
                size: 2,
                scalar: 1.0,
            },
            &[],
        );
        assert!(result.is_err());
        assert_eq!(device.submissions(), 0);
        assert_eq!(device.cached_operations(), 0);
    }

    #[test]
    fn test_submit_chain() {
        let device = device();
        let kernel = KernelId::binary(BinaryOp::Mul, OperandKind::VS, true);
        let buffer = device.copy_to_buffer(&[1.0, 2.0]).unwrap();
        let params = Params::VectorScalar {
            size: 2,
            scalar: 3.0,
        };

        let workgroup = WorkgroupDims::elementwise();
        let shape = DataShape::new(2, 1, 1);

        let first = device
            .submit(kernel, workgroup, &[&buffer], shape, params, &[])
            .unwrap();
        let second = device
            .submit(kernel, workgroup, &[&buffer], shape, params, &[&first, &first])
            .unwrap();

        second.wait().unwrap();
        assert!(first.is_complete());
        assert_eq!(device.backend().read_buffer(&buffer).unwrap(), alloc::vec![9.0, 18.0]);
        assert_eq!(device.cache_stats().hits, 1);
    }
}

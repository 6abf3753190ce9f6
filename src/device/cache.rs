//! Compiled-operation cache.
//!
//! Memoizes backend compilations per exact signature. The parameter shape is
//! part of the key, so every distinct element count compiles once and stays
//! cached: entries are never evicted.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ArrayResult;
use crate::kernel::{KernelId, ParamShape, WorkgroupDims};

/// Signature of a compiled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub kernel: KernelId,
    pub buffer_count: usize,
    pub params: ParamShape,
    pub workgroup: WorkgroupDims,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Map from signature to shared compiled operation.
pub struct OperationCache<O> {
    entries: Mutex<HashMap<OperationKey, Arc<O>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<O> OperationCache<O> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached operation for `key`, compiling it on a miss.
    ///
    /// The lock is held across `compile` so concurrent submitters never
    /// compile the same signature twice.
    pub fn get_or_create<F>(&self, key: OperationKey, compile: F) -> ArrayResult<Arc<O>>
    where
        F: FnOnce(&OperationKey) -> ArrayResult<O>,
    {
        let mut entries = self.entries.lock();

        if let Some(operation) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(operation));
        }

        let operation = Arc::new(compile(&key)?);
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "compiled `{}` buffers={} params={:?} workgroup={:?} ({} cached)",
            key.kernel,
            key.buffer_count,
            key.params,
            key.workgroup,
            entries.len() + 1
        );
        entries.insert(key, Arc::clone(&operation));

        Ok(operation)
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<O> Default for OperationCache<O> {
    fn default() -> Self {
        Self::new()
    }
}

//! Device context, compiled-operation cache and job handles.
//!
//! Every array operation ends up in [`Device::submit`], which resolves the
//! compiled operation for its signature and enqueues it with the wait
//! dependencies of its operands.

mod cache;
mod config;
mod context;
mod job;

pub use cache::{CacheStats, OperationCache, OperationKey};
pub use config::DeviceConfig;
pub use context::Device;
pub use job::Job;

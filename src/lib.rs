//! # CubeK Array
//!
//! Asynchronous `f32` array operations dispatched to a compute device.
//!
//! ## Features
//!
//! - Catalog of elementwise, clamp and matmul kernels with in-place variants
//! - Compiled operations cached per exact signature
//! - Non-blocking submission with wait dependencies between jobs
//! - Host reads wait only for the work they depend on
//! - Host reference backend, CubeCL backend behind the `cubecl` feature
//!
//! ## Example
//!
//! ```
//! use cubek_array::{Array, Device};
//!
//! let device = Device::host()?;
//! let a = Array::from_slice(&device, &[1.0, 2.0, 3.0])?;
//! let b = Array::from_slice(&device, &[4.0, 5.0, 6.0])?;
//!
//! // Both submissions return immediately; `d` waits on `c` on the device.
//! let c = a.add(&b)?;
//! let d = c.mul(2.0_f32)?;
//!
//! assert_eq!(d.to_vec()?, vec![10.0, 14.0, 18.0]);
//! # Ok::<(), cubek_array::ArrayError>(())
//! ```

extern crate alloc;

pub mod array;
pub mod backend;
pub mod device;
pub mod error;
pub mod kernel;

pub use array::{Array, ArrayBuilder, Operand, Shape};
pub use backend::ComputeBackend;
pub use backend::host::HostBackend;
pub use device::{CacheStats, Device, DeviceConfig, Job};
pub use error::{ArrayError, ArrayResult};
pub use kernel::{KernelCatalog, KernelId, KernelSpec};

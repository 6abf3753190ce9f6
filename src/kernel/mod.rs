//! Kernel selection.
//!
//! Maps every (operator, operand kind, in-place) combination to the
//! precompiled kernel, its parameter packing and its workgroup split.

mod catalog;
mod id;
mod params;

pub use catalog::{KernelCatalog, KernelSpec};
pub use id::{BinaryOp, KernelId, KernelOp, OperandKind, UnaryOp};
pub use params::{DataShape, Packing, ParamShape, Params, WORKGROUP_SIZE, WorkgroupDims};

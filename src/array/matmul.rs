use super::dispatch::Launch;
use super::{Array, Shape};
use crate::backend::ComputeBackend;
use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{DataShape, KernelCatalog, KernelId, Params};

/// Highest operand rank accepted by [`Array::matmul`].
pub const MAX_MATMUL_RANK: usize = 3;

/// Row, contraction and column extents of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatMulDims {
    rows: usize,
    contraction: usize,
    columns: usize,
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    /// Matrix product contracting the last axis of `self` with the first axis
    /// of `rhs`.
    ///
    /// The result shape is `self.shape[..n-1] ++ rhs.shape[1..]`, or `[1]`
    /// when both operands are vectors.
    pub fn matmul(&self, rhs: &Array<'d, B>) -> ArrayResult<Array<'d, B>> {
        self.check_device(rhs)?;
        let (dims, shape) = matmul_dims(&self.shape, &rhs.shape)?;

        let kernel = KernelId::matmul();
        let spec = KernelCatalog::global().get(&kernel)?;
        let rows = kernel_extent(dims.rows)?;
        let contraction = kernel_extent(dims.contraction)?;
        let columns = kernel_extent(dims.columns)?;

        let inputs = [rhs];
        let launch = Launch {
            kernel,
            workgroup: spec.workgroup,
            shape: DataShape::new(rows, columns, 1),
            params: Params::MatMul {
                rows,
                contraction,
                columns,
            },
            inputs: &inputs,
        };
        self.launch(launch, shape)
    }
}

fn matmul_dims(lhs: &[usize], rhs: &[usize]) -> ArrayResult<(MatMulDims, Shape)> {
    if lhs.len() > MAX_MATMUL_RANK || rhs.len() > MAX_MATMUL_RANK {
        return Err(ArrayError::dimension_mismatch(lhs, rhs));
    }
    let (Some((&contraction, outer)), Some((&inner, trailing))) =
        (lhs.split_last(), rhs.split_first())
    else {
        return Err(ArrayError::dimension_mismatch(lhs, rhs));
    };
    if contraction != inner {
        return Err(ArrayError::dimension_mismatch(lhs, rhs));
    }

    let mut shape: Shape = outer.iter().chain(trailing).copied().collect();
    if shape.is_empty() {
        shape.push(1);
    }

    let dims = MatMulDims {
        rows: outer.iter().product(),
        contraction,
        columns: trailing.iter().product(),
    };
    Ok((dims, shape))
}

fn kernel_extent(extent: usize) -> ArrayResult<u32> {
    u32::try_from(extent).map_err(|_| {
        ArrayError::unsupported(alloc::format!(
            "matmul extent {extent} exceeds the kernel index range"
        ))
    })
}

//! Parameter packings, data shapes and workgroup dimensions.

use crate::error::{ArrayError, ArrayResult};

/// Local workgroup size along the parallel dimension.
pub const WORKGROUP_SIZE: u32 = 64;

/// Device-side parallel work split of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkgroupDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupDims {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// One-dimensional split over the flattened element count.
    pub const fn elementwise() -> Self {
        Self::new(WORKGROUP_SIZE, 1, 1)
    }

    /// Two-dimensional split over (rows, columns), wide along columns.
    pub const fn matmul() -> Self {
        Self::new(1, WORKGROUP_SIZE, 1)
    }
}

/// Global extent of the data a submission covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataShape {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DataShape {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Number of workgroups needed per dimension for the given split.
    pub fn group_count(&self, workgroup: WorkgroupDims) -> (u32, u32, u32) {
        (
            self.x.div_ceil(workgroup.x.max(1)),
            self.y.div_ceil(workgroup.y.max(1)),
            self.z.div_ceil(workgroup.z.max(1)),
        )
    }
}

/// Parameter packing rule of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Packing {
    /// Element count only.
    Vector,
    /// Element count and one scalar.
    VectorScalar,
    /// Element count and two scalars.
    VectorScalar2,
    /// Rows, contraction length and columns.
    MatMul,
}

impl Packing {
    /// Packing for an elementwise kernel carrying `scalars` scalar operands.
    pub fn for_scalars(scalars: usize) -> ArrayResult<Self> {
        match scalars {
            0 => Ok(Packing::Vector),
            1 => Ok(Packing::VectorScalar),
            2 => Ok(Packing::VectorScalar2),
            n => Err(ArrayError::unsupported(alloc::format!(
                "no parameter packing carries {n} scalars"
            ))),
        }
    }

    /// Packs an elementwise submission over `size` elements.
    pub fn pack(&self, size: u32, scalars: &[f32]) -> ArrayResult<Params> {
        match (self, scalars) {
            (Packing::Vector, []) => Ok(Params::Vector { size }),
            (Packing::VectorScalar, [scalar]) => Ok(Params::VectorScalar {
                size,
                scalar: *scalar,
            }),
            (Packing::VectorScalar2, [first, second]) => Ok(Params::VectorScalar2 {
                size,
                scalars: [*first, *second],
            }),
            _ => Err(ArrayError::unsupported(alloc::format!(
                "{self:?} packing cannot carry {} scalars",
                scalars.len()
            ))),
        }
    }
}

/// Packed parameters passed by value with every submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Params {
    Vector { size: u32 },
    VectorScalar { size: u32, scalar: f32 },
    VectorScalar2 { size: u32, scalars: [f32; 2] },
    MatMul {
        rows: u32,
        contraction: u32,
        columns: u32,
    },
}

impl Params {
    pub fn packing(&self) -> Packing {
        match self {
            Params::Vector { .. } => Packing::Vector,
            Params::VectorScalar { .. } => Packing::VectorScalar,
            Params::VectorScalar2 { .. } => Packing::VectorScalar2,
            Params::MatMul { .. } => Packing::MatMul,
        }
    }

    /// The size-carrying part of the parameters, used as a cache signature.
    pub fn shape(&self) -> ParamShape {
        match *self {
            Params::Vector { size }
            | Params::VectorScalar { size, .. }
            | Params::VectorScalar2 { size, .. } => ParamShape {
                packing: self.packing(),
                dims: [size, 0, 0],
            },
            Params::MatMul {
                rows,
                contraction,
                columns,
            } => ParamShape {
                packing: Packing::MatMul,
                dims: [rows, contraction, columns],
            },
        }
    }

    /// Scalar operands, in kernel order.
    pub fn scalars(&self) -> &[f32] {
        match self {
            Params::Vector { .. } | Params::MatMul { .. } => &[],
            Params::VectorScalar { scalar, .. } => core::slice::from_ref(scalar),
            Params::VectorScalar2 { scalars, .. } => scalars,
        }
    }
}

/// Packing kind plus its size-carrying fields.
///
/// Scalar values are not part of the shape: two submissions differing only in
/// their scalar operand share one compiled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamShape {
    pub packing: Packing,
    pub dims: [u32; 3],
}

use smallvec::SmallVec;

use super::{Array, Operand};
use crate::backend::ComputeBackend;
use crate::error::ArrayResult;
use crate::kernel::{KernelId, OperandKind};

/// Bound arrays and scalars of one clamp call, in kernel binding order.
struct Bounds<'a, 'd, B: ComputeBackend> {
    operands: OperandKind,
    arrays: SmallVec<[&'a Array<'d, B>; 2]>,
    scalars: SmallVec<[f32; 2]>,
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    /// Limits every element to `[min, max]`.
    ///
    /// Each bound is either an array of the same shape or a scalar. No
    /// ordering between `min` and `max` is checked; an element is raised to
    /// `min` first, then lowered to `max`.
    pub fn clamp<'a>(
        &self,
        min: impl Into<Operand<'a, 'd, B>>,
        max: impl Into<Operand<'a, 'd, B>>,
    ) -> ArrayResult<Array<'d, B>>
    where
        'd: 'a,
    {
        let bounds = self.bounds(min.into(), max.into())?;
        let kernel = KernelId::clamp(bounds.operands, false);
        let launch = self.elementwise(kernel, &bounds.arrays, &bounds.scalars)?;
        self.launch(launch, self.shape.clone())
    }

    /// In-place form of [`Array::clamp`].
    pub fn clamp_inplace<'a>(
        &mut self,
        min: impl Into<Operand<'a, 'd, B>>,
        max: impl Into<Operand<'a, 'd, B>>,
    ) -> ArrayResult<()>
    where
        'd: 'a,
    {
        let bounds = self.bounds(min.into(), max.into())?;
        let kernel = KernelId::clamp(bounds.operands, true);
        let launch = self.elementwise(kernel, &bounds.arrays, &bounds.scalars)?;
        self.launch_inplace(launch)
    }

    fn bounds<'a>(
        &self,
        min: Operand<'a, 'd, B>,
        max: Operand<'a, 'd, B>,
    ) -> ArrayResult<Bounds<'a, 'd, B>> {
        let bounds = match (min, max) {
            (Operand::Array(min), Operand::Array(max)) => Bounds {
                operands: OperandKind::VVV,
                arrays: smallvec::smallvec![min, max],
                scalars: SmallVec::new(),
            },
            (Operand::Scalar(min), Operand::Array(max)) => Bounds {
                operands: OperandKind::VSV,
                arrays: smallvec::smallvec![max],
                scalars: smallvec::smallvec![min],
            },
            (Operand::Array(min), Operand::Scalar(max)) => Bounds {
                operands: OperandKind::VVS,
                arrays: smallvec::smallvec![min],
                scalars: smallvec::smallvec![max],
            },
            (Operand::Scalar(min), Operand::Scalar(max)) => Bounds {
                operands: OperandKind::VSS,
                arrays: SmallVec::new(),
                scalars: smallvec::smallvec![min, max],
            },
        };

        for bound in &bounds.arrays {
            self.check_elementwise(bound)?;
        }
        Ok(bounds)
    }
}

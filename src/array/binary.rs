//! Binary arithmetic, elementwise extrema and powers.

use super::{Array, Operand};
use crate::backend::ComputeBackend;
use crate::error::ArrayResult;
use crate::kernel::{BinaryOp, KernelId, OperandKind};

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $name:ident, $inplace:ident => $op:ident;)*) => {
        impl<'d, B: ComputeBackend> Array<'d, B> {
            $(
                $(#[$doc])*
                pub fn $name<'a>(
                    &self,
                    rhs: impl Into<Operand<'a, 'd, B>>,
                ) -> ArrayResult<Array<'d, B>>
                where
                    'd: 'a,
                {
                    self.binary(BinaryOp::$op, rhs.into())
                }

                #[doc = concat!("In-place form of [`Array::", stringify!($name), "`].")]
                pub fn $inplace<'a>(
                    &mut self,
                    rhs: impl Into<Operand<'a, 'd, B>>,
                ) -> ArrayResult<()>
                where
                    'd: 'a,
                {
                    self.binary_inplace(BinaryOp::$op, rhs.into())
                }
            )*
        }
    };
}

binary_ops! {
    /// Elementwise `self + rhs`.
    add, add_inplace => Add;
    /// Elementwise `self - rhs`.
    sub, sub_inplace => Sub;
    /// Elementwise `self * rhs`.
    mul, mul_inplace => Mul;
    /// Elementwise `self / rhs`.
    div, div_inplace => Div;
    /// Elementwise maximum.
    max, max_inplace => Max;
    /// Elementwise minimum.
    min, min_inplace => Min;
    /// Elementwise `self` raised to `rhs`.
    pow, pow_inplace => Pow;
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    /// `lhs + self`.
    pub fn radd(&self, lhs: f32) -> ArrayResult<Array<'d, B>> {
        self.reversed(BinaryOp::Add, lhs)
    }

    /// `lhs - self`.
    pub fn rsub(&self, lhs: f32) -> ArrayResult<Array<'d, B>> {
        self.reversed(BinaryOp::Sub, lhs)
    }

    /// `lhs * self`.
    pub fn rmul(&self, lhs: f32) -> ArrayResult<Array<'d, B>> {
        self.reversed(BinaryOp::Mul, lhs)
    }

    /// `lhs / self`.
    pub fn rdiv(&self, lhs: f32) -> ArrayResult<Array<'d, B>> {
        self.reversed(BinaryOp::Div, lhs)
    }

    /// `lhs` raised to each element.
    pub fn rpow(&self, lhs: f32) -> ArrayResult<Array<'d, B>> {
        self.reversed(BinaryOp::Pow, lhs)
    }

    fn binary(&self, op: BinaryOp, rhs: Operand<'_, 'd, B>) -> ArrayResult<Array<'d, B>> {
        match rhs {
            Operand::Array(rhs) => {
                self.check_elementwise(rhs)?;
                let kernel = KernelId::binary(op, OperandKind::VV, false);
                let inputs = [rhs];
                let launch = self.elementwise(kernel, &inputs, &[])?;
                self.launch(launch, self.shape.clone())
            }
            Operand::Scalar(value) => {
                let kernel = KernelId::binary(op, OperandKind::VS, false);
                let launch = self.elementwise(kernel, &[], &[value])?;
                self.launch(launch, self.shape.clone())
            }
        }
    }

    fn binary_inplace(&mut self, op: BinaryOp, rhs: Operand<'_, 'd, B>) -> ArrayResult<()> {
        match rhs {
            Operand::Array(rhs) => {
                self.check_elementwise(rhs)?;
                let kernel = KernelId::binary(op, OperandKind::VV, true);
                let inputs = [rhs];
                let launch = self.elementwise(kernel, &inputs, &[])?;
                self.launch_inplace(launch)
            }
            Operand::Scalar(value) => {
                let kernel = KernelId::binary(op, OperandKind::VS, true);
                let launch = self.elementwise(kernel, &[], &[value])?;
                self.launch_inplace(launch)
            }
        }
    }

    /// `lhs op self`. Commutative ops reuse the array-scalar kernel.
    fn reversed(&self, op: BinaryOp, lhs: f32) -> ArrayResult<Array<'d, B>> {
        let operands = if op.is_commutative() {
            OperandKind::VS
        } else {
            OperandKind::SV
        };
        let kernel = KernelId::binary(op, operands, false);
        let launch = self.elementwise(kernel, &[], &[lhs])?;
        self.launch(launch, self.shape.clone())
    }
}

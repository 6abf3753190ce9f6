//! Elementwise math functions.

use super::Array;
use crate::backend::ComputeBackend;
use crate::error::ArrayResult;
use crate::kernel::{KernelId, UnaryOp};

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $name:ident, $inplace:ident => $op:ident;)*) => {
        impl<'d, B: ComputeBackend> Array<'d, B> {
            $(
                $(#[$doc])*
                pub fn $name(&self) -> ArrayResult<Array<'d, B>> {
                    self.unary(UnaryOp::$op)
                }

                #[doc = concat!("In-place form of [`Array::", stringify!($name), "`].")]
                pub fn $inplace(&mut self) -> ArrayResult<()> {
                    self.unary_inplace(UnaryOp::$op)
                }
            )*
        }
    };
}

unary_ops! {
    abs, abs_inplace => Abs;
    /// `-1`, `0` or `1` following the sign of each element.
    sign, sign_inplace => Sign;
    sin, sin_inplace => Sin;
    cos, cos_inplace => Cos;
    tan, tan_inplace => Tan;
    asin, asin_inplace => Asin;
    acos, acos_inplace => Acos;
    atan, atan_inplace => Atan;
    sinh, sinh_inplace => Sinh;
    cosh, cosh_inplace => Cosh;
    tanh, tanh_inplace => Tanh;
    asinh, asinh_inplace => Asinh;
    acosh, acosh_inplace => Acosh;
    atanh, atanh_inplace => Atanh;
    exp, exp_inplace => Exp;
    /// Natural logarithm.
    log, log_inplace => Log;
    exp2, exp2_inplace => Exp2;
    log2, log2_inplace => Log2;
    sqrt, sqrt_inplace => Sqrt;
    /// `1 / sqrt(x)`.
    invsqrt, invsqrt_inplace => InvSqrt;
}

impl<'d, B: ComputeBackend> Array<'d, B> {
    fn unary(&self, op: UnaryOp) -> ArrayResult<Array<'d, B>> {
        let launch = self.elementwise(KernelId::unary(op, false), &[], &[])?;
        self.launch(launch, self.shape.clone())
    }

    fn unary_inplace(&mut self, op: UnaryOp) -> ArrayResult<()> {
        let launch = self.elementwise(KernelId::unary(op, true), &[], &[])?;
        self.launch_inplace(launch)
    }
}

//! Host implementations of the catalog kernels.

use alloc::vec::Vec;

use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{BinaryOp, KernelId, KernelOp, OperandKind, Params, UnaryOp};

/// Executable form of a catalog kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Program {
    Binary(BinaryOp, OperandKind),
    Unary(UnaryOp),
    Clamp(OperandKind),
    MatMul,
}

impl Program {
    pub(crate) fn for_kernel(id: &KernelId) -> ArrayResult<Self> {
        match (id.op, id.operands) {
            (
                KernelOp::Binary(op),
                kind @ (OperandKind::VV | OperandKind::VS | OperandKind::SV),
            ) => Ok(Program::Binary(op, kind)),
            (KernelOp::Unary(op), OperandKind::V) => Ok(Program::Unary(op)),
            (
                KernelOp::Clamp,
                kind @ (OperandKind::VVV | OperandKind::VSV | OperandKind::VVS | OperandKind::VSS),
            ) => Ok(Program::Clamp(kind)),
            (KernelOp::MatMul, OperandKind::VV) if !id.in_place => Ok(Program::MatMul),
            _ => Err(ArrayError::unsupported(alloc::format!(
                "host backend has no program for `{id}`"
            ))),
        }
    }

    /// Evaluates the program.
    ///
    /// `inputs` are the array operands in kernel order; the returned values
    /// are written to the result buffer.
    pub(crate) fn run(&self, inputs: &[Vec<f32>], params: &Params) -> Vec<f32> {
        match (self, params) {
            (
                Program::MatMul,
                Params::MatMul {
                    rows,
                    contraction,
                    columns,
                },
            ) => matmul(
                &inputs[0],
                &inputs[1],
                *rows as usize,
                *contraction as usize,
                *columns as usize,
            ),
            (program, params) => {
                let size = match params {
                    Params::Vector { size }
                    | Params::VectorScalar { size, .. }
                    | Params::VectorScalar2 { size, .. } => *size as usize,
                    Params::MatMul { .. } => 0,
                };
                let scalars = params.scalars();
                (0..size).map(|i| program.element(inputs, scalars, i)).collect()
            }
        }
    }

    fn element(&self, inputs: &[Vec<f32>], scalars: &[f32], i: usize) -> f32 {
        let x = inputs[0][i];
        match *self {
            Program::Binary(op, OperandKind::VV) => binary(op, x, inputs[1][i]),
            Program::Binary(op, OperandKind::SV) => binary(op, scalars[0], x),
            Program::Binary(op, _) => binary(op, x, scalars[0]),
            Program::Unary(op) => unary(op, x),
            Program::Clamp(OperandKind::VVV) => clamp(x, inputs[1][i], inputs[2][i]),
            Program::Clamp(OperandKind::VSV) => clamp(x, scalars[0], inputs[1][i]),
            Program::Clamp(OperandKind::VVS) => clamp(x, inputs[1][i], scalars[0]),
            Program::Clamp(_) => clamp(x, scalars[0], scalars[1]),
            Program::MatMul => x,
        }
    }
}

fn binary(op: BinaryOp, lhs: f32, rhs: f32) -> f32 {
    match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => lhs / rhs,
        BinaryOp::Max => lhs.max(rhs),
        BinaryOp::Min => lhs.min(rhs),
        BinaryOp::Pow => lhs.powf(rhs),
    }
}

fn unary(op: UnaryOp, x: f32) -> f32 {
    match op {
        UnaryOp::Abs => x.abs(),
        // Zero (and NaN) map to themselves, as GLSL `sign` does.
        UnaryOp::Sign => {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                x
            }
        }
        UnaryOp::Sin => x.sin(),
        UnaryOp::Cos => x.cos(),
        UnaryOp::Tan => x.tan(),
        UnaryOp::Asin => x.asin(),
        UnaryOp::Acos => x.acos(),
        UnaryOp::Atan => x.atan(),
        UnaryOp::Sinh => x.sinh(),
        UnaryOp::Cosh => x.cosh(),
        UnaryOp::Tanh => x.tanh(),
        UnaryOp::Asinh => x.asinh(),
        UnaryOp::Acosh => x.acosh(),
        UnaryOp::Atanh => x.atanh(),
        UnaryOp::Exp => x.exp(),
        UnaryOp::Log => x.ln(),
        UnaryOp::Exp2 => x.exp2(),
        UnaryOp::Log2 => x.log2(),
        UnaryOp::Sqrt => x.sqrt(),
        UnaryOp::InvSqrt => x.sqrt().recip(),
    }
}

fn clamp(x: f32, min: f32, max: f32) -> f32 {
    x.max(min).min(max)
}

/// Row-major `[rows, contraction] @ [contraction, columns]`.
fn matmul(lhs: &[f32], rhs: &[f32], rows: usize, contraction: usize, columns: usize) -> Vec<f32> {
    let mut out = alloc::vec![0.0; rows * columns];
    for r in 0..rows {
        let lhs_row = &lhs[r * contraction..(r + 1) * contraction];
        let out_row = &mut out[r * columns..(r + 1) * columns];
        for (k, &a) in lhs_row.iter().enumerate() {
            let rhs_row = &rhs[k * columns..(k + 1) * columns];
            for (o, &b) in out_row.iter_mut().zip(rhs_row) {
                *o += a * b;
            }
        }
    }
    out
}

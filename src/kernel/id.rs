//! Kernel identifiers.
//!
//! A kernel is selected by the logical operator, the kind of each operand and
//! whether the result is written back into the left operand. The identifier
//! renders to the name of the precompiled device program:
//!
//! - base operator name for the out-of-place array-array form (`add`)
//! - `i` prefix for the in-place sibling (`iadd`)
//! - `_scalar` suffix for one array plus one scalar (`add_scalar`)
//! - `r` prefix on the scalar form for scalar-op-array (`rsub_scalar`)
//! - `_sv`, `_vs`, `_ss` suffixes for clamp bounds (`iclamp_sv`)

use alloc::string::String;
use core::fmt;

/// Binary elementwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Pow,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 7] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Max,
        BinaryOp::Min,
        BinaryOp::Pow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Pow => "pow",
        }
    }

    /// Whether `a op b == b op a`.
    ///
    /// Non-commutative operators get a reversed scalar kernel.
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::Max | BinaryOp::Min
        )
    }
}

/// Unary elementwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Abs,
    Sign,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InvSqrt,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 20] = [
        UnaryOp::Abs,
        UnaryOp::Sign,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Asin,
        UnaryOp::Acos,
        UnaryOp::Atan,
        UnaryOp::Sinh,
        UnaryOp::Cosh,
        UnaryOp::Tanh,
        UnaryOp::Asinh,
        UnaryOp::Acosh,
        UnaryOp::Atanh,
        UnaryOp::Exp,
        UnaryOp::Log,
        UnaryOp::Exp2,
        UnaryOp::Log2,
        UnaryOp::Sqrt,
        UnaryOp::InvSqrt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Sign => "sign",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Asinh => "asinh",
            UnaryOp::Acosh => "acosh",
            UnaryOp::Atanh => "atanh",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Exp2 => "exp2",
            UnaryOp::Log2 => "log2",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::InvSqrt => "invsqrt",
        }
    }
}

/// Logical operator family of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KernelOp {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Clamp,
    MatMul,
}

/// Operand tag of a kernel, in the order the operands appear.
///
/// `V` is an array (vector) operand and `S` a scalar. Clamp forms list the
/// operand, then the min bound, then the max bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperandKind {
    /// Single array (unary operators).
    V,
    /// Array with array.
    VV,
    /// Array with scalar.
    VS,
    /// Scalar with array: reversed operand order.
    SV,
    /// Clamp with array bounds.
    VVV,
    /// Clamp with a scalar min and an array max.
    VSV,
    /// Clamp with an array min and a scalar max.
    VVS,
    /// Clamp with scalar bounds.
    VSS,
}

impl OperandKind {
    /// Number of array operands consumed (the written result excluded).
    pub fn arrays(&self) -> usize {
        match self {
            OperandKind::V | OperandKind::VS | OperandKind::SV | OperandKind::VSS => 1,
            OperandKind::VV | OperandKind::VSV | OperandKind::VVS => 2,
            OperandKind::VVV => 3,
        }
    }

    /// Number of scalar operands packed into the parameters.
    pub fn scalars(&self) -> usize {
        match self {
            OperandKind::V | OperandKind::VV | OperandKind::VVV => 0,
            OperandKind::VS | OperandKind::SV | OperandKind::VSV | OperandKind::VVS => 1,
            OperandKind::VSS => 2,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            OperandKind::SV => "r",
            _ => "",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            OperandKind::VS | OperandKind::SV => "_scalar",
            OperandKind::VSV => "_sv",
            OperandKind::VVS => "_vs",
            OperandKind::VSS => "_ss",
            OperandKind::V | OperandKind::VV | OperandKind::VVV => "",
        }
    }
}

/// Identifies one precompiled kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId {
    pub op: KernelOp,
    pub operands: OperandKind,
    pub in_place: bool,
}

impl KernelId {
    pub const fn new(op: KernelOp, operands: OperandKind, in_place: bool) -> Self {
        Self {
            op,
            operands,
            in_place,
        }
    }

    pub const fn binary(op: BinaryOp, operands: OperandKind, in_place: bool) -> Self {
        Self::new(KernelOp::Binary(op), operands, in_place)
    }

    pub const fn unary(op: UnaryOp, in_place: bool) -> Self {
        Self::new(KernelOp::Unary(op), OperandKind::V, in_place)
    }

    pub const fn clamp(operands: OperandKind, in_place: bool) -> Self {
        Self::new(KernelOp::Clamp, operands, in_place)
    }

    pub const fn matmul() -> Self {
        Self::new(KernelOp::MatMul, OperandKind::VV, false)
    }

    /// Number of device buffers the kernel binds: inputs, then the result
    /// unless the result overwrites the first input.
    pub fn buffer_count(&self) -> usize {
        self.operands.arrays() + usize::from(!self.in_place)
    }

    /// Name of the precompiled device program.
    pub fn name(&self) -> String {
        let base = match self.op {
            KernelOp::Binary(op) => op.name(),
            KernelOp::Unary(op) => op.name(),
            KernelOp::Clamp => "clamp",
            KernelOp::MatMul => "matmul",
        };

        let mut name = String::with_capacity(base.len() + 9);
        if self.in_place {
            name.push('i');
        }
        name.push_str(self.operands.prefix());
        name.push_str(base);
        name.push_str(self.operands.suffix());
        name
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

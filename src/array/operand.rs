use super::Array;
use crate::backend::ComputeBackend;
use crate::backend::host::HostBackend;

/// Right-hand side of an operation: another array or a scalar.
///
/// The kernel variant is picked from the operand kinds when the operation
/// is called.
pub enum Operand<'a, 'd, B: ComputeBackend = HostBackend> {
    Array(&'a Array<'d, B>),
    Scalar(f32),
}

impl<B: ComputeBackend> Operand<'_, '_, B> {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Operand::Scalar(_))
    }
}

impl<B: ComputeBackend> Clone for Operand<'_, '_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ComputeBackend> Copy for Operand<'_, '_, B> {}

impl<'a, 'd, B: ComputeBackend> From<&'a Array<'d, B>> for Operand<'a, 'd, B> {
    fn from(array: &'a Array<'d, B>) -> Self {
        Operand::Array(array)
    }
}

impl<B: ComputeBackend> From<f32> for Operand<'_, '_, B> {
    fn from(value: f32) -> Self {
        Operand::Scalar(value)
    }
}

impl<B: ComputeBackend> core::fmt::Debug for Operand<'_, '_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Operand::Array(array) => f.debug_tuple("Array").field(&array.shape()).finish(),
            Operand::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

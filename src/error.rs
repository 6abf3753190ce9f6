//! Error types for array dispatch.

use alloc::string::String;
use alloc::vec::Vec;

/// Errors that can occur while validating, dispatching or materializing arrays.
///
/// Validation errors are raised synchronously, before any submission reaches
/// the device. A kernel failing on the device surfaces as a
/// [`ArrayError::LaunchError`] from the next wait on its job or on any job
/// depending on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArrayError {
    /// Elementwise operands (or clamp bounds) do not have identical shapes.
    #[error("incompatible shapes: {lhs:?} vs {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Matmul inner dimensions differ or an operand has more than three dimensions.
    #[error("dimension mismatch for matmul: {lhs:?} @ {rhs:?}")]
    DimensionMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// An array could not be allocated from the given data/shape combination.
    #[error("invalid array construction: {message}")]
    InvalidConstruction { message: String },

    /// Reshape to a shape with a different element count.
    #[error("cannot reshape {from:?} into {to:?}")]
    InvalidReshape { from: Vec<usize>, to: Vec<usize> },

    /// Host-side element access outside of the buffer.
    #[error("index {index} out of bounds for array of {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Kernel compilation or submission failed in the backend.
    #[error("launch error: {message}")]
    LaunchError { message: String },

    /// Buffer allocation or transfer failed in the backend.
    #[error("memory error: {message}")]
    MemoryError { message: String },

    /// Unsupported kernel or parameter combination.
    #[error("unsupported operation: {message}")]
    Unsupported { message: String },
}

impl ArrayError {
    pub fn shape_mismatch(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::ShapeMismatch {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    pub fn dimension_mismatch(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::DimensionMismatch {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    pub fn construction(message: impl Into<String>) -> Self {
        Self::InvalidConstruction {
            message: message.into(),
        }
    }

    pub fn launch(message: impl Into<String>) -> Self {
        Self::LaunchError {
            message: message.into(),
        }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        Self::MemoryError {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

/// Result type for array operations.
pub type ArrayResult<T> = core::result::Result<T, ArrayError>;

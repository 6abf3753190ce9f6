use super::{Array, Shape};
use crate::backend::ComputeBackend;
use crate::device::Device;
use crate::error::{ArrayError, ArrayResult};

/// Builder for [`Array`].
///
/// With only `data`, the array is one-dimensional. With only `shape`, the
/// contents are backend-defined. With both, the element counts must agree.
pub struct ArrayBuilder<'d, 'a, B: ComputeBackend> {
    device: &'d Device<B>,
    data: Option<&'a [f32]>,
    shape: Option<&'a [usize]>,
}

impl<'d, 'a, B: ComputeBackend> ArrayBuilder<'d, 'a, B> {
    pub fn new(device: &'d Device<B>) -> Self {
        Self {
            device,
            data: None,
            shape: None,
        }
    }

    /// Initial contents, row-major.
    pub fn data(mut self, data: &'a [f32]) -> Self {
        self.data = Some(data);
        self
    }

    pub fn shape(mut self, shape: &'a [usize]) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn build(self) -> ArrayResult<Array<'d, B>> {
        let (shape, buffer) = match (self.shape, self.data) {
            (None, None) => {
                return Err(ArrayError::construction(
                    "either initial data or a shape must be provided",
                ));
            }
            (None, Some(data)) => {
                if data.is_empty() {
                    return Err(ArrayError::construction("initial data is empty"));
                }
                let shape: Shape = smallvec::smallvec![data.len()];
                (shape, self.device.copy_to_buffer(data)?)
            }
            (Some(shape), None) => {
                let len = checked_len(shape)?;
                (Shape::from_slice(shape), self.device.create_buffer(len)?)
            }
            (Some(shape), Some(data)) => {
                let len = checked_len(shape)?;
                if len != data.len() {
                    return Err(ArrayError::construction(alloc::format!(
                        "shape {shape:?} holds {len} elements but {} were given",
                        data.len()
                    )));
                }
                (Shape::from_slice(shape), self.device.copy_to_buffer(data)?)
            }
        };

        Ok(Array::from_parts(self.device, shape, buffer, None))
    }
}

/// Element count of `shape`, rejecting empty shapes and zero dimensions.
pub(super) fn checked_len(shape: &[usize]) -> ArrayResult<usize> {
    if shape.is_empty() {
        return Err(ArrayError::construction("shape has no dimensions"));
    }
    if shape.contains(&0) {
        return Err(ArrayError::construction(alloc::format!(
            "shape {shape:?} has a zero dimension"
        )));
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| ArrayError::construction(alloc::format!("shape {shape:?} overflows")))
}

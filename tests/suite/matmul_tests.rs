//! Matrix products and their shape rules.

use cubek_array::{Array, ArrayError};
use pretty_assertions::assert_eq;

use crate::{assert_close, device};

fn reference(
    lhs: &[f32],
    rhs: &[f32],
    rows: usize,
    contraction: usize,
    columns: usize,
) -> Vec<f32> {
    let mut out = vec![0.0; rows * columns];
    for r in 0..rows {
        for c in 0..columns {
            out[r * columns + c] = (0..contraction)
                .map(|k| lhs[r * contraction + k] * rhs[k * columns + c])
                .sum();
        }
    }
    out
}

#[test]
fn test_matrix_product() {
    let device = device();
    let lhs: Vec<f32> = (0..70 * 33).map(|i| ((i * 7) % 11) as f32 - 5.0).collect();
    let rhs: Vec<f32> = (0..33 * 65).map(|i| ((i * 3) % 13) as f32 * 0.5).collect();

    let a = Array::from_shape_slice(&device, &[70, 33], &lhs).unwrap();
    let b = Array::from_shape_slice(&device, &[33, 65], &rhs).unwrap();
    let c = a.matmul(&b).unwrap();

    assert_eq!(c.shape(), &[70, 65]);
    assert_close(&c.to_vec().unwrap(), &reference(&lhs, &rhs, 70, 33, 65));
}

#[test]
fn test_vector_forms() {
    let device = device();
    let v = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let m = Array::from_shape_slice(&device, &[3, 2], &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();

    let dot = v.matmul(&v).unwrap();
    assert_eq!(dot.shape(), &[1]);
    assert_eq!(dot.to_vec().unwrap(), vec![14.0]);

    let row = v.matmul(&m).unwrap();
    assert_eq!(row.shape(), &[2]);
    assert_eq!(row.to_vec().unwrap(), vec![4.0, 5.0]);
}

#[test]
fn test_batched_leading_dims() {
    let device = device();
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let a = Array::from_shape_slice(&device, &[2, 2, 2], &values).unwrap();
    let eye = Array::from_shape_slice(&device, &[2, 2], &[1.0, 0.0, 0.0, 1.0]).unwrap();

    let c = a.matmul(&eye).unwrap();
    assert_eq!(c.shape(), &[2, 2, 2]);
    assert_eq!(c.to_vec().unwrap(), a.to_vec().unwrap());
}

#[test]
fn test_matmul_after_pending_inputs() {
    let device = device();
    let a = Array::from_shape_slice(&device, &[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let doubled = a.mul(2.0_f32).unwrap();
    let c = doubled.matmul(&a).unwrap();
    assert_eq!(c.to_vec().unwrap(), vec![14.0, 20.0, 30.0, 44.0]);
}

#[test]
fn test_dimension_errors() {
    let device = device();
    let a = Array::zeros(&device, &[2, 3]).unwrap();
    let b = Array::zeros(&device, &[2, 3]).unwrap();
    let deep = Array::zeros(&device, &[1, 1, 1, 3]).unwrap();

    assert_eq!(
        a.matmul(&b).unwrap_err(),
        ArrayError::DimensionMismatch {
            lhs: vec![2, 3],
            rhs: vec![2, 3],
        }
    );
    let vector = Array::zeros(&device, &[3]).unwrap();
    assert!(matches!(
        deep.matmul(&vector),
        Err(ArrayError::DimensionMismatch { .. })
    ));
    assert_eq!(device.submissions(), 0);
}

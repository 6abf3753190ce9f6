//! Elementwise arithmetic and unary math.

use cubek_array::{Array, ArrayError};
use pretty_assertions::assert_eq;

use crate::{assert_close, device};

#[test]
fn test_add_arrays() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let b = Array::from_slice(&device, &[4.0, 5.0, 6.0]).unwrap();

    let c = a.add(&b).unwrap();
    assert_eq!(c.shape(), &[3]);
    assert_eq!(c.to_vec().unwrap(), vec![5.0, 7.0, 9.0]);
}

#[test]
fn test_sub_undoes_add() {
    let device = device();
    let data: Vec<f32> = (0..1000).map(|i| i as f32 * 0.37 - 50.0).collect();
    let other: Vec<f32> = (0..1000).map(|i| (i % 13) as f32 + 0.25).collect();
    let a = Array::from_slice(&device, &data).unwrap();
    let b = Array::from_slice(&device, &other).unwrap();

    let roundtrip = a.add(&b).unwrap().sub(&b).unwrap();
    assert_close(&roundtrip.to_vec().unwrap(), &data);
}

#[test]
fn test_scalar_and_reversed_forms() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 4.0]).unwrap();

    assert_eq!(a.sub(1.0_f32).unwrap().to_vec().unwrap(), vec![0.0, 1.0, 3.0]);
    assert_eq!(a.rsub(1.0).unwrap().to_vec().unwrap(), vec![0.0, -1.0, -3.0]);
    assert_eq!(a.div(2.0_f32).unwrap().to_vec().unwrap(), vec![0.5, 1.0, 2.0]);
    assert_eq!(a.rdiv(2.0).unwrap().to_vec().unwrap(), vec![2.0, 1.0, 0.5]);
    assert_eq!(a.radd(1.0).unwrap().to_vec().unwrap(), vec![2.0, 3.0, 5.0]);
    assert_eq!(a.min(2.0_f32).unwrap().to_vec().unwrap(), vec![1.0, 2.0, 2.0]);
}

#[test]
fn test_operators_match_methods() {
    let device = device();
    let a = Array::from_slice(&device, &[3.0, 6.0]).unwrap();
    let b = Array::from_slice(&device, &[1.5, 2.0]).unwrap();

    assert_eq!((&a - &b).to_vec().unwrap(), a.sub(&b).unwrap().to_vec().unwrap());
    assert_eq!((12.0_f32 / &a).to_vec().unwrap(), vec![4.0, 2.0]);
    assert_eq!((&a * 0.5_f32).to_vec().unwrap(), vec![1.5, 3.0]);
}

#[test]
fn test_inplace_keeps_identity() {
    let device = device();
    let mut a = Array::from_slice(&device, &[1.0, 4.0, 9.0]).unwrap();
    let b = Array::from_slice(&device, &[1.0, 1.0, 1.0]).unwrap();
    let id = a.buffer_id();

    a.sqrt_inplace().unwrap();
    a.add_inplace(&b).unwrap();
    a.pow_inplace(2.0_f32).unwrap();
    a += 1.0_f32;

    assert_eq!(a.buffer_id(), id);
    assert_close(&a.to_vec().unwrap(), &[5.0, 10.0, 17.0]);
}

#[test]
fn test_shape_mismatch_is_synchronous() {
    let device = device();
    let mut a = Array::from_shape_slice(&device, &[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let b = Array::from_slice(&device, &[1.0, 2.0, 3.0, 4.0]).unwrap();

    let err = a.add(&b).unwrap_err();
    assert_eq!(
        err,
        ArrayError::ShapeMismatch {
            lhs: vec![2, 2],
            rhs: vec![4],
        }
    );
    assert!(a.add_inplace(&b).is_err());
    assert!(a.job().is_none());
    assert_eq!(device.submissions(), 0);
}

#[test]
fn test_transcendentals() {
    let device = device();
    let x = Array::from_slice(&device, &[0.25, 0.5, 0.75]).unwrap();
    let values = [0.25_f32, 0.5, 0.75];

    let cases: [(Array, fn(f32) -> f32); 8] = [
        (x.sin().unwrap(), f32::sin),
        (x.acos().unwrap(), f32::acos),
        (x.tanh().unwrap(), f32::tanh),
        (x.atanh().unwrap(), f32::atanh),
        (x.exp().unwrap(), f32::exp),
        (x.log2().unwrap(), f32::log2),
        (x.log().unwrap(), f32::ln),
        (x.invsqrt().unwrap(), |v| 1.0 / v.sqrt()),
    ];

    for (array, f) in cases {
        let expected: Vec<f32> = values.iter().map(|&v| f(v)).collect();
        assert_close(&array.to_vec().unwrap(), &expected);
    }
}

#[test]
fn test_host_write_and_fill() {
    let device = device();
    let mut a = Array::zeros(&device, &[2, 3]).unwrap();
    a.fill(2.0).unwrap();
    a.write(4, &[7.0, 8.0]).unwrap();
    a.flush().unwrap();

    let b = a.mul(10.0_f32).unwrap();
    assert_eq!(b.to_vec().unwrap(), vec![20.0, 20.0, 20.0, 20.0, 70.0, 80.0]);
    assert_eq!(format!("{b}"), "[[20, 20, 20], [20, 70, 80]]");
}

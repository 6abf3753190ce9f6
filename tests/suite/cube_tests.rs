//! The same properties on the CubeCL backend.

use cubecl::TestRuntime;
use cubek_array::backend::cube::CubeBackend;
use cubek_array::{Array, ArrayError, Device, DeviceConfig};
use pretty_assertions::assert_eq;

use crate::assert_close;

type CubeDevice = Device<CubeBackend<TestRuntime>>;

fn cube_device() -> CubeDevice {
    let _ = env_logger::builder().is_test(true).try_init();
    Device::new(DeviceConfig::default()).unwrap()
}

#[test]
fn test_add_and_chain() {
    let device = cube_device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let b = Array::from_slice(&device, &[4.0, 5.0, 6.0]).unwrap();

    let c = a.add(&b).unwrap();
    let d = c.mul(2.0_f32).unwrap();
    assert_eq!(c.to_vec().unwrap(), vec![5.0, 7.0, 9.0]);
    assert_eq!(d.to_vec().unwrap(), vec![10.0, 14.0, 18.0]);
    assert_close(&c.sub(&b).unwrap().to_vec().unwrap(), &[1.0, 2.0, 3.0]);
}

#[test]
fn test_reversed_scalar() {
    let device = cube_device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 4.0]).unwrap();

    assert_eq!(a.rsub(1.0).unwrap().to_vec().unwrap(), vec![0.0, -1.0, -3.0]);
    assert_eq!(a.rdiv(2.0).unwrap().to_vec().unwrap(), vec![2.0, 1.0, 0.5]);
}

#[test]
fn test_inplace_binds_target_once() {
    let device = cube_device();
    let mut a = Array::from_slice(&device, &[1.0, 4.0, 9.0]).unwrap();
    let b = Array::from_slice(&device, &[1.0, 1.0, 1.0]).unwrap();
    let id = a.buffer_id();

    a.add_inplace(&b).unwrap();
    a.mul_inplace(2.0_f32).unwrap();
    a.sqrt_inplace().unwrap();
    assert_eq!(a.buffer_id(), id);
    assert_close(&a.to_vec().unwrap(), &[2.0, 10.0_f32.sqrt(), 20.0_f32.sqrt()]);
}

#[test]
fn test_clamp_bound_kinds() {
    let device = cube_device();
    let x = Array::from_slice(&device, &[-1.0, 0.5, 2.0]).unwrap();
    let zero = Array::full(&device, &[3], 0.0).unwrap();
    let one = Array::full(&device, &[3], 1.0).unwrap();
    let expected = vec![0.0, 0.5, 1.0];

    assert_eq!(x.clamp(0.0_f32, 1.0_f32).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(0.0_f32, &one).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(&zero, 1.0_f32).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(&zero, &one).unwrap().to_vec().unwrap(), expected);

    let mut y = Array::from_slice(&device, &[-1.0, 0.5, 2.0]).unwrap();
    y.clamp_inplace(0.0_f32, &one).unwrap();
    assert_eq!(y.to_vec().unwrap(), expected);
}

#[test]
fn test_inverse_trigonometry() {
    let device = cube_device();
    let values = [-1.0_f32, -0.75, -0.2, 0.0, 0.3, 0.9, 1.0];
    let x = Array::from_slice(&device, &values).unwrap();

    let asin: Vec<f32> = values.iter().map(|v| v.asin()).collect();
    let acos: Vec<f32> = values.iter().map(|v| v.acos()).collect();
    assert_close_abs(&x.asin().unwrap().to_vec().unwrap(), &asin);
    assert_close_abs(&x.acos().unwrap().to_vec().unwrap(), &acos);

    let wide = [-50.0_f32, -2.0, -1.0, 0.0, 0.5, 1.5, 1000.0];
    let y = Array::from_slice(&device, &wide).unwrap();
    let atan: Vec<f32> = wide.iter().map(|v| v.atan()).collect();
    assert_close_abs(&y.atan().unwrap().to_vec().unwrap(), &atan);
}

fn assert_close_abs(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= 1e-4, "element {i}: {a} != {e}");
    }
}

#[test]
fn test_matmul_and_errors() {
    let device = cube_device();
    let a = Array::from_shape_slice(&device, &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let b = Array::from_shape_slice(&device, &[3, 2], &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
    let b = b.unwrap();

    let c = a.matmul(&b).unwrap();
    assert_eq!(c.shape(), &[2, 2]);
    assert_eq!(c.to_vec().unwrap(), vec![58.0, 64.0, 139.0, 154.0]);

    let wrong = Array::zeros(&device, &[4, 5]).unwrap();
    assert!(matches!(
        a.matmul(&wrong),
        Err(ArrayError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_host_write_after_device_read() {
    let device = cube_device();
    let mut a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let doubled = a.mul(2.0_f32).unwrap();

    a.write(1, &[20.0, 30.0]).unwrap();
    assert_eq!(doubled.to_vec().unwrap(), vec![2.0, 4.0, 6.0]);
    assert_eq!(a.to_vec().unwrap(), vec![1.0, 20.0, 30.0]);
    assert_eq!(a.get(2).unwrap(), 30.0);
}

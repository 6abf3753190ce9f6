//! Clamp with array and scalar bounds.

use cubek_array::{Array, KernelCatalog};
use pretty_assertions::assert_eq;

use crate::device;

#[test]
fn test_every_bound_combination() {
    let device = device();
    let x = Array::from_slice(&device, &[-3.0, -0.5, 0.5, 3.0]).unwrap();
    let lo = Array::from_slice(&device, &[-1.0, 0.0, -1.0, 0.0]).unwrap();
    let hi = Array::from_slice(&device, &[1.0, 1.0, 0.0, 2.0]).unwrap();

    assert_eq!(x.clamp(&lo, &hi).unwrap().to_vec().unwrap(), vec![-1.0, 0.0, 0.0, 2.0]);
    assert_eq!(x.clamp(-2.0_f32, &hi).unwrap().to_vec().unwrap(), vec![-2.0, -0.5, 0.0, 2.0]);
    assert_eq!(x.clamp(&lo, 0.25_f32).unwrap().to_vec().unwrap(), vec![-1.0, 0.0, 0.25, 0.25]);
    assert_eq!(x.clamp(-1.0_f32, 1.0_f32).unwrap().to_vec().unwrap(), vec![-1.0, -0.5, 0.5, 1.0]);
}

#[test]
fn test_inplace_variants() {
    let device = device();
    let lo = Array::from_slice(&device, &[0.0, 0.0, 0.0]).unwrap();
    let mut x = Array::from_slice(&device, &[-1.0, 0.5, 9.0]).unwrap();
    let id = x.buffer_id();

    x.clamp_inplace(&lo, 1.0_f32).unwrap();
    assert_eq!(x.buffer_id(), id);
    assert_eq!(x.to_vec().unwrap(), vec![0.0, 0.5, 1.0]);

    x.clamp_inplace(0.75_f32, 0.8_f32).unwrap();
    assert_eq!(x.to_vec().unwrap(), vec![0.75, 0.75, 0.8]);
}

#[test]
fn test_kernel_names_per_bound_kind() {
    let device = device();
    let x = Array::from_slice(&device, &[1.0]).unwrap();
    let b = Array::from_slice(&device, &[0.0]).unwrap();

    let outputs = [
        x.clamp(&b, &b).unwrap(),
        x.clamp(0.0_f32, &b).unwrap(),
        x.clamp(&b, 0.0_f32).unwrap(),
        x.clamp(0.0_f32, 0.0_f32).unwrap(),
    ];
    let names: Vec<String> = outputs
        .iter()
        .map(|array| array.job().unwrap().kernel().name())
        .collect();

    assert_eq!(names, ["clamp", "clamp_sv", "clamp_vs", "clamp_ss"]);
    for name in &names {
        assert!(KernelCatalog::global().find(name).is_some(), "{name}");
    }
}

#[test]
fn test_bound_kinds_agree() {
    let device = device();
    let x = Array::from_slice(&device, &[-1.0, 0.5, 2.0]).unwrap();
    let zero = Array::full(&device, &[3], 0.0).unwrap();
    let one = Array::full(&device, &[3], 1.0).unwrap();
    let expected = vec![0.0, 0.5, 1.0];

    assert_eq!(x.clamp(0.0_f32, 1.0_f32).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(0.0_f32, &one).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(&zero, 1.0_f32).unwrap().to_vec().unwrap(), expected);
    assert_eq!(x.clamp(&zero, &one).unwrap().to_vec().unwrap(), expected);
}

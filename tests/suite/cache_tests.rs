//! Compiled-operation reuse across submissions.

use cubek_array::{Array, KernelCatalog};
use pretty_assertions::assert_eq;

use crate::device;

#[test]
fn test_same_signature_compiles_once() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let b = Array::from_slice(&device, &[4.0, 5.0, 6.0]).unwrap();

    let first = a.add(&b).unwrap();
    assert_eq!(device.cached_operations(), 1);
    let second = a.add(&b).unwrap();
    assert_eq!(device.cached_operations(), 1);

    assert_eq!(first.to_vec().unwrap(), second.to_vec().unwrap());
    let stats = device.cache_stats();
    assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
}

#[test]
fn test_new_size_adds_entry() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let b = Array::from_slice(&device, &[1.0, 2.0, 3.0, 4.0]).unwrap();

    a.add(&a).unwrap();
    b.add(&b).unwrap();
    assert_eq!(device.cached_operations(), 2);
}

#[test]
fn test_scalar_value_not_part_of_signature() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0]).unwrap();

    let outputs: Vec<_> = [1.0_f32, 2.0, 3.0].iter().map(|&s| a.mul(s).unwrap()).collect();
    assert_eq!(device.cached_operations(), 1);
    assert_eq!(outputs[2].to_vec().unwrap(), vec![3.0, 6.0]);
}

#[test]
fn test_inplace_and_out_of_place_are_distinct() {
    let device = device();
    let mut a = Array::from_slice(&device, &[1.0, 2.0]).unwrap();

    let _ = a.exp().unwrap();
    a.exp_inplace().unwrap();
    assert_eq!(device.cached_operations(), 2);
}

#[test]
fn test_catalog_is_complete() {
    let catalog = KernelCatalog::global();
    for name in [
        "add", "iadd", "add_scalar", "iadd_scalar", "rsub_scalar", "rdiv_scalar", "rpow_scalar",
        "ipow_scalar", "invsqrt", "iinvsqrt", "clamp", "iclamp_sv", "clamp_vs", "iclamp_ss",
        "matmul",
    ] {
        assert!(catalog.find(name).is_some(), "missing kernel `{name}`");
    }
    assert!(catalog.find("irpow_scalar").is_none());
}

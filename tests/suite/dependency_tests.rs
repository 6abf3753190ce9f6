//! Ordering between submissions and host access.

use cubek_array::kernel::{BinaryOp, DataShape, OperandKind, Params, WorkgroupDims};
use cubek_array::{Array, ArrayError, ComputeBackend, KernelId};
use pretty_assertions::assert_eq;

use crate::device;

#[test]
fn test_chained_submissions() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();
    let b = Array::from_slice(&device, &[4.0, 5.0, 6.0]).unwrap();

    let c = a.add(&b).unwrap();
    let d = c.mul(2.0_f32).unwrap();

    assert_eq!(d.to_vec().unwrap(), vec![10.0, 14.0, 18.0]);
    assert!(d.job().is_none());
}

#[test]
fn test_wait_clears_job() {
    let device = device();
    let a = Array::from_slice(&device, &[1.0; 256]).unwrap();
    let b = a.exp().unwrap();

    let job = b.job().unwrap();
    b.wait().unwrap();
    assert!(job.is_complete());
    assert!(b.job().is_none());
    assert!(b.is_ready());

    // Waiting again is a no-op.
    b.wait().unwrap();
}

#[test]
fn test_long_inplace_chain() {
    let device = device();
    let mut acc = Array::zeros(&device, &[1024]).unwrap();
    let one = Array::full(&device, &[1024], 1.0).unwrap();

    for _ in 0..200 {
        acc.add_inplace(&one).unwrap();
    }
    assert!(acc.to_vec().unwrap().iter().all(|&v| v == 200.0));
}

#[test]
fn test_write_after_read() {
    let device = device();
    let mut a = Array::from_slice(&device, &[1.0, 2.0, 3.0]).unwrap();

    let readers: Vec<_> = (0..8).map(|i| a.mul(i as f32).unwrap()).collect();
    a.add_inplace(100.0_f32).unwrap();

    for (i, reader) in readers.iter().enumerate() {
        let k = i as f32;
        assert_eq!(reader.to_vec().unwrap(), vec![k, 2.0 * k, 3.0 * k]);
    }
    assert_eq!(a.to_vec().unwrap(), vec![101.0, 102.0, 103.0]);
}

#[test]
fn test_host_write_waits_for_readers() {
    let device = device();
    let mut a = Array::from_slice(&device, &[1.0, 2.0]).unwrap();
    let b = Array::from_slice(&device, &[10.0, 20.0]).unwrap();

    let sum = a.add(&b).unwrap();
    a.write(0, &[-1.0, -2.0]).unwrap();

    assert_eq!(sum.to_vec().unwrap(), vec![11.0, 22.0]);
    assert_eq!(a.to_vec().unwrap(), vec![-1.0, -2.0]);
}

#[test]
fn test_intermediate_dropped_before_completion() {
    let device = device();
    let a = Array::from_slice(&device, &[2.0, 4.0]).unwrap();

    let result = {
        let tmp = a.mul(3.0_f32).unwrap();
        tmp.sub(1.0_f32).unwrap()
    };
    assert_eq!(result.to_vec().unwrap(), vec![5.0, 11.0]);
}

#[test]
fn test_wait_all() {
    let device = device();
    let a = Array::from_slice(&device, &[0.5; 64]).unwrap();
    let outputs: Vec<_> = (0..16).map(|_| a.cos().unwrap()).collect();

    device.wait_all().unwrap();
    for output in &outputs {
        assert!(output.job().is_none_or(|job| job.is_complete()));
    }
}

#[test]
fn test_shared_device_across_threads() {
    let device = device();
    let results: Vec<Vec<f32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let device = &device;
                scope.spawn(move || {
                    let a = Array::from_slice(device, &[t as f32; 8]).unwrap();
                    a.add(1.0_f32).unwrap().to_vec().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (t, values) in results.iter().enumerate() {
        assert_eq!(values, &vec![t as f32 + 1.0; 8]);
    }
}

#[test]
fn test_device_failure_propagates_to_dependents() {
    let device = device();
    let short = device.copy_to_buffer(&[1.0, 2.0]).unwrap();
    let out = device.copy_to_buffer(&[-7.0, -7.0]).unwrap();

    // The launch covers more elements than the buffers hold.
    let add = device
        .submit(
            KernelId::binary(BinaryOp::Add, OperandKind::VV, false),
            WorkgroupDims::elementwise(),
            &[&short, &short, &out],
            DataShape::new(4, 1, 1),
            Params::Vector { size: 4 },
            &[],
        )
        .unwrap();
    let scale = device
        .submit(
            KernelId::binary(BinaryOp::Mul, OperandKind::VS, true),
            WorkgroupDims::elementwise(),
            &[&out],
            DataShape::new(2, 1, 1),
            Params::VectorScalar {
                size: 2,
                scalar: 2.0,
            },
            &[&add],
        )
        .unwrap();

    assert!(matches!(add.wait(), Err(ArrayError::LaunchError { .. })));
    assert!(matches!(scale.wait(), Err(ArrayError::LaunchError { .. })));
    // Waiting again still reports the failure.
    assert!(add.wait().is_err());
    assert_eq!(device.backend().read_buffer(&out).unwrap(), vec![-7.0, -7.0]);
}

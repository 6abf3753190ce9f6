//! Integration tests against the host backend, and the CubeCL backend when
//! the `cubecl` feature is enabled.

mod arithmetic_tests;
mod cache_tests;
mod clamp_tests;
#[cfg(feature = "cubecl")]
mod cube_tests;
mod dependency_tests;
mod matmul_tests;

use cubek_array::{Device, DeviceConfig};

pub fn device() -> Device {
    let _ = env_logger::builder().is_test(true).try_init();
    Device::new(DeviceConfig::default().with_workers(4)).unwrap()
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "length differs");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= 1e-5 * e.abs().max(1.0), "element {i}: {a} != {e}");
    }
}

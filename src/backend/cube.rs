//! CubeCL backend.
//!
//! Kernels are launched on the runtime's default client. A client executes
//! submissions in order, so wait signals are satisfied by submission order and
//! carry only the submission sequence number.
//!
//! In-place kernels bind their target once, as the only mutable array, rather
//! than aliasing one handle as both input and output. Scalar clamp bounds bind
//! a one-element placeholder in the unused array slot.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cubecl::Runtime;
use cubecl::client::ComputeClient;
use cubecl::prelude::*;
use cubecl::server::Handle;

use super::{BackendJob, BufferRange, ComputeBackend, DeviceBuffer, out_of_range};
use crate::device::DeviceConfig;
use crate::error::{ArrayError, ArrayResult};
use crate::kernel::{
    BinaryOp, DataShape, KernelOp, KernelSpec, OperandKind, ParamShape, Params, UnaryOp,
    WorkgroupDims,
};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// Block size of the host-to-device copy kernel.
const COPY_BLOCK: u32 = 256;

/// Device buffer owned by a CubeCL client.
#[derive(Clone)]
pub struct CubeBuffer {
    id: u64,
    len: usize,
    handle: Handle,
}

impl DeviceBuffer for CubeBuffer {
    fn id(&self) -> u64 {
        self.id
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Kernel family of a compiled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CubeProgram {
    Binary(BinaryOp, OperandKind),
    Unary(UnaryOp),
    Clamp(OperandKind),
    MatMul,
}

#[derive(Debug)]
pub struct CubeOperation {
    program: CubeProgram,
    in_place: bool,
    workgroup: WorkgroupDims,
}

/// Handle to a submission on a CubeCL client.
pub struct CubeJob<R: Runtime> {
    sequence: u64,
    client: ComputeClient<R>,
    complete: Arc<AtomicBool>,
}

impl<R: Runtime> BackendJob for CubeJob<R> {
    type Signal = u64;

    fn signal(&self) -> u64 {
        self.sequence
    }

    fn wait(&self) -> ArrayResult<()> {
        if !self.complete.load(Ordering::Acquire) {
            cubecl::future::block_on(self.client.sync());
            self.complete.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

/// Backend running kernels through a CubeCL runtime.
pub struct CubeBackend<R: Runtime> {
    client: ComputeClient<R>,
    placeholder: CubeBuffer,
    next_submission: AtomicU64,
    _runtime: PhantomData<R>,
}

impl<R: Runtime> CubeBackend<R> {
    pub fn client(&self) -> &ComputeClient<R> {
        &self.client
    }

    fn buffer(&self, handle: Handle, len: usize) -> CubeBuffer {
        CubeBuffer {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            len,
            handle,
        }
    }
}

fn arg<R: Runtime>(buffer: &CubeBuffer) -> ArrayArg<'_, R> {
    unsafe { ArrayArg::from_raw_parts::<f32>(&buffer.handle, buffer.len, 1) }
}

fn launch_failed(kernel: &str, err: impl core::fmt::Debug) -> ArrayError {
    ArrayError::launch(alloc::format!("{kernel} kernel failed: {err:?}"))
}

impl<R: Runtime> ComputeBackend for CubeBackend<R> {
    type Buffer = CubeBuffer;
    type Operation = CubeOperation;
    type Signal = u64;
    type Job = CubeJob<R>;

    fn create(config: &DeviceConfig) -> ArrayResult<Self> {
        if config.index != 0 {
            log::warn!(
                "CubeCL backend ignores device index {}, using the default device",
                config.index
            );
        }
        let client = R::client(&Default::default());
        let placeholder = CubeBuffer {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            len: 1,
            handle: client.create(f32::as_bytes(&[0.0])),
        };
        Ok(Self {
            client,
            placeholder,
            next_submission: AtomicU64::new(0),
            _runtime: PhantomData,
        })
    }

    fn name(&self) -> &'static str {
        "cubecl"
    }

    fn create_buffer(&self, len: usize) -> ArrayResult<CubeBuffer> {
        let handle = self.client.empty(len * core::mem::size_of::<f32>());
        Ok(self.buffer(handle, len))
    }

    fn copy_to_buffer(&self, data: &[f32]) -> ArrayResult<CubeBuffer> {
        let handle = self.client.create(f32::as_bytes(data));
        Ok(self.buffer(handle, data.len()))
    }

    fn read_buffer(&self, buffer: &CubeBuffer) -> ArrayResult<Vec<f32>> {
        let bytes = self.client.read_one(buffer.handle.clone().binding());
        Ok(f32::from_bytes(&bytes).to_vec())
    }

    fn write_buffer(&self, buffer: &CubeBuffer, offset: usize, data: &[f32]) -> ArrayResult<()> {
        if offset.checked_add(data.len()).is_none_or(|end| end > buffer.len) {
            return Err(out_of_range(offset, data.len(), buffer.len));
        }
        if data.is_empty() {
            return Ok(());
        }

        let staging = self.copy_to_buffer(data)?;
        let count = data.len() as u32;
        unsafe {
            copy_into_kernel::launch_unchecked::<R>(
                &self.client,
                CubeCount::Static(count.div_ceil(COPY_BLOCK), 1, 1),
                CubeDim {
                    x: COPY_BLOCK,
                    y: 1,
                    z: 1,
                },
                arg(&staging),
                arg(buffer),
                ScalarArg::new(offset as u32),
                ScalarArg::new(count),
            )
            .map_err(|err| launch_failed("copy", err))
        }
    }

    fn compile(
        &self,
        kernel: &KernelSpec,
        buffer_count: usize,
        params: ParamShape,
        workgroup: WorkgroupDims,
    ) -> ArrayResult<CubeOperation> {
        if buffer_count != kernel.buffer_count || params.packing != kernel.packing {
            return Err(ArrayError::launch(alloc::format!(
                "`{}` expects {} buffers with {:?} params",
                kernel.name,
                kernel.buffer_count,
                kernel.packing
            )));
        }

        let id = kernel.id;
        let program = match id.op {
            KernelOp::Binary(op) => CubeProgram::Binary(op, id.operands),
            KernelOp::Unary(op) => CubeProgram::Unary(op),
            KernelOp::Clamp => CubeProgram::Clamp(id.operands),
            KernelOp::MatMul => CubeProgram::MatMul,
        };

        log::debug!("prepared CubeCL program for `{}`", kernel.name);
        Ok(CubeOperation {
            program,
            in_place: id.in_place,
            workgroup,
        })
    }

    fn submit(
        &self,
        operation: &CubeOperation,
        buffers: &[&CubeBuffer],
        shape: DataShape,
        params: Params,
        _wait: &[u64],
    ) -> ArrayResult<CubeJob<R>> {
        let wg = operation.workgroup;
        let (x, y, z) = shape.group_count(wg);
        let count = CubeCount::Static(x, y, z);
        let dim = CubeDim {
            x: wg.x,
            y: wg.y,
            z: wg.z,
        };
        let scalars = params.scalars();
        let scalar = |i: usize| ScalarArg::new(scalars.get(i).copied().unwrap_or(0.0));
        let size = match params {
            Params::Vector { size }
            | Params::VectorScalar { size, .. }
            | Params::VectorScalar2 { size, .. } => size,
            Params::MatMul { .. } => 0,
        };
        let size = ScalarArg::new(size);

        let (Some(&target), Some(&last)) = (buffers.first(), buffers.last()) else {
            return Err(ArrayError::launch("submission without buffers"));
        };
        let operand = |i: usize| {
            buffers
                .get(i)
                .copied()
                .ok_or_else(|| ArrayError::launch(alloc::format!("missing buffer {i}")))
        };
        let client = &self.client;

        let result = match (operation.program, operation.in_place) {
            (CubeProgram::Binary(op, OperandKind::VV), false) => unsafe {
                binary_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    arg(operand(1)?),
                    arg(last),
                    size,
                    op,
                )
            },
            (CubeProgram::Binary(op, OperandKind::VV), true) => unsafe {
                binary_inplace_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    arg(operand(1)?),
                    size,
                    op,
                )
            },
            (CubeProgram::Binary(op, kind), false) => unsafe {
                binary_scalar_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    arg(last),
                    size,
                    scalar(0),
                    op,
                    kind == OperandKind::SV,
                )
            },
            (CubeProgram::Binary(op, kind), true) => unsafe {
                binary_scalar_inplace_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    size,
                    scalar(0),
                    op,
                    kind == OperandKind::SV,
                )
            },
            (CubeProgram::Unary(op), false) => unsafe {
                unary_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    arg(last),
                    size,
                    op,
                )
            },
            (CubeProgram::Unary(op), true) => unsafe {
                unary_inplace_kernel::launch_unchecked::<R>(
                    client,
                    count,
                    dim,
                    arg(target),
                    size,
                    op,
                )
            },
            (CubeProgram::Clamp(kind), in_place) => {
                let placeholder = &self.placeholder;
                let (lo, hi) = match kind {
                    OperandKind::VVV => (operand(1)?, operand(2)?),
                    OperandKind::VSV => (placeholder, operand(1)?),
                    OperandKind::VVS => (operand(1)?, placeholder),
                    _ => (placeholder, placeholder),
                };
                let (lo_value, hi_value) = match kind {
                    OperandKind::VSV | OperandKind::VVS => (scalar(0), scalar(0)),
                    _ => (scalar(0), scalar(1)),
                };
                let lo_scalar = matches!(kind, OperandKind::VSV | OperandKind::VSS);
                let hi_scalar = matches!(kind, OperandKind::VVS | OperandKind::VSS);

                if in_place {
                    unsafe {
                        clamp_inplace_kernel::launch_unchecked::<R>(
                            client,
                            count,
                            dim,
                            arg(target),
                            arg(lo),
                            arg(hi),
                            size,
                            lo_value,
                            hi_value,
                            lo_scalar,
                            hi_scalar,
                        )
                    }
                } else {
                    unsafe {
                        clamp_kernel::launch_unchecked::<R>(
                            client,
                            count,
                            dim,
                            arg(target),
                            arg(lo),
                            arg(hi),
                            arg(last),
                            size,
                            lo_value,
                            hi_value,
                            lo_scalar,
                            hi_scalar,
                        )
                    }
                }
            }
            (CubeProgram::MatMul, _) => {
                let Params::MatMul {
                    rows,
                    contraction,
                    columns,
                } = params
                else {
                    return Err(ArrayError::launch("matmul submitted without matmul params"));
                };
                unsafe {
                    matmul_kernel::launch_unchecked::<R>(
                        client,
                        count,
                        dim,
                        arg(target),
                        arg(operand(1)?),
                        arg(last),
                        ScalarArg::new(rows),
                        ScalarArg::new(contraction),
                        ScalarArg::new(columns),
                    )
                }
            }
        };
        result.map_err(|err| launch_failed("array", err))?;

        Ok(CubeJob {
            sequence: self.next_submission.fetch_add(1, Ordering::Relaxed),
            client: self.client.clone(),
            complete: Arc::new(AtomicBool::new(false)),
        })
    }

    fn flush(&self, ranges: &[BufferRange<'_, CubeBuffer>]) -> ArrayResult<()> {
        log::trace!("flush of {} ranges is implicit on CubeCL", ranges.len());
        Ok(())
    }

    fn wait_all(&self) -> ArrayResult<()> {
        cubecl::future::block_on(self.client.sync());
        Ok(())
    }
}

#[cube(launch_unchecked)]
fn copy_into_kernel(source: &Array<f32>, target: &mut Array<f32>, offset: u32, count: u32) {
    if ABSOLUTE_POS < count {
        target[ABSOLUTE_POS + offset] = source[ABSOLUTE_POS];
    }
}

#[cube]
fn apply_binary(lhs: f32, rhs: f32, #[comptime] op: BinaryOp) -> f32 {
    let mut out = lhs;
    if comptime!(op == BinaryOp::Add) {
        out = lhs + rhs;
    }
    if comptime!(op == BinaryOp::Sub) {
        out = lhs - rhs;
    }
    if comptime!(op == BinaryOp::Mul) {
        out = lhs * rhs;
    }
    if comptime!(op == BinaryOp::Div) {
        out = lhs / rhs;
    }
    if comptime!(op == BinaryOp::Max) {
        out = f32::max(lhs, rhs);
    }
    if comptime!(op == BinaryOp::Min) {
        out = f32::min(lhs, rhs);
    }
    if comptime!(op == BinaryOp::Pow) {
        out = f32::powf(lhs, rhs);
    }
    out
}

/// Arctangent from a minimax polynomial on [0, 1], reflected through
/// `atan(x) = pi/2 - atan(1/x)` above 1. Absolute error stays below 1e-5.
#[cube]
fn atan_approx(x: f32) -> f32 {
    let ax = f32::abs(x);
    let inverted = ax > 1.0;
    let t = select(inverted, 1.0 / ax, ax);
    let t2 = t * t;
    let mut poly = -0.011_721_2 * t2 + 0.052_653_32;
    poly = poly * t2 - 0.116_432_87;
    poly = poly * t2 + 0.193_543_46;
    poly = poly * t2 - 0.332_623_47;
    poly = poly * t2 + 0.999_977_26;
    poly *= t;
    let r = select(inverted, 1.570_796_3 - poly, poly);
    select(x < 0.0, -r, r)
}

/// `asin(x) = atan(x / sqrt(1 - x^2))`; the division reaches infinity at
/// `|x| = 1`, which the reflection in [`atan_approx`] maps to `pi/2`.
#[cube]
fn asin_approx(x: f32) -> f32 {
    atan_approx(x / f32::sqrt(1.0 - x * x))
}

#[cube]
fn apply_unary(x: f32, #[comptime] op: UnaryOp) -> f32 {
    let mut out = x;
    if comptime!(op == UnaryOp::Abs) {
        out = f32::abs(x);
    }
    if comptime!(op == UnaryOp::Sign) {
        out = select(x > 0.0, 1.0, select(x < 0.0, -1.0, x));
    }
    if comptime!(op == UnaryOp::Sin) {
        out = f32::sin(x);
    }
    if comptime!(op == UnaryOp::Cos) {
        out = f32::cos(x);
    }
    if comptime!(op == UnaryOp::Tan) {
        out = f32::sin(x) / f32::cos(x);
    }
    if comptime!(op == UnaryOp::Asin) {
        out = asin_approx(x);
    }
    if comptime!(op == UnaryOp::Acos) {
        out = 1.570_796_3 - asin_approx(x);
    }
    if comptime!(op == UnaryOp::Atan) {
        out = atan_approx(x);
    }
    if comptime!(op == UnaryOp::Sinh) {
        out = (f32::exp(x) - f32::exp(-x)) * 0.5;
    }
    if comptime!(op == UnaryOp::Cosh) {
        out = (f32::exp(x) + f32::exp(-x)) * 0.5;
    }
    if comptime!(op == UnaryOp::Tanh) {
        out = f32::tanh(x);
    }
    if comptime!(op == UnaryOp::Asinh) {
        out = f32::log(x + f32::sqrt(x * x + 1.0));
    }
    if comptime!(op == UnaryOp::Acosh) {
        out = f32::log(x + f32::sqrt(x * x - 1.0));
    }
    if comptime!(op == UnaryOp::Atanh) {
        out = f32::log((1.0 + x) / (1.0 - x)) * 0.5;
    }
    if comptime!(op == UnaryOp::Exp) {
        out = f32::exp(x);
    }
    if comptime!(op == UnaryOp::Log) {
        out = f32::log(x);
    }
    if comptime!(op == UnaryOp::Exp2) {
        out = f32::powf(2.0, x);
    }
    if comptime!(op == UnaryOp::Log2) {
        out = f32::log(x) * 1.442_695_f32;
    }
    if comptime!(op == UnaryOp::Sqrt) {
        out = f32::sqrt(x);
    }
    if comptime!(op == UnaryOp::InvSqrt) {
        out = 1.0 / f32::sqrt(x);
    }
    out
}

#[cube(launch_unchecked)]
fn binary_kernel(
    lhs: &Array<f32>,
    rhs: &Array<f32>,
    output: &mut Array<f32>,
    size: u32,
    #[comptime] op: BinaryOp,
) {
    if ABSOLUTE_POS < size {
        output[ABSOLUTE_POS] = apply_binary(lhs[ABSOLUTE_POS], rhs[ABSOLUTE_POS], op);
    }
}

#[cube(launch_unchecked)]
fn binary_inplace_kernel(
    target: &mut Array<f32>,
    rhs: &Array<f32>,
    size: u32,
    #[comptime] op: BinaryOp,
) {
    if ABSOLUTE_POS < size {
        target[ABSOLUTE_POS] = apply_binary(target[ABSOLUTE_POS], rhs[ABSOLUTE_POS], op);
    }
}

#[cube(launch_unchecked)]
fn binary_scalar_kernel(
    input: &Array<f32>,
    output: &mut Array<f32>,
    size: u32,
    scalar: f32,
    #[comptime] op: BinaryOp,
    #[comptime] reversed: bool,
) {
    if ABSOLUTE_POS < size {
        let x = input[ABSOLUTE_POS];
        if comptime!(reversed) {
            output[ABSOLUTE_POS] = apply_binary(scalar, x, op);
        } else {
            output[ABSOLUTE_POS] = apply_binary(x, scalar, op);
        }
    }
}

#[cube(launch_unchecked)]
fn binary_scalar_inplace_kernel(
    target: &mut Array<f32>,
    size: u32,
    scalar: f32,
    #[comptime] op: BinaryOp,
    #[comptime] reversed: bool,
) {
    if ABSOLUTE_POS < size {
        let x = target[ABSOLUTE_POS];
        if comptime!(reversed) {
            target[ABSOLUTE_POS] = apply_binary(scalar, x, op);
        } else {
            target[ABSOLUTE_POS] = apply_binary(x, scalar, op);
        }
    }
}

#[cube(launch_unchecked)]
fn unary_kernel(input: &Array<f32>, output: &mut Array<f32>, size: u32, #[comptime] op: UnaryOp) {
    if ABSOLUTE_POS < size {
        output[ABSOLUTE_POS] = apply_unary(input[ABSOLUTE_POS], op);
    }
}

#[cube(launch_unchecked)]
fn unary_inplace_kernel(target: &mut Array<f32>, size: u32, #[comptime] op: UnaryOp) {
    if ABSOLUTE_POS < size {
        target[ABSOLUTE_POS] = apply_unary(target[ABSOLUTE_POS], op);
    }
}

#[cube(launch_unchecked)]
fn clamp_kernel(
    input: &Array<f32>,
    lo: &Array<f32>,
    hi: &Array<f32>,
    output: &mut Array<f32>,
    size: u32,
    lo_value: f32,
    hi_value: f32,
    #[comptime] lo_scalar: bool,
    #[comptime] hi_scalar: bool,
) {
    if ABSOLUTE_POS < size {
        let mut min = lo_value;
        let mut max = hi_value;
        if comptime!(!lo_scalar) {
            min = lo[ABSOLUTE_POS];
        }
        if comptime!(!hi_scalar) {
            max = hi[ABSOLUTE_POS];
        }
        output[ABSOLUTE_POS] = f32::min(f32::max(input[ABSOLUTE_POS], min), max);
    }
}

#[cube(launch_unchecked)]
fn clamp_inplace_kernel(
    target: &mut Array<f32>,
    lo: &Array<f32>,
    hi: &Array<f32>,
    size: u32,
    lo_value: f32,
    hi_value: f32,
    #[comptime] lo_scalar: bool,
    #[comptime] hi_scalar: bool,
) {
    if ABSOLUTE_POS < size {
        let mut min = lo_value;
        let mut max = hi_value;
        if comptime!(!lo_scalar) {
            min = lo[ABSOLUTE_POS];
        }
        if comptime!(!hi_scalar) {
            max = hi[ABSOLUTE_POS];
        }
        target[ABSOLUTE_POS] = f32::min(f32::max(target[ABSOLUTE_POS], min), max);
    }
}

/// Row-major product. x spans rows, y spans columns.
#[cube(launch_unchecked)]
fn matmul_kernel(
    lhs: &Array<f32>,
    rhs: &Array<f32>,
    output: &mut Array<f32>,
    rows: u32,
    contraction: u32,
    columns: u32,
) {
    let row = ABSOLUTE_POS_X;
    let column = ABSOLUTE_POS_Y;
    if row < rows && column < columns {
        let mut sum = 0.0f32;
        for k in 0..contraction {
            sum += lhs[row * contraction + k] * rhs[k * columns + column];
        }
        output[row * columns + column] = sum;
    }
}

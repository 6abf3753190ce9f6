//! Operator overloads.
//!
//! Operators forward to the fallible methods and panic on error. Use the
//! methods directly to handle shape mismatches.

use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use super::Array;
use crate::backend::ComputeBackend;
use crate::error::ArrayResult;

#[track_caller]
fn expect_op<T>(op: &str, result: ArrayResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("array `{op}` failed: {err}"),
    }
}

macro_rules! binary_operator {
    (
        $trait:ident, $fn:ident, $method:ident, $reversed:ident,
        $assign_trait:ident, $assign_fn:ident, $inplace:ident, $symbol:literal
    ) => {
        /// # Panics
        ///
        /// If the shapes differ or the submission fails.
        impl<'d, B: ComputeBackend> $trait<&Array<'d, B>> for &Array<'d, B> {
            type Output = Array<'d, B>;

            #[track_caller]
            fn $fn(self, rhs: &Array<'d, B>) -> Array<'d, B> {
                expect_op($symbol, Array::$method(self, rhs))
            }
        }

        /// # Panics
        ///
        /// If the submission fails.
        impl<'d, B: ComputeBackend> $trait<f32> for &Array<'d, B> {
            type Output = Array<'d, B>;

            #[track_caller]
            fn $fn(self, rhs: f32) -> Array<'d, B> {
                expect_op($symbol, Array::$method(self, rhs))
            }
        }

        /// # Panics
        ///
        /// If the submission fails.
        impl<'d, B: ComputeBackend> $trait<&Array<'d, B>> for f32 {
            type Output = Array<'d, B>;

            #[track_caller]
            fn $fn(self, rhs: &Array<'d, B>) -> Array<'d, B> {
                expect_op($symbol, rhs.$reversed(self))
            }
        }

        /// # Panics
        ///
        /// If the shapes differ or the submission fails.
        impl<'d, B: ComputeBackend> $assign_trait<&Array<'d, B>> for Array<'d, B> {
            #[track_caller]
            fn $assign_fn(&mut self, rhs: &Array<'d, B>) {
                expect_op($symbol, self.$inplace(rhs))
            }
        }

        /// # Panics
        ///
        /// If the submission fails.
        impl<'d, B: ComputeBackend> $assign_trait<f32> for Array<'d, B> {
            #[track_caller]
            fn $assign_fn(&mut self, rhs: f32) {
                expect_op($symbol, self.$inplace(rhs))
            }
        }
    };
}

binary_operator!(Add, add, add, radd, AddAssign, add_assign, add_inplace, "+");
binary_operator!(Sub, sub, sub, rsub, SubAssign, sub_assign, sub_inplace, "-");
binary_operator!(Mul, mul, mul, rmul, MulAssign, mul_assign, mul_inplace, "*");
binary_operator!(Div, div, div, rdiv, DivAssign, div_assign, div_inplace, "/");

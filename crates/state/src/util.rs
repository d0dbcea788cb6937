// This code is part of Qiskit.
//
// (C) Copyright IBM 2025
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use num_complex::{Complex, Complex64};

/// Create a new [`Complex<f64>`] with arguments that can convert [`Into<f64>`].
///
/// The two parameters are independently generic, so calls such as `c64(half_theta.cos(), 0)`
/// that mix floats and integers are accepted.
#[inline]
pub fn c64<T: Into<f64>, V: Into<f64>>(re: T, im: V) -> Complex64 {
    Complex::new(re.into(), im.into())
}

/// Create a new [`Complex<f64>`] with arguments that can be converted to `f64` via `as`.
///
/// Usable in `static` and `const` items.
#[macro_export]
macro_rules! c64 {
    ($re: expr, $im: expr $(,)*) => {
        ::num_complex::Complex64::new($re as f64, $im as f64)
    };
}

/// Row-major 2x2 complex matrix of a single-qubit operator.
pub type GateArray1Q = [[Complex64; 2]; 2];

pub const C_ZERO: Complex64 = c64!(0, 0);
pub const C_ONE: Complex64 = c64!(1, 0);
pub const C_M_ONE: Complex64 = c64!(-1, 0);
pub const IM: Complex64 = c64!(0, 1);
pub const M_IM: Complex64 = c64!(0, -1);

/// Amplitudes with a squared norm below this are treated as zero.
pub const NORM_EPSILON: f64 = 1e-12;

/// Largest infidelity tolerated between a state and its factorisation into a product.
pub const SEPARABILITY_EPSILON: f64 = 1e-6;

/// Mask with the lowest `length` bits set.
#[inline]
pub fn low_mask(length: usize) -> usize {
    if length >= usize::BITS as usize {
        usize::MAX
    } else {
        (1_usize << length) - 1
    }
}

/// Mask selecting the bit positions `start..start + length` of a basis index.
#[inline]
pub fn register_mask(start: usize, length: usize) -> usize {
    low_mask(length) << start
}

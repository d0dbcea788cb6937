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

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;

use crate::util::{c64, GateArray1Q, C_M_ONE, C_ONE, C_ZERO, IM, M_IM};

pub static H_GATE: GateArray1Q = [
    [
        Complex64::new(FRAC_1_SQRT_2, 0.),
        Complex64::new(FRAC_1_SQRT_2, 0.),
    ],
    [
        Complex64::new(FRAC_1_SQRT_2, 0.),
        Complex64::new(-FRAC_1_SQRT_2, 0.),
    ],
];

pub static X_GATE: GateArray1Q = [[C_ZERO, C_ONE], [C_ONE, C_ZERO]];

pub static Y_GATE: GateArray1Q = [[C_ZERO, M_IM], [IM, C_ZERO]];

pub static Z_GATE: GateArray1Q = [[C_ONE, C_ZERO], [C_ZERO, C_M_ONE]];

/// Phase shift about the |1> state by half the given angle, `diag(1, e^{i theta / 2})`.
#[inline]
pub fn rt_gate(theta: f64) -> GateArray1Q {
    [[C_ONE, C_ZERO], [C_ZERO, c64(0., theta / 2.).exp()]]
}

#[inline]
pub fn rx_gate(theta: f64) -> GateArray1Q {
    let half_theta = theta / 2.;
    let cos = c64(half_theta.cos(), 0.);
    let isin = c64(0., -half_theta.sin());
    [[cos, isin], [isin, cos]]
}

#[inline]
pub fn ry_gate(theta: f64) -> GateArray1Q {
    let half_theta = theta / 2.;
    let cos = c64(half_theta.cos(), 0.);
    let sin = c64(half_theta.sin(), 0.);
    [[cos, -sin], [sin, cos]]
}

#[inline]
pub fn rz_gate(theta: f64) -> GateArray1Q {
    let ilam2 = c64(0., 0.5 * theta);
    [[(-ilam2).exp(), C_ZERO], [C_ZERO, ilam2.exp()]]
}

/// Convert a dyadic fraction `numerator / denominator` into the rotation angle used by the
/// `*_dyad` family of gates.
#[inline]
pub fn dyad_angle(numerator: i32, denominator: i32) -> f64 {
    (-PI * f64::from(numerator) * 2.) / f64::from(denominator)
}

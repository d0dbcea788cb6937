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

use crate::gate_matrix::{rt_gate, rx_gate, ry_gate, rz_gate, H_GATE, X_GATE, Y_GATE, Z_GATE};
use crate::util::GateArray1Q;

/// The gates a coherent unit knows how to apply.
///
/// Every gate other than [Gate::Swap] is a (possibly controlled) single-qubit operator.  The qubit
/// arguments of a controlled gate list the controls first and the target last.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gate {
    H,
    X,
    Y,
    Z,
    RT(f64),
    RX(f64),
    RY(f64),
    RZ(f64),
    CNOT,
    /// CNOT that fires when the control is |0>.
    AntiCNOT,
    CY,
    CZ,
    CRT(f64),
    CRY(f64),
    CRZ(f64),
    CCNOT,
    /// Toffoli that fires when both controls are |0>.
    AntiCCNOT,
    Swap,
}

/// How a [Gate] decomposes: the number of leading control qubits, whether they trigger on |0>,
/// and the operator applied to the target.
#[derive(Clone, Copy, Debug)]
pub struct ControlledMatrix {
    pub num_controls: usize,
    pub anti: bool,
    pub matrix: GateArray1Q,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::H => "h",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::RT(_) => "rt",
            Gate::RX(_) => "rx",
            Gate::RY(_) => "ry",
            Gate::RZ(_) => "rz",
            Gate::CNOT => "cnot",
            Gate::AntiCNOT => "anti_cnot",
            Gate::CY => "cy",
            Gate::CZ => "cz",
            Gate::CRT(_) => "crt",
            Gate::CRY(_) => "cry",
            Gate::CRZ(_) => "crz",
            Gate::CCNOT => "ccnot",
            Gate::AntiCCNOT => "anti_ccnot",
            Gate::Swap => "swap",
        }
    }

    pub fn num_qubits(&self) -> usize {
        match self {
            Gate::H
            | Gate::X
            | Gate::Y
            | Gate::Z
            | Gate::RT(_)
            | Gate::RX(_)
            | Gate::RY(_)
            | Gate::RZ(_) => 1,
            Gate::CNOT
            | Gate::AntiCNOT
            | Gate::CY
            | Gate::CZ
            | Gate::CRT(_)
            | Gate::CRY(_)
            | Gate::CRZ(_)
            | Gate::Swap => 2,
            Gate::CCNOT | Gate::AntiCCNOT => 3,
        }
    }

    /// The controlled single-qubit form of the gate, or `None` for [Gate::Swap].
    pub fn controlled_matrix(&self) -> Option<ControlledMatrix> {
        let (num_controls, anti, matrix) = match *self {
            Gate::H => (0, false, H_GATE),
            Gate::X => (0, false, X_GATE),
            Gate::Y => (0, false, Y_GATE),
            Gate::Z => (0, false, Z_GATE),
            Gate::RT(theta) => (0, false, rt_gate(theta)),
            Gate::RX(theta) => (0, false, rx_gate(theta)),
            Gate::RY(theta) => (0, false, ry_gate(theta)),
            Gate::RZ(theta) => (0, false, rz_gate(theta)),
            Gate::CNOT => (1, false, X_GATE),
            Gate::AntiCNOT => (1, true, X_GATE),
            Gate::CY => (1, false, Y_GATE),
            Gate::CZ => (1, false, Z_GATE),
            Gate::CRT(theta) => (1, false, rt_gate(theta)),
            Gate::CRY(theta) => (1, false, ry_gate(theta)),
            Gate::CRZ(theta) => (1, false, rz_gate(theta)),
            Gate::CCNOT => (2, false, X_GATE),
            Gate::AntiCCNOT => (2, true, X_GATE),
            Gate::Swap => return None,
        };
        Some(ControlledMatrix {
            num_controls,
            anti,
            matrix,
        })
    }
}

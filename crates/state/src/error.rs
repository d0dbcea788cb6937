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

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("qubit index {index} is out of range for a {num_qubits}-qubit unit")]
    InvalidQubitIndex { index: usize, num_qubits: usize },
    #[error("qubit {0} appears more than once in the gate arguments")]
    DuplicateQubit(usize),
    #[error("gate '{gate}' acts on {expected} qubits, but {actual} were given")]
    GateArity {
        gate: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("state of length {0} is not a power of two")]
    InvalidDimension(usize),
    #[error("register of length {length} at {start} does not fit in a {num_qubits}-qubit unit")]
    RegisterOutOfRange {
        start: usize,
        length: usize,
        num_qubits: usize,
    },
    #[error("lookup table has {actual} entries, but {expected} are needed")]
    TableTooShort { expected: usize, actual: usize },
    #[error("qubits {start}..{end} are entangled with the rest of the unit and cannot be separated")]
    NotSeparable { start: usize, end: usize },
    #[error("{0} qubits cannot be addressed by a dense state vector")]
    TooManyQubits(usize),
}

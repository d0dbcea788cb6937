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

use qsep_state::StateError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PartitionError {
    #[error("qubit {qubit} is out of range for a {num_qubits}-qubit register")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },
    #[error("register of length {length} at {start} does not fit in a {num_qubits}-qubit register")]
    RangeOutOfBounds {
        start: usize,
        length: usize,
        num_qubits: usize,
    },
    #[error("operation requires at least one qubit")]
    ZeroLength,
    #[error("qubit {0} appears more than once in the operation arguments")]
    DuplicateQubit(usize),
    #[error("qubit {0} is claimed by more than one register of the operation")]
    OverlappingRanges(usize),
    #[error("output qubit {0} must differ from the inputs")]
    OutputAliasesInput(usize),
    #[error("register of length {0} does not fit in a 64-bit value")]
    RegisterTooWide(usize),
    #[error("state of length {actual} does not describe a {num_qubits}-qubit register")]
    StateLength { actual: usize, num_qubits: usize },
    #[error("state has zero norm")]
    ZeroNormState,
    #[error("Internal error: partition tables are inconsistent: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    State(#[from] StateError),
}

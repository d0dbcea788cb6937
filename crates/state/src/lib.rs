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

//! Dense per-unit quantum state engine.
//!
//! [CoherentUnit] is the set of capabilities a partitioned register needs from the engine that
//! holds the amplitudes of one group of entangled qubits; [StateVector] is the reference
//! implementation.

use std::env;

pub mod error;
pub mod gate;
pub mod gate_matrix;
pub mod state_vector;
pub mod unit;
pub mod util;

pub use error::StateError;
pub use gate::Gate;
pub use state_vector::StateVector;
pub use unit::{CoherentUnit, UnitRng};

#[inline]
pub fn getenv_use_multiple_threads() -> bool {
    let parallel_context = env::var("QSEP_IN_PARALLEL")
        .unwrap_or_else(|_| "FALSE".to_string())
        .to_uppercase()
        == "TRUE";
    let force_threads = env::var("QSEP_FORCE_THREADS")
        .unwrap_or_else(|_| "FALSE".to_string())
        .to_uppercase()
        == "TRUE";
    !parallel_context || force_threads
}

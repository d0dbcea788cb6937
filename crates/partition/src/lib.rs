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

//! A quantum register held as a dynamic partition of coherent units.
//!
//! [SeparatedUnit] keeps each group of entangled qubits in its own dense unit and fuses units
//! only when an operation makes their qubits interact.  The [lookup] table maps every global
//! qubit to the unit and local index that hold it; [bit_list] compiles register requests into
//! runs of locals; the entangler fuses the units a request touches and sorts their locals into
//! the order the operation needs.

pub mod arena;
pub mod bit_list;
pub mod config;
mod entangle;
pub mod error;
pub mod lookup;
pub mod separated_unit;

pub use config::SeparatedConfig;
pub use error::PartitionError;
pub use lookup::{GlobalQubit, LocalQubit, QubitLocation, UnitId};
pub use separated_unit::SeparatedUnit;

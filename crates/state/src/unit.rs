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

use std::fmt::Debug;

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rand_pcg::Pcg64Mcg;
use smallvec::SmallVec;

use crate::error::StateError;
use crate::gate::Gate;
use crate::gate_matrix::X_GATE;
use crate::util::GateArray1Q;

/// Random number generator every unit samples measurement outcomes from.
pub type UnitRng = Pcg64Mcg;

/// A self-contained simulated register over the contiguous local qubit indices `0..num_qubits()`.
///
/// This is the capability set the partition engine needs from a dense engine.  Local index `i`
/// is bit `i` of a basis-state index, so registers read out little-endian.
pub trait CoherentUnit: Clone + Debug + Sized {
    /// The widest unit this engine can hold.
    const MAX_QUBITS: usize;

    /// Create a unit of `num_qubits` qubits in the computational basis state `permutation`.
    fn from_permutation(num_qubits: usize, permutation: u64) -> Result<Self, StateError>;

    /// Create a unit holding exactly the given amplitudes.
    ///
    /// .. warning:: pseudo-quantum; this is for seeding exact states in tests and inspection.
    fn from_raw_state(state: ArrayView1<Complex64>) -> Result<Self, StateError>;

    /// Copy out every amplitude of the unit.
    fn raw_state(&self) -> Array1<Complex64>;

    fn num_qubits(&self) -> usize;

    /// Apply `matrix` to `target` on the subspace where every qubit in `controls` is |1> (or |0>
    /// when `anti` is set).
    fn apply_controlled_1q(
        &mut self,
        controls: &[usize],
        anti: bool,
        matrix: &GateArray1Q,
        target: usize,
    ) -> Result<(), StateError>;

    /// Exchange the states of two local qubits.
    fn swap(&mut self, qubit_a: usize, qubit_b: usize) -> Result<(), StateError>;

    /// Probability of measuring |1> on `qubit`.
    fn prob(&self, qubit: usize) -> Result<f64, StateError>;

    /// Measure `qubit`, collapsing the unit onto the sampled outcome.
    fn measure(&mut self, qubit: usize, rng: &mut UnitRng) -> Result<bool, StateError>;

    /// Measure the register `start..start + length` as an unsigned integer, collapsing the unit.
    fn measure_reg(
        &mut self,
        start: usize,
        length: usize,
        rng: &mut UnitRng,
    ) -> Result<u64, StateError>;

    /// Append a copy of `other` as the new most-significant qubits of this unit, returning the
    /// local index at which `other`'s qubit 0 now lives.  A unit that would grow past what the
    /// engine can hold is left unchanged and the call fails.
    fn compose(&mut self, other: &Self) -> Result<usize, StateError>;

    /// Remove the qubits `start..start + length` and return them as their own unit.  The qubits
    /// above the removed range move down to close the gap.
    fn decompose(&mut self, start: usize, length: usize) -> Result<Self, StateError>;

    /// Remove the qubits `start..start + length`, discarding their state.
    fn dispose(&mut self, start: usize, length: usize) -> Result<(), StateError>;

    /// Reset the 8-bit register at `output_start` and load it with `values[input]` for every
    /// basis value of the 8-bit register at `input_start`.  Returns the expected output value.
    fn superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError>;

    /// Add `values[input]` and the carry into the 8-bit output register, setting the carry qubit
    /// on overflow.  Returns the expected output value.
    fn adc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError>;

    /// Subtract `values[input]` and the borrow from the 8-bit output register, setting the carry
    /// qubit on underflow.  Returns the expected output value.
    fn sbc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError>;

    /// Apply a named gate to the local qubits `qubits` (controls first, target last).
    fn apply_gate(&mut self, gate: Gate, qubits: &[usize]) -> Result<(), StateError> {
        if qubits.len() != gate.num_qubits() {
            return Err(StateError::GateArity {
                gate: gate.name(),
                expected: gate.num_qubits(),
                actual: qubits.len(),
            });
        }
        let num_qubits = self.num_qubits();
        for (i, &qubit) in qubits.iter().enumerate() {
            if qubit >= num_qubits {
                return Err(StateError::InvalidQubitIndex {
                    index: qubit,
                    num_qubits,
                });
            }
            if qubits[..i].contains(&qubit) {
                return Err(StateError::DuplicateQubit(qubit));
            }
        }
        match (gate.controlled_matrix(), qubits) {
            (Some(controlled), [controls @ .., target]) => {
                let controls: SmallVec<[usize; 2]> =
                    controls[..controlled.num_controls].iter().copied().collect();
                self.apply_controlled_1q(&controls, controlled.anti, &controlled.matrix, *target)
            }
            (None, [qubit_a, qubit_b]) => self.swap(*qubit_a, *qubit_b),
            _ => Err(StateError::GateArity {
                gate: gate.name(),
                expected: gate.num_qubits(),
                actual: qubits.len(),
            }),
        }
    }

    /// Force the register `start..start + length` to the value `value`.
    ///
    /// The register is measured first and then corrected bit by bit, so any entanglement with the
    /// rest of the unit collapses as it would under measurement.
    fn set_reg(
        &mut self,
        start: usize,
        length: usize,
        value: u64,
        rng: &mut UnitRng,
    ) -> Result<(), StateError> {
        let current = self.measure_reg(start, length, rng)?;
        let flips = current ^ value;
        for bit in 0..length {
            if (flips >> bit) & 1 == 1 {
                self.apply_controlled_1q(&[], false, &X_GATE, start + bit)?;
            }
        }
        Ok(())
    }
}

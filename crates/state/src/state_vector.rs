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

use log::trace;
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rand::Rng;
use rayon::prelude::*;

use crate::error::StateError;
use crate::gate_matrix::X_GATE;
use crate::getenv_use_multiple_threads;
use crate::unit::{CoherentUnit, UnitRng};
use crate::util::{
    low_mask, register_mask, GateArray1Q, C_ONE, C_ZERO, SEPARABILITY_EPSILON,
};

/// Units with at least this many qubits run their amplitude loops on the rayon pool.
const PARALLEL_THRESHOLD: usize = 19;

/// Largest unit width a dense vector may be allocated for.
const MAX_QUBITS: usize = 40;

/// Width of the registers the classical table operations act on.
const REG8_WIDTH: usize = 8;

/// A dense state vector over `num_qubits` qubits, with local qubit `i` as bit `i` of the
/// amplitude index.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector {
    num_qubits: usize,
    amps: Vec<Complex64>,
}

impl StateVector {
    /// The all-zero state on `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Result<Self, StateError> {
        Self::from_permutation(num_qubits, 0)
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amps
    }

    #[inline]
    fn run_in_parallel(&self) -> bool {
        self.num_qubits >= PARALLEL_THRESHOLD && getenv_use_multiple_threads()
    }

    fn check_qubit(&self, qubit: usize) -> Result<(), StateError> {
        if qubit >= self.num_qubits {
            return Err(StateError::InvalidQubitIndex {
                index: qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    fn check_register(&self, start: usize, length: usize) -> Result<(), StateError> {
        if start + length > self.num_qubits {
            return Err(StateError::RegisterOutOfRange {
                start,
                length,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Sum of `|amp|^2` over every index for which `select` holds.
    fn weight_where<F>(&self, select: F) -> f64
    where
        F: Fn(usize) -> bool + Sync,
    {
        let map_fn = |(i, amp): (usize, &Complex64)| if select(i) { amp.norm_sqr() } else { 0. };
        if self.run_in_parallel() {
            self.amps.par_iter().enumerate().map(map_fn).sum()
        } else {
            self.amps.iter().enumerate().map(map_fn).sum()
        }
    }

    /// Zero every amplitude outside the subspace `index & mask == value` and renormalise by
    /// `1 / sqrt(prob)`.
    fn collapse(&mut self, mask: usize, value: usize, prob: f64) {
        let scale = if prob > 0. { 1. / prob.sqrt() } else { 0. };
        let map_fn = |(i, amp): (usize, &mut Complex64)| {
            if i & mask == value {
                *amp *= scale;
            } else {
                *amp = C_ZERO;
            }
        };
        if self.run_in_parallel() {
            self.amps.par_iter_mut().enumerate().for_each(map_fn);
        } else {
            self.amps.iter_mut().enumerate().for_each(map_fn);
        }
    }

    /// Split this state into `(remainder, extracted)` for the qubits `start..start + length`,
    /// failing if the state is not (close to) a product across that cut.
    fn factor(
        &self,
        start: usize,
        length: usize,
    ) -> Result<(Vec<Complex64>, Vec<Complex64>), StateError> {
        let low = low_mask(start);
        let part_mask = low_mask(length);
        let split = |i: usize| -> (usize, usize) {
            let part = (i >> start) & part_mask;
            let rest = (i & low) | ((i >> (start + length)) << start);
            (rest, part)
        };
        let join = |rest: usize, part: usize| -> usize {
            (rest & low) | (part << start) | ((rest >> start) << (start + length))
        };

        // The largest amplitude fixes a row and a column of the state viewed as a
        // `rest x part` matrix; for a product state both are proportional to the factors.
        let (pivot, _) = self
            .amps
            .iter()
            .enumerate()
            .fold((0, -1.), |(best, best_norm), (i, amp)| {
                let norm = amp.norm_sqr();
                if norm > best_norm {
                    (i, norm)
                } else {
                    (best, best_norm)
                }
            });
        let (pivot_rest, pivot_part) = split(pivot);

        let normalise = |mut vec: Vec<Complex64>| -> Vec<Complex64> {
            let norm = vec.iter().map(|amp| amp.norm_sqr()).sum::<f64>().sqrt();
            if norm > 0. {
                vec.iter_mut().for_each(|amp| *amp /= norm);
            }
            vec
        };
        let mut rest: Vec<Complex64> = normalise(
            (0..1_usize << (self.num_qubits - length))
                .map(|r| self.amps[join(r, pivot_part)])
                .collect(),
        );
        let part: Vec<Complex64> = normalise(
            (0..1_usize << length)
                .map(|p| self.amps[join(pivot_rest, p)])
                .collect(),
        );

        let overlap: Complex64 = self
            .amps
            .iter()
            .enumerate()
            .map(|(i, amp)| {
                let (r, p) = split(i);
                (rest[r] * part[p]).conj() * amp
            })
            .sum();
        if 1. - overlap.norm() > SEPARABILITY_EPSILON {
            return Err(StateError::NotSeparable {
                start,
                end: start + length,
            });
        }
        // Carry the global phase on the remainder so that `rest (x) part` reproduces the state.
        let phase = overlap / overlap.norm();
        rest.iter_mut().for_each(|amp| *amp *= phase);
        Ok((rest, part))
    }

    fn check_reg8(
        &self,
        input_start: usize,
        output_start: usize,
        carry: Option<usize>,
        values: &[u8],
    ) -> Result<(), StateError> {
        self.check_register(input_start, REG8_WIDTH)?;
        self.check_register(output_start, REG8_WIDTH)?;
        let input = register_mask(input_start, REG8_WIDTH);
        let output = register_mask(output_start, REG8_WIDTH);
        if input & output != 0 {
            return Err(StateError::DuplicateQubit(
                (input & output).trailing_zeros() as usize,
            ));
        }
        if let Some(carry) = carry {
            self.check_qubit(carry)?;
            if (input | output) & (1 << carry) != 0 {
                return Err(StateError::DuplicateQubit(carry));
            }
        }
        if values.len() < 1 << REG8_WIDTH {
            return Err(StateError::TableTooShort {
                expected: 1 << REG8_WIDTH,
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// Shared driver for the table-lookup register operations.  `map` receives the input and
    /// current output values of a basis state and returns the new output value and whether the
    /// carry qubit should be set.
    fn table_apply<F>(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: Option<usize>,
        map: F,
    ) -> u8
    where
        F: Fn(usize, usize) -> (usize, bool),
    {
        let output_mask = register_mask(output_start, REG8_WIDTH);
        let carry_mask = carry.map_or(0, |carry| 1 << carry);
        let byte = low_mask(REG8_WIDTH);
        let mut out = vec![C_ZERO; self.amps.len()];
        let mut average = 0.;
        for (i, amp) in self.amps.iter().enumerate() {
            let weight = amp.norm_sqr();
            let input = (i >> input_start) & byte;
            let output = (i >> output_start) & byte;
            let (value, carry_out) = map(input, output);
            let mut j = (i & !output_mask & !carry_mask) | ((value & byte) << output_start);
            if carry_out {
                j |= carry_mask;
            }
            out[j] += *amp;
            average += weight * (value & byte) as f64;
        }
        self.amps = out;
        (average + 0.5) as u8
    }

    /// Measure the carry qubit and reset it, returning the measured value.
    fn take_carry(&mut self, carry: usize, rng: &mut UnitRng) -> Result<bool, StateError> {
        let carry_in = self.measure(carry, rng)?;
        if carry_in {
            self.apply_controlled_1q(&[], false, &X_GATE, carry)?;
        }
        Ok(carry_in)
    }
}

impl CoherentUnit for StateVector {
    const MAX_QUBITS: usize = MAX_QUBITS;

    fn from_permutation(num_qubits: usize, permutation: u64) -> Result<Self, StateError> {
        if num_qubits > MAX_QUBITS {
            return Err(StateError::TooManyQubits(num_qubits));
        }
        let mut amps = vec![C_ZERO; 1 << num_qubits];
        amps[(permutation as usize) & low_mask(num_qubits)] = C_ONE;
        Ok(StateVector { num_qubits, amps })
    }

    fn from_raw_state(state: ArrayView1<Complex64>) -> Result<Self, StateError> {
        let len = state.len();
        if !len.is_power_of_two() {
            return Err(StateError::InvalidDimension(len));
        }
        Ok(StateVector {
            num_qubits: len.trailing_zeros() as usize,
            amps: state.to_vec(),
        })
    }

    fn raw_state(&self) -> Array1<Complex64> {
        Array1::from_vec(self.amps.clone())
    }

    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn apply_controlled_1q(
        &mut self,
        controls: &[usize],
        anti: bool,
        matrix: &GateArray1Q,
        target: usize,
    ) -> Result<(), StateError> {
        self.check_qubit(target)?;
        let mut control_mask = 0;
        for &control in controls {
            self.check_qubit(control)?;
            if control == target || control_mask & (1 << control) != 0 {
                return Err(StateError::DuplicateQubit(control));
            }
            control_mask |= 1 << control;
        }
        let want = if anti { 0 } else { control_mask };
        let stride = 1_usize << target;
        let m = *matrix;
        // Each chunk of `2 * stride` amplitudes holds the target-|0> half followed by the
        // target-|1> half of the same set of basis states.
        let kernel = |(chunk_index, chunk): (usize, &mut [Complex64])| {
            let base = chunk_index * 2 * stride;
            let (zeros, ones) = chunk.split_at_mut(stride);
            for (j, (a0, a1)) in zeros.iter_mut().zip(ones.iter_mut()).enumerate() {
                if (base + j) & control_mask != want {
                    continue;
                }
                let (v0, v1) = (*a0, *a1);
                *a0 = m[0][0] * v0 + m[0][1] * v1;
                *a1 = m[1][0] * v0 + m[1][1] * v1;
            }
        };
        if self.run_in_parallel() {
            self.amps
                .par_chunks_mut(2 * stride)
                .enumerate()
                .for_each(kernel);
        } else {
            self.amps.chunks_mut(2 * stride).enumerate().for_each(kernel);
        }
        Ok(())
    }

    fn swap(&mut self, qubit_a: usize, qubit_b: usize) -> Result<(), StateError> {
        self.check_qubit(qubit_a)?;
        self.check_qubit(qubit_b)?;
        if qubit_a == qubit_b {
            return Ok(());
        }
        let bit_a = 1_usize << qubit_a;
        let bit_b = 1_usize << qubit_b;
        for i in 0..self.amps.len() {
            if i & bit_a != 0 && i & bit_b == 0 {
                self.amps.swap(i, i ^ bit_a ^ bit_b);
            }
        }
        Ok(())
    }

    fn prob(&self, qubit: usize) -> Result<f64, StateError> {
        self.check_qubit(qubit)?;
        let bit = 1_usize << qubit;
        Ok(self.weight_where(|i| i & bit != 0).min(1.))
    }

    fn measure(&mut self, qubit: usize, rng: &mut UnitRng) -> Result<bool, StateError> {
        let prob_one = self.prob(qubit)?;
        let result = rng.gen::<f64>() < prob_one;
        let bit = 1_usize << qubit;
        let (value, prob) = if result {
            (bit, prob_one)
        } else {
            (0, 1. - prob_one)
        };
        self.collapse(bit, value, prob);
        Ok(result)
    }

    fn measure_reg(
        &mut self,
        start: usize,
        length: usize,
        rng: &mut UnitRng,
    ) -> Result<u64, StateError> {
        self.check_register(start, length)?;
        if length > u64::BITS as usize {
            return Err(StateError::TooManyQubits(length));
        }
        let part_mask = low_mask(length);
        let mut probs = vec![0.; 1 << length];
        for (i, amp) in self.amps.iter().enumerate() {
            probs[(i >> start) & part_mask] += amp.norm_sqr();
        }
        let sample = rng.gen::<f64>() * probs.iter().sum::<f64>();
        let mut cumulative = 0.;
        let mut outcome = 0;
        for (value, prob) in probs.iter().enumerate() {
            if *prob <= 0. {
                continue;
            }
            outcome = value;
            cumulative += prob;
            if sample < cumulative {
                break;
            }
        }
        self.collapse(part_mask << start, outcome << start, probs[outcome]);
        Ok(outcome as u64)
    }

    fn compose(&mut self, other: &Self) -> Result<usize, StateError> {
        let offset = self.num_qubits;
        if offset + other.num_qubits > MAX_QUBITS {
            return Err(StateError::TooManyQubits(offset + other.num_qubits));
        }
        trace!(
            "composing a {}-qubit unit onto a {}-qubit unit",
            other.num_qubits,
            offset
        );
        let low_len = self.amps.len();
        let mut amps = vec![C_ZERO; low_len * other.amps.len()];
        for (j, high) in other.amps.iter().enumerate() {
            if high.norm_sqr() == 0. {
                continue;
            }
            let row = &mut amps[j * low_len..(j + 1) * low_len];
            for (out, low) in row.iter_mut().zip(self.amps.iter()) {
                *out = low * high;
            }
        }
        self.amps = amps;
        self.num_qubits += other.num_qubits;
        Ok(offset)
    }

    fn decompose(&mut self, start: usize, length: usize) -> Result<Self, StateError> {
        self.check_register(start, length)?;
        trace!(
            "decomposing qubits {}..{} out of a {}-qubit unit",
            start,
            start + length,
            self.num_qubits
        );
        let (rest, part) = self.factor(start, length)?;
        self.amps = rest;
        self.num_qubits -= length;
        Ok(StateVector {
            num_qubits: length,
            amps: part,
        })
    }

    fn dispose(&mut self, start: usize, length: usize) -> Result<(), StateError> {
        self.decompose(start, length).map(|_| ())
    }

    fn superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError> {
        self.check_reg8(input_start, output_start, None, values)?;
        self.set_reg(output_start, REG8_WIDTH, 0, rng)?;
        Ok(self.table_apply(input_start, output_start, None, |input, _| {
            (values[input] as usize, false)
        }))
    }

    fn adc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError> {
        self.check_reg8(input_start, output_start, Some(carry), values)?;
        let carry_in = usize::from(self.take_carry(carry, rng)?);
        Ok(
            self.table_apply(input_start, output_start, Some(carry), |input, output| {
                let sum = output + values[input] as usize + carry_in;
                (sum & 0xff, sum > 0xff)
            }),
        )
    }

    fn sbc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
        rng: &mut UnitRng,
    ) -> Result<u8, StateError> {
        self.check_reg8(input_start, output_start, Some(carry), values)?;
        let borrow_in = usize::from(self.take_carry(carry, rng)?);
        Ok(
            self.table_apply(input_start, output_start, Some(carry), |input, output| {
                let subtrahend = values[input] as usize + borrow_in;
                if output >= subtrahend {
                    (output - subtrahend, false)
                } else {
                    (output + 0x100 - subtrahend, true)
                }
            }),
        )
    }
}

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

use hashbrown::HashMap;
use log::debug;
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use qsep_state::gate_matrix::dyad_angle;
use qsep_state::util::c64;
use qsep_state::{CoherentUnit, Gate, StateError, StateVector, UnitRng};

use crate::arena::UnitArena;
use crate::bit_list::{optimize_parallel_bit_list, ordered_bit_list, parallel_bit_list};
use crate::config::SeparatedConfig;
use crate::error::PartitionError;
use crate::lookup::{GlobalQubit, QubitLocation, QubitLookup, UnitId};

/// Width of the registers the classical table operations act on.
const REG8_WIDTH: usize = 8;

/// Mask with the lowest `length` bits of a register value set.
#[inline]
fn value_mask(length: usize) -> u64 {
    if length >= u64::BITS as usize {
        u64::MAX
    } else {
        (1_u64 << length) - 1
    }
}

/// A register of qubits held as a partition of independent coherent units.
///
/// Qubits start out in one unit each.  An operation that needs several qubits to interact first
/// fuses the units holding them, so a unit only ever grows to cover qubits that have actually
/// been entangled.  Global qubit indices are always the contiguous range `0..num_qubits()`;
/// removing qubits shifts the indices above them down.
///
/// Every method checks its arguments before it touches any state, so an `Err` caused by a bad
/// argument leaves the register unchanged.
#[derive(Debug)]
pub struct SeparatedUnit<U = StateVector> {
    pub(crate) units: UnitArena<U>,
    pub(crate) lookup: QubitLookup,
    pub(crate) rng: UnitRng,
}

impl<U: CoherentUnit> Clone for SeparatedUnit<U> {
    /// A deep copy.  The copy samples measurements from its own stream, seeded from the
    /// source's generator, so the two registers do not replay each other's outcomes.
    fn clone(&self) -> Self {
        let mut source_rng = self.rng.clone();
        SeparatedUnit {
            units: self.units.clone(),
            lookup: self.lookup.clone(),
            rng: UnitRng::seed_from_u64(source_rng.gen()),
        }
    }
}

impl<U: CoherentUnit> SeparatedUnit<U> {
    /// `num_qubits` qubits in |0>, seeded as the environment asks.
    pub fn new(num_qubits: usize) -> Result<Self, PartitionError> {
        Self::with_config(num_qubits, 0, SeparatedConfig::from_env())
    }

    /// `num_qubits` qubits in the basis state `permutation`, seeded as the environment asks.
    pub fn with_permutation(num_qubits: usize, permutation: u64) -> Result<Self, PartitionError> {
        Self::with_config(num_qubits, permutation, SeparatedConfig::from_env())
    }

    pub fn with_config(
        num_qubits: usize,
        permutation: u64,
        config: SeparatedConfig,
    ) -> Result<Self, PartitionError> {
        let rng = match config.seed {
            Some(seed) => UnitRng::seed_from_u64(seed),
            None => UnitRng::from_entropy(),
        };
        let mut out = SeparatedUnit {
            units: UnitArena::new(),
            lookup: QubitLookup::new(),
            rng,
        };
        out.reset_to_permutation(num_qubits, permutation)?;
        Ok(out)
    }

    /// Replace everything with one single-qubit unit per qubit, in the basis state `permutation`.
    fn reset_to_permutation(
        &mut self,
        num_qubits: usize,
        permutation: u64,
    ) -> Result<(), PartitionError> {
        let mut units = Vec::with_capacity(num_qubits);
        for qubit in 0..num_qubits {
            let bit = permutation.checked_shr(qubit as u32).unwrap_or(0) & 1;
            units.push(U::from_permutation(1, bit)?);
        }
        self.units.clear();
        self.lookup.clear();
        for unit in units {
            let id = self.units.insert(unit);
            self.lookup.push_unit(id, 1);
        }
        self.debug_check();
        Ok(())
    }

    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.lookup.num_qubits()
    }

    /// The number of live coherent units.
    #[inline]
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    /// The unit and local index that currently hold `qubit`.
    pub fn location(&self, qubit: usize) -> Result<QubitLocation, PartitionError> {
        self.check_qubit(qubit)?;
        Ok(self.lookup.locate(GlobalQubit::from_index(qubit)))
    }

    /// The width of the unit that currently holds `qubit`.
    pub fn unit_width(&self, qubit: usize) -> Result<usize, PartitionError> {
        let location = self.location(qubit)?;
        Ok(self.units.live(location.unit)?.num_qubits())
    }

    /// Validate that the live units partition the register and that both directions of the
    /// qubit table agree with each other and with the unit widths.
    pub fn check_invariants(&self) -> Result<(), PartitionError> {
        self.lookup
            .check(|id| self.units.get(id).map(U::num_qubits), self.units.len())
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    pub(crate) fn check_qubit(&self, qubit: usize) -> Result<(), PartitionError> {
        if qubit >= self.num_qubits() {
            return Err(PartitionError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits(),
            });
        }
        Ok(())
    }

    /// Check that `start..start + length` lies inside the register.  An empty range passes.
    pub(crate) fn check_range(&self, start: usize, length: usize) -> Result<(), PartitionError> {
        match start.checked_add(length) {
            Some(end) if end <= self.num_qubits() => Ok(()),
            _ => Err(PartitionError::RangeOutOfBounds {
                start,
                length,
                num_qubits: self.num_qubits(),
            }),
        }
    }

    fn check_value_range(&self, start: usize, length: usize) -> Result<(), PartitionError> {
        self.check_range(start, length)?;
        if length > u64::BITS as usize {
            return Err(PartitionError::RegisterTooWide(length));
        }
        Ok(())
    }

    // Register structure.

    /// Append the qubits of `unit` to the end of the register.  Returns the global index of the
    /// unit's first qubit.
    pub fn cohere(&mut self, unit: U) -> usize {
        let start = self.num_qubits();
        let width = unit.num_qubits();
        if width == 0 {
            return start;
        }
        let id = self.units.insert(unit);
        self.lookup.push_unit(id, width);
        debug!("cohered a {}-qubit unit as qubits {}..{}", width, start, start + width);
        self.debug_check();
        start
    }

    /// Append every qubit of `other` to the end of the register, keeping its partition and its
    /// qubit order.  Returns the global index of `other`'s first qubit.
    pub fn cohere_separated(&mut self, mut other: SeparatedUnit<U>) -> usize {
        let start = self.num_qubits();
        let mut remap: HashMap<UnitId, UnitId> = HashMap::with_capacity(other.units.len());
        for (old, unit) in other.units.drain() {
            remap.insert(old, self.units.insert(unit));
        }
        for (_, location) in other.lookup.iter() {
            self.lookup.push_qubit(QubitLocation {
                unit: remap[&location.unit],
                local: location.local,
            });
        }
        debug!(
            "cohered {} qubits in {} units as qubits {}..{}",
            other.num_qubits(),
            remap.len(),
            start,
            self.num_qubits()
        );
        self.debug_check();
        start
    }

    /// Remove the qubits `start..start + length` from the register and return them as one unit,
    /// in order.
    ///
    /// The range must not be entangled with the rest of the register.  A [StateVector] unit
    /// detects a cut it cannot factor and fails with [qsep_state::StateError::NotSeparable]; the
    /// register then keeps its state and qubit count, though the units holding the range may
    /// have been fused.
    pub fn decohere(&mut self, start: usize, length: usize) -> Result<U, PartitionError> {
        self.split_range(start, length, true)?.ok_or(PartitionError::ZeroLength)
    }

    /// Remove the qubits `start..start + length` from the register, discarding their state.  The
    /// same separability contract as [SeparatedUnit::decohere] applies.
    pub fn dispose(&mut self, start: usize, length: usize) -> Result<(), PartitionError> {
        self.split_range(start, length, false).map(|_| ())
    }

    fn split_range(
        &mut self,
        start: usize,
        length: usize,
        extract: bool,
    ) -> Result<Option<U>, PartitionError> {
        if length == 0 {
            return Err(PartitionError::ZeroLength);
        }
        self.check_range(start, length)?;
        let Some((unit, base)) = self.entangle_ordered(&[(start, length)])? else {
            return Err(PartitionError::ZeroLength);
        };
        let width = self.units.live(unit)?.num_qubits();
        let removed = if width == length {
            self.units.remove(unit)
        } else if extract {
            Some(self.units.live_mut(unit)?.decompose(base.index(), length)?)
        } else {
            self.units.live_mut(unit)?.dispose(base.index(), length)?;
            None
        };
        self.lookup.detach(unit, base.index(), length);
        debug!(
            "{} qubits {}..{} from unit {} ({} qubits remain in it)",
            if extract { "decohered" } else { "disposed" },
            start,
            start + length,
            unit,
            width - length
        );
        self.debug_check();
        Ok(removed.filter(|_| extract))
    }

    /// Replace the whole register with one unit holding `state`, rescaled to unit norm.
    ///
    /// .. warning:: pseudo-quantum; for seeding exact states in tests and inspection.
    pub fn set_quantum_state(
        &mut self,
        state: ArrayView1<Complex64>,
    ) -> Result<(), PartitionError> {
        let num_qubits = self.num_qubits();
        let expected = 1_usize.checked_shl(num_qubits as u32).unwrap_or(0);
        if state.len() != expected {
            return Err(PartitionError::StateLength {
                actual: state.len(),
                num_qubits,
            });
        }
        let norm = state.iter().map(|amp| amp.norm_sqr()).sum::<f64>().sqrt();
        if !norm.is_normal() {
            return Err(PartitionError::ZeroNormState);
        }
        let normalized = state.mapv(|amp| amp / norm);
        let unit = U::from_raw_state(normalized.view())?;
        self.units.clear();
        self.lookup.clear();
        if num_qubits > 0 {
            let id = self.units.insert(unit);
            self.lookup.push_unit(id, num_qubits);
        }
        debug!("loaded a raw {}-qubit state into one unit", num_qubits);
        self.debug_check();
        Ok(())
    }

    /// Every amplitude of the register, with global qubit `i` as bit `i` of the index.
    ///
    /// .. warning:: pseudo-quantum; for reading out exact states in tests and inspection.
    ///
    /// Fails when the joint state is too large to hold in one unit.
    pub fn clone_raw_state(&self) -> Result<Array1<Complex64>, PartitionError> {
        let mut joint: Option<U> = None;
        let mut order: Vec<GlobalQubit> = Vec::with_capacity(self.num_qubits());
        for (id, unit) in self.units.iter() {
            match joint.as_mut() {
                Some(joint) => {
                    joint.compose(unit)?;
                }
                None => joint = Some(unit.clone()),
            }
            order.extend_from_slice(self.lookup.unit_qubits(id));
        }
        let Some(joint) = joint else {
            return Ok(Array1::from_elem(1, c64(1., 0.)));
        };
        let raw = joint.raw_state();
        let mut out = Array1::from_elem(raw.len(), c64(0., 0.));
        for (i, amp) in raw.iter().enumerate() {
            let index = order
                .iter()
                .enumerate()
                .filter(|(local, _)| (i >> local) & 1 == 1)
                .fold(0_usize, |acc, (_, global)| acc | (1 << global.index()));
            out[index] = *amp;
        }
        Ok(out)
    }

    // Measurement and register values.

    /// Probability of measuring |1> on `qubit`.  Never fuses units.
    pub fn prob(&self, qubit: usize) -> Result<f64, PartitionError> {
        let location = self.location(qubit)?;
        Ok(self
            .units
            .live(location.unit)?
            .prob(location.local.index())?)
    }

    /// Measure `qubit`.
    pub fn m(&mut self, qubit: usize) -> Result<bool, PartitionError> {
        let location = self.location(qubit)?;
        Ok(self
            .units
            .live_mut(location.unit)?
            .measure(location.local.index(), &mut self.rng)?)
    }

    /// Measure the register `start..start + length` as an unsigned integer with qubit `start` as
    /// the least significant bit.
    ///
    /// Each unit measures its own share of the register, so no units are fused.
    pub fn m_reg(&mut self, start: usize, length: usize) -> Result<u64, PartitionError> {
        self.check_value_range(start, length)?;
        let mut value = 0;
        let mut shift = 0;
        for run in ordered_bit_list(&self.lookup, start, length) {
            let bits = self.units.live_mut(run.unit)?.measure_reg(
                run.start.index(),
                run.length,
                &mut self.rng,
            )?;
            value |= bits << shift;
            shift += run.length;
        }
        Ok(value)
    }

    /// Force `qubit` to `value`, measuring it first.
    pub fn set_bit(&mut self, qubit: usize, value: bool) -> Result<(), PartitionError> {
        if self.m(qubit)? != value {
            self.x(qubit)?;
        }
        Ok(())
    }

    /// Force the register `start..start + length` to `value`, qubit `start` taking the least
    /// significant bit.  Each unit sets its own share of the register.
    pub fn set_reg(
        &mut self,
        start: usize,
        length: usize,
        value: u64,
    ) -> Result<(), PartitionError> {
        self.check_value_range(start, length)?;
        let mut shift = 0;
        for run in ordered_bit_list(&self.lookup, start, length) {
            let bits = value.checked_shr(shift as u32).unwrap_or(0) & value_mask(run.length);
            self.units.live_mut(run.unit)?.set_reg(
                run.start.index(),
                run.length,
                bits,
                &mut self.rng,
            )?;
            shift += run.length;
        }
        Ok(())
    }

    /// Discard every unit and put the register into the basis state `value`, one unit per qubit.
    pub fn set_permutation(&mut self, value: u64) -> Result<(), PartitionError> {
        let num_qubits = self.num_qubits();
        self.reset_to_permutation(num_qubits, value)?;
        debug!("reset {} qubits to permutation {}", num_qubits, value);
        Ok(())
    }

    // Swaps.

    /// Exchange two qubits.  Qubits in the same unit are exchanged inside it; qubits in different
    /// units are exchanged by relabelling them, which leaves both units alone.
    pub fn swap(&mut self, qubit_a: usize, qubit_b: usize) -> Result<(), PartitionError> {
        let a = self.location(qubit_a)?;
        let b = self.location(qubit_b)?;
        if qubit_a == qubit_b {
            return Ok(());
        }
        if a.unit == b.unit {
            self.units
                .live_mut(a.unit)?
                .swap(a.local.index(), b.local.index())?;
        } else {
            self.lookup.swap_global(
                GlobalQubit::from_index(qubit_a),
                GlobalQubit::from_index(qubit_b),
            );
        }
        self.debug_check();
        Ok(())
    }

    /// Exchange the registers `start_a..start_a + length` and `start_b..start_b + length` qubit by
    /// qubit.
    pub fn swap_range(
        &mut self,
        start_a: usize,
        start_b: usize,
        length: usize,
    ) -> Result<(), PartitionError> {
        self.check_range(start_a, length)?;
        self.check_range(start_b, length)?;
        for offset in 0..length {
            self.swap(start_a + offset, start_b + offset)?;
        }
        Ok(())
    }

    // Logic gates.

    fn check_output(
        &self,
        input_a: usize,
        input_b: usize,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_qubit(input_a)?;
        self.check_qubit(input_b)?;
        self.check_qubit(output)?;
        if output == input_a || output == input_b {
            return Err(PartitionError::OutputAliasesInput(output));
        }
        Ok(())
    }

    /// Set `output` to `input_a AND input_b`.
    pub fn and(
        &mut self,
        input_a: usize,
        input_b: usize,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_output(input_a, input_b, output)?;
        self.set_bit(output, false)?;
        if input_a == input_b {
            self.cnot(input_a, output)
        } else {
            self.ccnot(input_a, input_b, output)
        }
    }

    /// Set `output` to `input_a OR input_b`.
    pub fn or(
        &mut self,
        input_a: usize,
        input_b: usize,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_output(input_a, input_b, output)?;
        self.set_bit(output, true)?;
        if input_a == input_b {
            self.anti_cnot(input_a, output)
        } else {
            self.anti_ccnot(input_a, input_b, output)
        }
    }

    /// Set `output` to `input_a XOR input_b`.  `output` may be one of the inputs.
    pub fn xor(
        &mut self,
        input_a: usize,
        input_b: usize,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_qubit(input_a)?;
        self.check_qubit(input_b)?;
        self.check_qubit(output)?;
        if input_a == input_b {
            self.set_bit(output, false)
        } else if input_a == output {
            self.cnot(input_b, output)
        } else if input_b == output {
            self.cnot(input_a, output)
        } else {
            self.set_bit(output, false)?;
            self.cnot(input_a, output)?;
            self.cnot(input_b, output)
        }
    }

    /// Set `output` to `input AND classical`.
    pub fn cl_and(
        &mut self,
        input: usize,
        classical: bool,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_qubit(input)?;
        self.check_qubit(output)?;
        if input == output {
            if !classical {
                self.set_bit(output, false)?;
            }
            return Ok(());
        }
        self.set_bit(output, false)?;
        if classical {
            self.cnot(input, output)?;
        }
        Ok(())
    }

    /// Set `output` to `input OR classical`.
    pub fn cl_or(
        &mut self,
        input: usize,
        classical: bool,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_qubit(input)?;
        self.check_qubit(output)?;
        if classical {
            self.set_bit(output, true)
        } else if input != output {
            self.set_bit(output, false)?;
            self.cnot(input, output)
        } else {
            Ok(())
        }
    }

    /// Set `output` to `input XOR classical`.
    pub fn cl_xor(
        &mut self,
        input: usize,
        classical: bool,
        output: usize,
    ) -> Result<(), PartitionError> {
        self.check_qubit(input)?;
        self.check_qubit(output)?;
        if input != output {
            self.set_bit(output, false)?;
            self.cnot(input, output)?;
        }
        if classical {
            self.x(output)?;
        }
        Ok(())
    }

    // Gates.

    /// Apply a single-qubit gate where `qubit` lives.  Never fuses units.
    fn apply_single(&mut self, gate: Gate, qubit: usize) -> Result<(), PartitionError> {
        let location = self.location(qubit)?;
        self.units
            .live_mut(location.unit)?
            .apply_gate(gate, &[location.local.index()])?;
        Ok(())
    }

    /// Fuse the units holding `qubits` and apply a multi-qubit gate there.  `qubits` lists the
    /// controls first and the target last.
    fn apply_multi(&mut self, gate: Gate, qubits: &[usize]) -> Result<(), PartitionError> {
        let unit = self.entangle_indices(qubits)?;
        let locals: SmallVec<[usize; 3]> = qubits
            .iter()
            .map(|&qubit| self.lookup.locate(GlobalQubit::from_index(qubit)).local.index())
            .collect();
        self.units.live_mut(unit)?.apply_gate(gate, &locals)?;
        self.debug_check();
        Ok(())
    }

    pub fn cnot(&mut self, control: usize, target: usize) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CNOT, &[control, target])
    }

    /// CNOT that fires when `control` is |0>.
    pub fn anti_cnot(&mut self, control: usize, target: usize) -> Result<(), PartitionError> {
        self.apply_multi(Gate::AntiCNOT, &[control, target])
    }

    pub fn ccnot(
        &mut self,
        control_a: usize,
        control_b: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CCNOT, &[control_a, control_b, target])
    }

    /// Toffoli that fires when both controls are |0>.
    pub fn anti_ccnot(
        &mut self,
        control_a: usize,
        control_b: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.apply_multi(Gate::AntiCCNOT, &[control_a, control_b, target])
    }

    pub fn cy(&mut self, control: usize, target: usize) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CY, &[control, target])
    }

    pub fn cz(&mut self, control: usize, target: usize) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CZ, &[control, target])
    }

    pub fn h(&mut self, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::H, qubit)
    }

    pub fn x(&mut self, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::X, qubit)
    }

    pub fn y(&mut self, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::Y, qubit)
    }

    pub fn z(&mut self, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::Z, qubit)
    }

    /// Apply X to every qubit of `start..start + length`.  Never fuses units.
    pub fn x_range(&mut self, start: usize, length: usize) -> Result<(), PartitionError> {
        self.check_range(start, length)?;
        let mut list = parallel_bit_list(&self.lookup, start, length);
        optimize_parallel_bit_list(&mut list);
        for run in list {
            let unit = self.units.live_mut(run.unit)?;
            for local in run.locals() {
                unit.apply_gate(Gate::X, &[local])?;
            }
        }
        Ok(())
    }

    // Rotations.

    /// Phase shift `diag(1, exp(i * radians / 2))`.
    pub fn rt(&mut self, radians: f64, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::RT(radians), qubit)
    }

    /// [SeparatedUnit::rt] by the dyadic angle `-2 * pi * numerator / denominator`.
    pub fn rt_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        qubit: usize,
    ) -> Result<(), PartitionError> {
        self.rt(dyad_angle(numerator, denominator), qubit)
    }

    pub fn rx(&mut self, radians: f64, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::RX(radians), qubit)
    }

    pub fn rx_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        qubit: usize,
    ) -> Result<(), PartitionError> {
        self.rx(dyad_angle(numerator, denominator), qubit)
    }

    pub fn ry(&mut self, radians: f64, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::RY(radians), qubit)
    }

    pub fn ry_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        qubit: usize,
    ) -> Result<(), PartitionError> {
        self.ry(dyad_angle(numerator, denominator), qubit)
    }

    pub fn rz(&mut self, radians: f64, qubit: usize) -> Result<(), PartitionError> {
        self.apply_single(Gate::RZ(radians), qubit)
    }

    pub fn rz_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        qubit: usize,
    ) -> Result<(), PartitionError> {
        self.rz(dyad_angle(numerator, denominator), qubit)
    }

    pub fn crt(
        &mut self,
        radians: f64,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CRT(radians), &[control, target])
    }

    pub fn crt_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.crt(dyad_angle(numerator, denominator), control, target)
    }

    pub fn cry(
        &mut self,
        radians: f64,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CRY(radians), &[control, target])
    }

    pub fn cry_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.cry(dyad_angle(numerator, denominator), control, target)
    }

    pub fn crz(
        &mut self,
        radians: f64,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.apply_multi(Gate::CRZ(radians), &[control, target])
    }

    pub fn crz_dyad(
        &mut self,
        numerator: i32,
        denominator: i32,
        control: usize,
        target: usize,
    ) -> Result<(), PartitionError> {
        self.crz(dyad_angle(numerator, denominator), control, target)
    }

    // Classical table lookup.

    /// Reset the 8-bit register at `output_start` and load it with `values[input]`, in
    /// superposition over the 8-bit register at `input_start`.  Returns the expected output value.
    pub fn superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        values: &[u8],
    ) -> Result<u8, PartitionError> {
        check_table(values)?;
        let (unit, base) = self.entangle_registers(&[
            (input_start, REG8_WIDTH),
            (output_start, REG8_WIDTH),
        ])?;
        let result = self.units.live_mut(unit)?.superpose_reg8(
            base,
            base + REG8_WIDTH,
            values,
            &mut self.rng,
        )?;
        Ok(result)
    }

    /// Add `values[input]` and the carry into the 8-bit register at `output_start`, leaving the
    /// carry out on `carry`.  Returns the expected output value.
    pub fn adc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
    ) -> Result<u8, PartitionError> {
        check_table(values)?;
        let (unit, base) = self.entangle_registers(&[
            (input_start, REG8_WIDTH),
            (output_start, REG8_WIDTH),
            (carry, 1),
        ])?;
        let result = self.units.live_mut(unit)?.adc_superpose_reg8(
            base,
            base + REG8_WIDTH,
            base + 2 * REG8_WIDTH,
            values,
            &mut self.rng,
        )?;
        Ok(result)
    }

    /// Subtract `values[input]` and the borrow from the 8-bit register at `output_start`, leaving
    /// the borrow out on `carry`.  Returns the expected output value.
    pub fn sbc_superpose_reg8(
        &mut self,
        input_start: usize,
        output_start: usize,
        carry: usize,
        values: &[u8],
    ) -> Result<u8, PartitionError> {
        check_table(values)?;
        let (unit, base) = self.entangle_registers(&[
            (input_start, REG8_WIDTH),
            (output_start, REG8_WIDTH),
            (carry, 1),
        ])?;
        let result = self.units.live_mut(unit)?.sbc_superpose_reg8(
            base,
            base + REG8_WIDTH,
            base + 2 * REG8_WIDTH,
            values,
            &mut self.rng,
        )?;
        Ok(result)
    }

    /// [SeparatedUnit::entangle_ordered] for registers that are never empty.
    fn entangle_registers(
        &mut self,
        ranges: &[(usize, usize)],
    ) -> Result<(UnitId, usize), PartitionError> {
        let (unit, base) = self
            .entangle_ordered(ranges)?
            .ok_or(PartitionError::ZeroLength)?;
        self.debug_check();
        Ok((unit, base.index()))
    }
}

/// Table lookups read one entry per input value; a short table is refused before any unit is
/// merged.
fn check_table(values: &[u8]) -> Result<(), PartitionError> {
    if values.len() < 1 << REG8_WIDTH {
        return Err(StateError::TableTooShort {
            expected: 1 << REG8_WIDTH,
            actual: values.len(),
        }
        .into());
    }
    Ok(())
}

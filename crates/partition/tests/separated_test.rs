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

use approx::abs_diff_eq;
use proptest::prelude::*;
use qsep_partition::{PartitionError, QubitLocation, SeparatedConfig, SeparatedUnit};
use qsep_state::{CoherentUnit, StateVector, UnitRng};
use rand::SeedableRng;

fn engine(num_qubits: usize, permutation: u64) -> SeparatedUnit<StateVector> {
    SeparatedUnit::with_config(num_qubits, permutation, SeparatedConfig::with_seed(5)).unwrap()
}

fn locations(engine: &SeparatedUnit) -> Vec<QubitLocation> {
    (0..engine.num_qubits())
        .map(|qubit| engine.location(qubit).unwrap())
        .collect()
}

#[test]
fn register_round_trip() {
    let mut engine = engine(4, 0b0101);
    assert_eq!(engine.m_reg(0, 4).unwrap(), 5);
    engine.x(0).unwrap();
    assert_eq!(engine.m_reg(0, 4).unwrap(), 4);
}

#[test]
fn entangle_then_split() {
    let mut engine = engine(2, 0);
    assert_eq!(engine.num_units(), 2);
    engine.cnot(0, 1).unwrap();
    assert_eq!(engine.num_units(), 1);

    engine.h(0).unwrap();
    engine.cnot(0, 1).unwrap();
    let outcome = engine.m(0).unwrap();
    let part = engine.decohere(0, 1).unwrap();
    assert_eq!(part.num_qubits(), 1);
    assert!(abs_diff_eq!(
        part.prob(0).unwrap(),
        f64::from(u8::from(outcome)),
        epsilon = 1e-9
    ));
    assert_eq!(engine.num_qubits(), 1);
    assert_eq!(engine.num_units(), 1);
    assert_eq!(engine.m(0).unwrap(), outcome);
    engine.check_invariants().unwrap();
}

#[test]
fn dispose_of_middle_unit_shifts_later_qubits() {
    let mut engine = engine(5, 0b11010);
    engine.cz(0, 4).unwrap();
    engine.cz(1, 3).unwrap();
    engine.dispose(2, 1).unwrap();
    assert_eq!(engine.num_qubits(), 4);
    assert_eq!(engine.num_units(), 2);
    engine.check_invariants().unwrap();
    assert_eq!(engine.m_reg(0, 4).unwrap(), 0b1110);
    // Old qubit 4 is now qubit 3 and still shares a unit with qubit 0.
    engine.x(3).unwrap();
    assert_eq!(engine.m_reg(0, 4).unwrap(), 0b0110);
    assert_eq!(
        engine.location(3).unwrap().unit,
        engine.location(0).unwrap().unit
    );
}

#[test]
fn dispose_inside_a_unit_closes_the_gap() {
    let mut engine = engine(3, 0b110);
    engine.cz(0, 1).unwrap();
    engine.cz(1, 2).unwrap();
    assert_eq!(engine.num_units(), 1);
    engine.dispose(1, 1).unwrap();
    assert_eq!(engine.num_units(), 1);
    assert_eq!(engine.unit_width(0).unwrap(), 2);
    assert_eq!(engine.m_reg(0, 2).unwrap(), 0b10);
    engine.check_invariants().unwrap();
}

#[test]
fn merge_on_colocated_qubits_changes_nothing() {
    let mut engine = engine(4, 0b0110);
    engine.cnot(1, 2).unwrap();
    engine.cz(3, 1).unwrap();
    let units = engine.num_units();
    let before = locations(&engine);
    engine.cnot(2, 3).unwrap();
    engine.ccnot(1, 3, 2).unwrap();
    assert_eq!(engine.num_units(), units);
    assert_eq!(locations(&engine), before);
}

#[test]
fn merge_order_is_deterministic() {
    let run = || {
        let mut engine = engine(6, 0);
        engine.cz(4, 1).unwrap();
        engine.cnot(5, 0).unwrap();
        engine.ccnot(2, 0, 4).unwrap();
        engine.swap(3, 1).unwrap();
        locations(&engine)
    };
    assert_eq!(run(), run());
}

#[test]
fn errors_leave_the_register_untouched() {
    let mut engine = engine(3, 0b001);
    engine.cz(0, 2).unwrap();
    let before = locations(&engine);
    assert!(engine.ccnot(0, 1, 3).is_err());
    assert!(engine.set_reg(2, 2, 0).is_err());
    assert_eq!(
        engine.and(0, 1, 0),
        Err(PartitionError::OutputAliasesInput(0))
    );
    assert_eq!(locations(&engine), before);
    assert_eq!(engine.num_units(), 2);
}

/// The operations the property tests draw from.  Every one of them keeps the register in a
/// computational basis state.
#[derive(Clone, Debug)]
enum Op {
    X(usize),
    Cnot(usize, usize),
    Cz(usize, usize),
    Ccnot(usize, usize, usize),
    Swap(usize, usize),
    XRange(usize, usize),
}

impl Op {
    fn apply(&self, engine: &mut SeparatedUnit, shadow: &mut u64) {
        let bit = |value: u64, qubit: usize| (value >> qubit) & 1 == 1;
        match *self {
            Op::X(q) => {
                engine.x(q).unwrap();
                *shadow ^= 1 << q;
            }
            Op::Cnot(c, t) => {
                if c == t {
                    return;
                }
                engine.cnot(c, t).unwrap();
                if bit(*shadow, c) {
                    *shadow ^= 1 << t;
                }
            }
            Op::Cz(a, b) => {
                if a != b {
                    engine.cz(a, b).unwrap();
                }
            }
            Op::Ccnot(a, b, t) => {
                if a == b || a == t || b == t {
                    return;
                }
                engine.ccnot(a, b, t).unwrap();
                if bit(*shadow, a) && bit(*shadow, b) {
                    *shadow ^= 1 << t;
                }
            }
            Op::Swap(a, b) => {
                engine.swap(a, b).unwrap();
                if bit(*shadow, a) != bit(*shadow, b) {
                    *shadow ^= (1 << a) | (1 << b);
                }
            }
            Op::XRange(start, length) => {
                let length = length.min(engine.num_qubits() - start);
                engine.x_range(start, length).unwrap();
                for q in start..start + length {
                    *shadow ^= 1 << q;
                }
            }
        }
    }
}

const WIDTH: usize = 6;

fn arbitrary_op() -> impl Strategy<Value = Op> {
    let q = 0..WIDTH;
    prop_oneof![
        q.clone().prop_map(Op::X),
        (q.clone(), q.clone()).prop_map(|(c, t)| Op::Cnot(c, t)),
        (q.clone(), q.clone()).prop_map(|(a, b)| Op::Cz(a, b)),
        (q.clone(), q.clone(), q.clone()).prop_map(|(a, b, t)| Op::Ccnot(a, b, t)),
        (q.clone(), q.clone()).prop_map(|(a, b)| Op::Swap(a, b)),
        (q.clone(), 0..=WIDTH).prop_map(|(start, length)| Op::XRange(start, length)),
    ]
}

prop_compose! {
    fn arbitrary_circuit(max_len: usize)(ops in prop::collection::vec(arbitrary_op(), 0..max_len)) -> Vec<Op> {
        ops
    }
}

proptest! {
    #[test]
    fn partition_invariant_holds(initial in 0..(1_u64 << WIDTH), ops in arbitrary_circuit(24)) {
        let mut engine = engine(WIDTH, initial);
        let mut shadow = initial;
        for op in ops.iter() {
            op.apply(&mut engine, &mut shadow);
            prop_assert_eq!(engine.check_invariants(), Ok(()));
        }
        prop_assert_eq!(engine.m_reg(0, WIDTH).unwrap(), shadow);
    }

    #[test]
    fn registers_read_back_in_order(
        ops in arbitrary_circuit(16),
        start in 0..WIDTH,
        length in 1..=WIDTH,
        value in any::<u64>(),
    ) {
        let length = length.min(WIDTH - start);
        let value = value & ((1 << length) - 1);
        let mut engine = engine(WIDTH, 0);
        let mut shadow = 0;
        for op in ops.iter() {
            op.apply(&mut engine, &mut shadow);
        }
        engine.set_reg(start, length, value).unwrap();
        prop_assert_eq!(engine.m_reg(start, length).unwrap(), value);

        // Splitting the register out sorts it into one unit, in order.
        let mut part = engine.decohere(start, length).unwrap();
        let mut rng = UnitRng::seed_from_u64(0);
        prop_assert_eq!(part.measure_reg(0, length, &mut rng).unwrap(), value);
    }

    #[test]
    fn split_of_basis_state_shrinks_the_register(ops in arbitrary_circuit(16), start in 0..WIDTH) {
        let mut engine = engine(WIDTH, 0);
        let mut shadow = 0;
        for op in ops.iter() {
            op.apply(&mut engine, &mut shadow);
        }
        let part = engine.decohere(start, 1).unwrap();
        prop_assert_eq!(part.num_qubits(), 1);
        prop_assert_eq!(engine.num_qubits(), WIDTH - 1);
        prop_assert_eq!(engine.check_invariants(), Ok(()));
        let expected = (shadow & ((1 << start) - 1)) | ((shadow >> (start + 1)) << start);
        prop_assert_eq!(engine.m_reg(0, WIDTH - 1).unwrap(), expected);
    }
}

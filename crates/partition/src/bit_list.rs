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

//! Compilation of global qubit requests into runs of local qubits.
//!
//! Register-wise operations act on a pile of qubits that may be spread over several coherent
//! units in arbitrary local order.  A bit list describes which units currently hold the requested
//! qubits, as contiguous local ranges.  When bit order matters (the qubits are read as an integer
//! register) the list must reproduce the requested order exactly; when the operation is bitwise
//! parallel, any grouping will do and we group as tightly as possible to minimise the number of
//! units that have to be merged.

use itertools::Itertools;
use log::trace;
use smallvec::SmallVec;

use crate::lookup::{GlobalQubit, LocalQubit, QubitLookup, UnitId};

/// A contiguous range of local qubits inside one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRun {
    pub unit: UnitId,
    pub start: LocalQubit,
    pub length: usize,
}

impl BitRun {
    /// One past the last local qubit of the run.
    #[inline]
    pub fn end(&self) -> usize {
        self.start.index() + self.length
    }

    #[inline]
    pub fn locals(&self) -> std::ops::Range<usize> {
        self.start.index()..self.end()
    }
}

pub type BitList = SmallVec<[BitRun; 4]>;

/// Compile an order-preserving bit list for the global range `start..start + length`.
///
/// A run is only extended when the next global qubit sits directly above the end of the current
/// run in the same unit, so every run is an ascending local range and concatenating the runs
/// gives back the requested qubits in significance order.
pub fn ordered_bit_list(lookup: &QubitLookup, start: usize, length: usize) -> BitList {
    let mut list = BitList::new();
    for global in start..start + length {
        let loc = lookup.locate(GlobalQubit::from_index(global));
        match list.last_mut() {
            Some(run) if run.unit == loc.unit && run.end() == loc.local.index() => {
                run.length += 1;
            }
            _ => list.push(BitRun {
                unit: loc.unit,
                start: loc.local,
                length: 1,
            }),
        }
    }
    trace!(
        "ordered bit list for {}..{}: {} runs",
        start,
        start + length,
        list.len()
    );
    list
}

/// Compile a bit list for the global range `start..start + length` when bit order does not
/// matter.
///
/// Runs grow in either direction: a global qubit whose local index is directly above or
/// directly below the current run of the same unit joins it.
pub fn parallel_bit_list(lookup: &QubitLookup, start: usize, length: usize) -> BitList {
    let mut list = BitList::new();
    for global in start..start + length {
        let loc = lookup.locate(GlobalQubit::from_index(global));
        match list.last_mut() {
            Some(run) if run.unit == loc.unit && run.end() == loc.local.index() => {
                run.length += 1;
            }
            Some(run) if run.unit == loc.unit && run.start.index() == loc.local.index() + 1 => {
                run.start = loc.local;
                run.length += 1;
            }
            _ => list.push(BitRun {
                unit: loc.unit,
                start: loc.local,
                length: 1,
            }),
        }
    }
    trace!(
        "parallel bit list for {}..{}: {} runs",
        start,
        start + length,
        list.len()
    );
    list
}

/// Regroup a parallel bit list so that each unit appears in one stretch of the list, with its
/// runs sorted by local start and adjacent or overlapping runs coalesced.
///
/// Units keep the order of their first appearance, so the merge order that follows from the list
/// is deterministic.  The resulting local order says nothing about the requested global order.
pub fn optimize_parallel_bit_list(list: &mut BitList) {
    let units: SmallVec<[UnitId; 4]> = list.iter().map(|run| run.unit).unique().collect();
    let mut out = BitList::with_capacity(list.len());
    for unit in units {
        let runs = list
            .iter()
            .filter(|run| run.unit == unit)
            .sorted_by_key(|run| run.start);
        for run in runs {
            match out.last_mut() {
                Some(prev) if prev.unit == unit && prev.end() >= run.start.index() => {
                    prev.length = prev.end().max(run.end()) - prev.start.index();
                }
                _ => out.push(*run),
            }
        }
    }
    *list = out;
}

/// Compile an optimised parallel bit list for an arbitrary set of global qubits.
pub fn index_bit_list(lookup: &QubitLookup, indices: &[usize]) -> BitList {
    let mut list: BitList = indices
        .iter()
        .map(|&global| {
            let loc = lookup.locate(GlobalQubit::from_index(global));
            BitRun {
                unit: loc.unit,
                start: loc.local,
                length: 1,
            }
        })
        .collect();
    optimize_parallel_bit_list(&mut list);
    list
}

/// The distinct units named by a bit list, in order of first appearance.
pub fn list_units(list: &BitList) -> SmallVec<[UnitId; 4]> {
    list.iter().map(|run| run.unit).unique().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::QubitLocation;

    fn run(unit: u32, start: u32, length: usize) -> BitRun {
        BitRun {
            unit: UnitId(unit),
            start: LocalQubit(start),
            length,
        }
    }

    /// Build a table from `(unit, local)` pairs listed in global order.
    fn lookup_from(locations: &[(u32, u32)]) -> QubitLookup {
        let mut lookup = QubitLookup::new();
        for &(unit, local) in locations {
            lookup.push_qubit(QubitLocation {
                unit: UnitId(unit),
                local: LocalQubit(local),
            });
        }
        lookup
    }

    #[test]
    fn empty_request_gives_empty_list() {
        let lookup = lookup_from(&[(0, 0)]);
        assert!(ordered_bit_list(&lookup, 0, 0).is_empty());
        assert!(parallel_bit_list(&lookup, 1, 0).is_empty());
        assert!(index_bit_list(&lookup, &[]).is_empty());
    }

    #[test]
    fn single_unit_gives_single_run() {
        let lookup = lookup_from(&[(3, 0), (3, 1), (3, 2)]);
        let expected: BitList = [run(3, 0, 3)].into_iter().collect();
        assert_eq!(ordered_bit_list(&lookup, 0, 3), expected);
        assert_eq!(parallel_bit_list(&lookup, 0, 3), expected);
    }

    #[test]
    fn ordered_list_splits_on_unit_change_and_descent() {
        // 0 -> (0, 0), 1 -> (0, 1), 2 -> (1, 0), 3 -> (0, 3), 4 -> (0, 2)
        let lookup = lookup_from(&[(0, 0), (0, 1), (1, 0), (0, 3), (0, 2)]);
        let expected: BitList = [run(0, 0, 2), run(1, 0, 1), run(0, 3, 1), run(0, 2, 1)]
            .into_iter()
            .collect();
        assert_eq!(ordered_bit_list(&lookup, 0, 5), expected);
    }

    #[test]
    fn parallel_list_grows_downwards() {
        let lookup = lookup_from(&[(0, 3), (0, 2), (0, 1), (1, 0)]);
        let expected: BitList = [run(0, 1, 3), run(1, 0, 1)].into_iter().collect();
        assert_eq!(parallel_bit_list(&lookup, 0, 4), expected);
        assert_eq!(ordered_bit_list(&lookup, 0, 4).len(), 4);
    }

    #[test]
    fn optimize_groups_runs_by_unit() {
        let mut list: BitList = [
            run(2, 4, 1),
            run(5, 0, 2),
            run(2, 0, 2),
            run(5, 2, 1),
            run(2, 2, 2),
            run(2, 7, 1),
        ]
        .into_iter()
        .collect();
        optimize_parallel_bit_list(&mut list);
        let expected: BitList = [run(2, 0, 5), run(2, 7, 1), run(5, 0, 3)]
            .into_iter()
            .collect();
        assert_eq!(list, expected);
        assert_eq!(list_units(&list).as_slice(), &[UnitId(2), UnitId(5)]);
    }

    #[test]
    fn index_list_coalesces_out_of_order_indices() {
        let lookup = lookup_from(&[(0, 1), (1, 0), (0, 0)]);
        let expected: BitList = [run(0, 0, 2), run(1, 0, 1)].into_iter().collect();
        assert_eq!(index_bit_list(&lookup, &[2, 1, 0]), expected);
    }
}

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

//! Fusing units together and ordering the qubits of the fused unit.

use log::{debug, trace};
use qsep_state::{CoherentUnit, StateError};
use smallvec::SmallVec;

use crate::bit_list::{index_bit_list, list_units, ordered_bit_list, BitList};
use crate::error::PartitionError;
use crate::lookup::{GlobalQubit, LocalQubit, UnitId};
use crate::separated_unit::SeparatedUnit;

/// Sort key of a local qubit while a fused unit is reordered.  Locals below the requested block
/// keep their place, the requested qubits follow in requested order, and everything else keeps
/// its relative order above them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Below(usize),
    Requested(usize),
    Above(usize),
}

impl<U: CoherentUnit> SeparatedUnit<U> {
    /// Fuse every unit a bit list names into the first one, in order of first appearance.
    ///
    /// Returns the surviving unit, or `None` when the list is empty.
    pub(crate) fn merge_bit_list(
        &mut self,
        list: &BitList,
    ) -> Result<Option<UnitId>, PartitionError> {
        let units = list_units(list);
        let Some((&dest, sources)) = units.split_first() else {
            return Ok(None);
        };
        let mut width = 0;
        for &id in units.iter() {
            width += self.units.live(id)?.num_qubits();
        }
        if width > U::MAX_QUBITS {
            return Err(StateError::TooManyQubits(width).into());
        }
        for &src in sources {
            self.merge_units(dest, src)?;
        }
        Ok(Some(dest))
    }

    /// Append the qubits of `src` above those of `dest` and retire `src`.
    pub(crate) fn merge_units(&mut self, dest: UnitId, src: UnitId) -> Result<(), PartitionError> {
        if dest == src {
            return Ok(());
        }
        let (target, source) = self.units.live_pair(dest, src)?;
        let source_width = source.num_qubits();
        let offset = target.compose(source)?;
        self.units.remove(src);
        self.lookup.absorb(dest, src, offset);
        debug!(
            "merged unit {} ({} qubits) into unit {} at local {}",
            src, source_width, dest, offset
        );
        Ok(())
    }

    /// Bring the global ranges `(start, length)` into one unit, contiguous and in the given
    /// order, and return that unit with the local index of the first requested qubit.
    ///
    /// The requested qubits of all ranges are laid out back to back, so a register op that needs
    /// an input and an output register gets them as one block.  Returns `None` when every range
    /// is empty.
    pub(crate) fn entangle_ordered(
        &mut self,
        ranges: &[(usize, usize)],
    ) -> Result<Option<(UnitId, LocalQubit)>, PartitionError> {
        let num_qubits = self.num_qubits();
        let mut claimed = vec![false; num_qubits];
        for &(start, length) in ranges {
            self.check_range(start, length)?;
            for global in start..start + length {
                if claimed[global] {
                    return Err(PartitionError::OverlappingRanges(global));
                }
                claimed[global] = true;
            }
        }

        let mut list = BitList::new();
        for &(start, length) in ranges {
            list.extend(ordered_bit_list(&self.lookup, start, length));
        }
        let Some(unit) = self.merge_bit_list(&list)? else {
            return Ok(None);
        };

        let requested: SmallVec<[GlobalQubit; 16]> = ranges
            .iter()
            .flat_map(|&(start, length)| start..start + length)
            .map(GlobalQubit::from_index)
            .collect();
        let mut rank = vec![None; num_qubits];
        for (position, global) in requested.iter().enumerate() {
            rank[global.index()] = Some(position);
        }
        let base = requested
            .iter()
            .map(|global| self.lookup.locate(*global).local.index())
            .min()
            .unwrap_or_default();

        let mut keys: Vec<SortKey> = self
            .lookup
            .unit_qubits(unit)
            .iter()
            .enumerate()
            .map(|(local, global)| match rank[global.index()] {
                Some(position) => SortKey::Requested(position),
                None if local < base => SortKey::Below(local),
                None => SortKey::Above(local),
            })
            .collect();
        if keys.windows(2).all(|pair| pair[0] <= pair[1]) {
            return Ok(Some((unit, LocalQubit::from_index(base))));
        }
        let last = keys.len() - 1;
        self.quick_sort_locals(unit, &mut keys, 0, last)?;
        Ok(Some((unit, LocalQubit::from_index(base))))
    }

    /// Bring an arbitrary set of global qubits into one unit, in no particular local order.
    pub(crate) fn entangle_indices(&mut self, indices: &[usize]) -> Result<UnitId, PartitionError> {
        for (i, &qubit) in indices.iter().enumerate() {
            self.check_qubit(qubit)?;
            if indices[..i].contains(&qubit) {
                return Err(PartitionError::DuplicateQubit(qubit));
            }
        }
        let list = index_bit_list(&self.lookup, indices);
        self.merge_bit_list(&list)?.ok_or(PartitionError::ZeroLength)
    }

    /// Hoare quicksort of the locals `lo..=hi` of `unit` by `keys`.  Every exchange is applied to
    /// the unit and the table together.
    fn quick_sort_locals(
        &mut self,
        unit: UnitId,
        keys: &mut [SortKey],
        lo: usize,
        hi: usize,
    ) -> Result<(), PartitionError> {
        if lo >= hi {
            return Ok(());
        }
        let pivot = keys[lo + (hi - lo) / 2];
        let (mut i, mut j) = (lo, hi);
        loop {
            while keys[i] < pivot {
                i += 1;
            }
            while keys[j] > pivot {
                j -= 1;
            }
            if i >= j {
                break;
            }
            self.swap_unit_locals(unit, i, j)?;
            keys.swap(i, j);
            i += 1;
            j -= 1;
        }
        self.quick_sort_locals(unit, keys, lo, j)?;
        self.quick_sort_locals(unit, keys, j + 1, hi)
    }

    /// Exchange two locals of `unit` in the unit and the table as one step.
    pub(crate) fn swap_unit_locals(
        &mut self,
        unit: UnitId,
        a: usize,
        b: usize,
    ) -> Result<(), PartitionError> {
        if a == b {
            return Ok(());
        }
        self.units.live_mut(unit)?.swap(a, b)?;
        self.lookup
            .swap_local(unit, LocalQubit::from_index(a), LocalQubit::from_index(b))?;
        trace!("swapped locals {} and {} of unit {}", a, b, unit);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::PartitionError;
    use crate::lookup::GlobalQubit;
    use crate::SeparatedUnit;
    use crate::SeparatedConfig;
    use qsep_state::{CoherentUnit, StateError};

    fn engine(num_qubits: usize, permutation: u64) -> SeparatedUnit {
        SeparatedUnit::with_config(num_qubits, permutation, SeparatedConfig::with_seed(7)).unwrap()
    }

    fn locals(engine: &SeparatedUnit, globals: &[usize]) -> Vec<usize> {
        globals
            .iter()
            .map(|&g| engine.location(g).unwrap().local.index())
            .collect()
    }

    #[test]
    fn merge_appends_source_locals() {
        let mut engine = engine(3, 0b110);
        let a = engine.location(0).unwrap().unit;
        let b = engine.location(2).unwrap().unit;
        engine.merge_units(a, b).unwrap();
        assert_eq!(engine.num_units(), 2);
        assert_eq!(engine.location(2).unwrap().unit, a);
        assert_eq!(locals(&engine, &[0, 2]), vec![0, 1]);
        engine.check_invariants().unwrap();
        assert_eq!(engine.m_reg(0, 3).unwrap(), 0b110);
    }

    #[test]
    fn merge_with_itself_is_a_noop() {
        let mut engine = engine(2, 0);
        let a = engine.location(1).unwrap().unit;
        engine.merge_units(a, a).unwrap();
        assert_eq!(engine.num_units(), 2);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn oversized_merge_fails_before_fusing() {
        let mut engine = engine(41, 0);
        assert!(matches!(
            engine.entangle_ordered(&[(0, 41)]),
            Err(PartitionError::State(StateError::TooManyQubits(41)))
        ));
        assert_eq!(engine.num_units(), 41);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn oversized_merge_keeps_the_source_unit() {
        let mut engine = engine(41, 0);
        let (a, _) = engine.entangle_ordered(&[(0, 21)]).unwrap().unwrap();
        let (b, _) = engine.entangle_ordered(&[(21, 20)]).unwrap().unwrap();
        assert_eq!(
            engine.merge_units(a, b),
            Err(PartitionError::State(StateError::TooManyQubits(41)))
        );
        assert_eq!(engine.num_units(), 2);
        assert_eq!(engine.units.get(b).unwrap().num_qubits(), 20);
        assert_eq!(engine.location(40).unwrap().unit, b);
        engine.check_invariants().unwrap();
        assert!(matches!(
            engine.clone_raw_state(),
            Err(PartitionError::State(StateError::TooManyQubits(41)))
        ));
    }

    #[test]
    fn ordered_entangle_reverses_a_descending_register() {
        let mut engine = engine(4, 0b0011);
        // Fuse in reverse so that global 3 sits at local 0 and global 0 at local 3.
        engine.entangle_ordered(&[(3, 1), (2, 1), (1, 1), (0, 1)]).unwrap();
        assert_eq!(locals(&engine, &[3, 2, 1, 0]), vec![0, 1, 2, 3]);
        let (unit, base) = engine.entangle_ordered(&[(0, 4)]).unwrap().unwrap();
        assert_eq!(base.index(), 0);
        assert_eq!(locals(&engine, &[0, 1, 2, 3]), vec![0, 1, 2, 3]);
        assert_eq!(engine.units.get(unit).unwrap().num_qubits(), 4);
        engine.check_invariants().unwrap();
        assert_eq!(engine.m_reg(0, 4).unwrap(), 0b0011);
    }

    #[test]
    fn ordered_entangle_keeps_unrequested_locals_below_base() {
        let mut engine = engine(4, 0b1001);
        engine.entangle_ordered(&[(0, 1), (3, 1), (1, 1), (2, 1)]).unwrap();
        // Locals are now [g0, g3, g1, g2]; request g2 then g1.
        let (_, base) = engine.entangle_ordered(&[(2, 1), (1, 1)]).unwrap().unwrap();
        assert_eq!(base.index(), 2);
        assert_eq!(locals(&engine, &[0, 3, 2, 1]), vec![0, 1, 2, 3]);
        engine.check_invariants().unwrap();
        assert_eq!(engine.m_reg(0, 4).unwrap(), 0b1001);
    }

    #[test]
    fn ordered_entangle_rejects_overlap() {
        let mut engine = engine(4, 0);
        assert_eq!(
            engine.entangle_ordered(&[(0, 2), (1, 2)]),
            Err(crate::PartitionError::OverlappingRanges(1))
        );
        assert_eq!(engine.num_units(), 4);
    }

    #[test]
    fn empty_request_entangles_nothing() {
        let mut engine = engine(2, 0);
        assert_eq!(engine.entangle_ordered(&[(1, 0)]).unwrap(), None);
        assert_eq!(engine.num_units(), 2);
    }

    #[test]
    fn index_entangle_fuses_in_first_appearance_order() {
        let mut engine = engine(3, 0);
        let first = engine.location(2).unwrap().unit;
        let unit = engine.entangle_indices(&[2, 0]).unwrap();
        assert_eq!(unit, first);
        assert_eq!(engine.lookup.unit_qubits(unit), &[GlobalQubit(2), GlobalQubit(0)]);
        assert_eq!(engine.num_units(), 2);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn index_entangle_rejects_duplicates() {
        let mut engine = engine(3, 0);
        assert_eq!(
            engine.entangle_indices(&[1, 1]),
            Err(crate::PartitionError::DuplicateQubit(1))
        );
    }
}

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

use std::fmt;

use hashbrown::HashMap;

use crate::error::PartitionError;

/// A newtype for the different categories of index used by the partition tables.  Global qubits,
/// local qubits and unit handles are all small integers, and mixing them up silently produces
/// wrong physics rather than a crash, so every table lookup is typed by the index it expects.
macro_rules! index_newtype {
    ($(#[$meta:meta])* $id: ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $id(pub u32);

        impl $id {
            /// Placeholder for a slot that holds no valid index.
            pub const MAX: Self = $id(u32::MAX);

            #[inline]
            pub fn new(val: u32) -> Self {
                Self(val)
            }
            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
            #[inline]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_newtype!(
    /// Index of a qubit in the whole register.
    GlobalQubit
);
index_newtype!(
    /// Index of a qubit inside the coherent unit that currently holds it.
    LocalQubit
);
index_newtype!(
    /// Stable handle of a live coherent unit.
    UnitId
);

/// Where a global qubit currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QubitLocation {
    pub unit: UnitId,
    pub local: LocalQubit,
}

/// Bidirectional map between global qubits and `(unit, local)` positions.
///
/// Every mutating method updates both directions before returning, so a caller never observes a
/// half-applied change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QubitLookup {
    global_to_local: Vec<QubitLocation>,
    local_to_global: HashMap<UnitId, Vec<GlobalQubit>>,
}

impl QubitLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_qubits(&self) -> usize {
        self.global_to_local.len()
    }

    /// The number of units that own at least one qubit.
    pub fn num_units(&self) -> usize {
        self.local_to_global.len()
    }

    #[inline]
    pub fn locate(&self, global: GlobalQubit) -> QubitLocation {
        self.global_to_local[global.index()]
    }

    #[inline]
    pub fn global(&self, unit: UnitId, local: LocalQubit) -> GlobalQubit {
        self.local_to_global[&unit][local.index()]
    }

    /// The global qubits held by `unit`, indexed by local qubit.
    pub fn unit_qubits(&self, unit: UnitId) -> &[GlobalQubit] {
        self.local_to_global
            .get(&unit)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterator of `(GlobalQubit, QubitLocation)` pairs, in order of the global indices.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (GlobalQubit, QubitLocation)> + '_ {
        self.global_to_local
            .iter()
            .enumerate()
            .map(|(g, loc)| (GlobalQubit::from_index(g), *loc))
    }

    pub fn clear(&mut self) {
        self.global_to_local.clear();
        self.local_to_global.clear();
    }

    /// Append a new global qubit at the end of the index space, living at `location`.
    pub fn push_qubit(&mut self, location: QubitLocation) -> GlobalQubit {
        let global = GlobalQubit::from_index(self.global_to_local.len());
        self.global_to_local.push(location);
        self.set_inverse(location, global);
        global
    }

    /// Append `width` new global qubits mapped in order onto the locals of a fresh `unit`.
    /// Returns the first new global index.
    pub fn push_unit(&mut self, unit: UnitId, width: usize) -> GlobalQubit {
        let start = GlobalQubit::from_index(self.global_to_local.len());
        for local in 0..width {
            self.push_qubit(QubitLocation {
                unit,
                local: LocalQubit::from_index(local),
            });
        }
        start
    }

    /// Point `global` at `(unit, local)`, releasing the slot it occupied before.
    pub fn relocate(&mut self, global: GlobalQubit, unit: UnitId, local: LocalQubit) {
        let old = self.global_to_local[global.index()];
        if let Some(slots) = self.local_to_global.get_mut(&old.unit) {
            if slots.get(old.local.index()) == Some(&global) {
                slots[old.local.index()] = GlobalQubit::MAX;
            }
        }
        let location = QubitLocation { unit, local };
        self.global_to_local[global.index()] = location;
        self.set_inverse(location, global);
    }

    /// Move every qubit of `src` into `dest`, shifting its locals up by `offset`.  `src` no longer
    /// appears in the table afterwards.
    pub fn absorb(&mut self, dest: UnitId, src: UnitId, offset: usize) {
        let Some(moved) = self.local_to_global.remove(&src) else {
            return;
        };
        for (local, global) in moved.into_iter().enumerate() {
            self.relocate(global, dest, LocalQubit::from_index(offset + local));
        }
    }

    /// Mirror an exchange of two local qubits inside `unit`.
    pub fn swap_local(
        &mut self,
        unit: UnitId,
        a: LocalQubit,
        b: LocalQubit,
    ) -> Result<(), PartitionError> {
        let slots = self
            .local_to_global
            .get_mut(&unit)
            .ok_or_else(|| PartitionError::Inconsistent(format!("unit {unit} has no locals")))?;
        let width = slots.len();
        if a.index() >= width || b.index() >= width {
            return Err(PartitionError::Inconsistent(format!(
                "locals {a} and {b} do not both exist in {width}-qubit unit {unit}"
            )));
        }
        slots.swap(a.index(), b.index());
        let (global_a, global_b) = (slots[a.index()], slots[b.index()]);
        self.global_to_local[global_a.index()].local = a;
        self.global_to_local[global_b.index()].local = b;
        Ok(())
    }

    /// Exchange the physical positions of two global qubits without touching any unit.
    pub fn swap_global(&mut self, a: GlobalQubit, b: GlobalQubit) {
        let loc_a = self.global_to_local[a.index()];
        let loc_b = self.global_to_local[b.index()];
        self.global_to_local.swap(a.index(), b.index());
        self.set_inverse(loc_a, b);
        self.set_inverse(loc_b, a);
    }

    /// Remove the locals `local_start..local_start + length` of `unit` from the table.
    ///
    /// The remaining locals of `unit` shift down to close the gap, the removed global qubits
    /// disappear, and every later global index shifts down so the index space stays contiguous.
    /// A unit left with no qubits is dropped from the table.  Returns the removed globals, in
    /// local order, as they were numbered before the call.
    pub fn detach(&mut self, unit: UnitId, local_start: usize, length: usize) -> Vec<GlobalQubit> {
        let Some(slots) = self.local_to_global.get_mut(&unit) else {
            return Vec::new();
        };
        let removed: Vec<GlobalQubit> = slots.drain(local_start..local_start + length).collect();
        for (local, global) in slots.iter().enumerate().skip(local_start) {
            self.global_to_local[global.index()].local = LocalQubit::from_index(local);
        }
        if slots.is_empty() {
            self.local_to_global.remove(&unit);
        }

        let mut is_removed = vec![false; self.global_to_local.len()];
        for global in removed.iter() {
            is_removed[global.index()] = true;
        }
        let mut renumber = Vec::with_capacity(is_removed.len());
        let mut next = 0;
        for gone in is_removed.iter() {
            renumber.push(GlobalQubit::from_index(next));
            if !gone {
                next += 1;
            }
        }
        let mut g = 0;
        self.global_to_local.retain(|_| {
            let keep = !is_removed[g];
            g += 1;
            keep
        });
        for slots in self.local_to_global.values_mut() {
            for global in slots.iter_mut() {
                *global = renumber[global.index()];
            }
        }
        removed
    }

    /// Validate both directions of the table against the widths of the live units.
    ///
    /// `width_of` returns the width of a live unit, or `None` for a handle that names no unit;
    /// `num_live_units` is the number of units the owner holds.
    pub fn check<F>(&self, width_of: F, num_live_units: usize) -> Result<(), PartitionError>
    where
        F: Fn(UnitId) -> Option<usize>,
    {
        let inconsistent =
            |msg: String| -> Result<(), PartitionError> { Err(PartitionError::Inconsistent(msg)) };
        for (global, location) in self.iter() {
            let Some(slots) = self.local_to_global.get(&location.unit) else {
                return inconsistent(format!(
                    "qubit {global} points at unit {} with no inverse entry",
                    location.unit
                ));
            };
            if slots.get(location.local.index()) != Some(&global) {
                return inconsistent(format!(
                    "qubit {global} points at local {} of unit {}, which maps elsewhere",
                    location.local, location.unit
                ));
            }
        }
        if self.local_to_global.len() != num_live_units {
            return inconsistent(format!(
                "{} units own qubits, but {num_live_units} units are live",
                self.local_to_global.len()
            ));
        }
        let mut total = 0;
        for (unit, slots) in self.local_to_global.iter() {
            match width_of(*unit) {
                None => return inconsistent(format!("unit {unit} is not live")),
                Some(0) => return inconsistent(format!("unit {unit} has zero width")),
                Some(width) if width != slots.len() => {
                    return inconsistent(format!(
                        "unit {unit} has width {width}, but {} locals are mapped",
                        slots.len()
                    ))
                }
                Some(_) => (),
            }
            for (local, global) in slots.iter().enumerate() {
                let expected = QubitLocation {
                    unit: *unit,
                    local: LocalQubit::from_index(local),
                };
                if self.global_to_local.get(global.index()) != Some(&expected) {
                    return inconsistent(format!(
                        "local {local} of unit {unit} maps to qubit {global}, which points elsewhere"
                    ));
                }
            }
            total += slots.len();
        }
        if total != self.global_to_local.len() {
            return inconsistent(format!(
                "units hold {total} qubits, but the register has {}",
                self.global_to_local.len()
            ));
        }
        Ok(())
    }

    fn set_inverse(&mut self, location: QubitLocation, global: GlobalQubit) {
        let slots = self.local_to_global.entry(location.unit).or_default();
        if slots.len() <= location.local.index() {
            slots.resize(location.local.index() + 1, GlobalQubit::MAX);
        }
        slots[location.local.index()] = global;
    }
}

#[cfg(test)]
mod test_lookup {
    use super::*;

    fn loc(unit: u32, local: u32) -> QubitLocation {
        QubitLocation {
            unit: UnitId(unit),
            local: LocalQubit(local),
        }
    }

    fn widths(lookup: &QubitLookup) -> impl Fn(UnitId) -> Option<usize> + '_ {
        |unit| Some(lookup.unit_qubits(unit).len()).filter(|w| *w > 0)
    }

    #[test]
    fn push_unit_maps_in_order() {
        let mut lookup = QubitLookup::new();
        assert_eq!(lookup.push_unit(UnitId(0), 2), GlobalQubit(0));
        assert_eq!(lookup.push_unit(UnitId(1), 1), GlobalQubit(2));
        assert_eq!(lookup.locate(GlobalQubit(1)), loc(0, 1));
        assert_eq!(lookup.global(UnitId(1), LocalQubit(0)), GlobalQubit(2));
        assert_eq!(lookup.num_units(), 2);
        lookup.check(widths(&lookup), 2).unwrap();
    }

    #[test]
    fn absorb_appends_after_destination() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 2);
        lookup.push_unit(UnitId(1), 2);
        lookup.absorb(UnitId(0), UnitId(1), 2);
        assert_eq!(lookup.locate(GlobalQubit(3)), loc(0, 3));
        assert_eq!(
            lookup.unit_qubits(UnitId(0)),
            &[GlobalQubit(0), GlobalQubit(1), GlobalQubit(2), GlobalQubit(3)]
        );
        assert!(lookup.unit_qubits(UnitId(1)).is_empty());
        lookup.check(widths(&lookup), 1).unwrap();
    }

    #[test]
    fn swap_local_updates_both_directions() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(4), 3);
        lookup
            .swap_local(UnitId(4), LocalQubit(0), LocalQubit(2))
            .unwrap();
        assert_eq!(lookup.locate(GlobalQubit(0)), loc(4, 2));
        assert_eq!(lookup.locate(GlobalQubit(2)), loc(4, 0));
        assert_eq!(lookup.global(UnitId(4), LocalQubit(0)), GlobalQubit(2));
        lookup.check(widths(&lookup), 1).unwrap();
    }

    #[test]
    fn swap_local_rejects_unknown_unit_and_local() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 2);
        assert!(matches!(
            lookup.swap_local(UnitId(1), LocalQubit(0), LocalQubit(1)),
            Err(PartitionError::Inconsistent(_))
        ));
        assert!(matches!(
            lookup.swap_local(UnitId(0), LocalQubit(0), LocalQubit(2)),
            Err(PartitionError::Inconsistent(_))
        ));
        assert_eq!(lookup.locate(GlobalQubit(0)), loc(0, 0));
        lookup.check(widths(&lookup), 1).unwrap();
    }

    #[test]
    fn swap_global_relabels_across_units() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 1);
        lookup.push_unit(UnitId(1), 1);
        lookup.swap_global(GlobalQubit(0), GlobalQubit(1));
        assert_eq!(lookup.locate(GlobalQubit(0)), loc(1, 0));
        assert_eq!(lookup.locate(GlobalQubit(1)), loc(0, 0));
        lookup.check(widths(&lookup), 2).unwrap();
    }

    #[test]
    fn detach_compacts_locals_and_globals() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 1);
        lookup.push_unit(UnitId(1), 3);
        lookup.push_unit(UnitId(2), 1);
        let removed = lookup.detach(UnitId(1), 1, 1);
        assert_eq!(removed, vec![GlobalQubit(2)]);
        assert_eq!(lookup.num_qubits(), 4);
        assert_eq!(lookup.locate(GlobalQubit(2)), loc(1, 1));
        assert_eq!(lookup.locate(GlobalQubit(3)), loc(2, 0));
        assert_eq!(lookup.unit_qubits(UnitId(1)), &[GlobalQubit(1), GlobalQubit(2)]);
        lookup.check(widths(&lookup), 3).unwrap();
    }

    #[test]
    fn detach_whole_unit_drops_it() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 1);
        lookup.push_unit(UnitId(1), 2);
        lookup.detach(UnitId(0), 0, 1);
        assert_eq!(lookup.num_units(), 1);
        assert_eq!(lookup.locate(GlobalQubit(0)), loc(1, 0));
        lookup.check(widths(&lookup), 1).unwrap();
    }

    #[test]
    fn check_catches_divergence() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 2);
        lookup.global_to_local[1].local = LocalQubit(0);
        assert!(matches!(
            lookup.check(widths(&lookup), 1),
            Err(PartitionError::Inconsistent(_))
        ));
    }

    #[test]
    fn check_catches_width_mismatch() {
        let mut lookup = QubitLookup::new();
        lookup.push_unit(UnitId(0), 2);
        assert!(matches!(
            lookup.check(|_| Some(3), 1),
            Err(PartitionError::Inconsistent(_))
        ));
        assert!(matches!(
            lookup.check(|_| Some(2), 2),
            Err(PartitionError::Inconsistent(_))
        ));
    }
}

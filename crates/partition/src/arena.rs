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

use crate::error::PartitionError;
use crate::lookup::UnitId;

/// Owner of the live coherent units, addressed by stable [UnitId] handles.
///
/// Removing a unit frees its slot without moving any other unit, so handles held in the lookup
/// tables never go stale.  Freed slots are reused last-in first-out, which keeps handle
/// assignment deterministic for a given sequence of operations.
#[derive(Clone, Debug)]
pub struct UnitArena<U> {
    slots: Vec<Option<U>>,
    free: Vec<UnitId>,
    len: usize,
}

impl<U> Default for UnitArena<U> {
    fn default() -> Self {
        UnitArena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<U> UnitArena<U> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of live units.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, unit: U) -> UnitId {
        self.len += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(unit);
                id
            }
            None => {
                self.slots.push(Some(unit));
                UnitId::from_index(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, id: UnitId) -> Option<U> {
        let unit = self.slots.get_mut(id.index())?.take()?;
        self.len -= 1;
        self.free.push(id);
        Some(unit)
    }

    #[inline]
    pub fn get(&self, id: UnitId) -> Option<&U> {
        self.slots.get(id.index())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut U> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Like [UnitArena::get], but a dead handle is reported as a broken table.
    pub fn live(&self, id: UnitId) -> Result<&U, PartitionError> {
        self.get(id)
            .ok_or_else(|| PartitionError::Inconsistent(format!("unit {id} is not live")))
    }

    pub fn live_mut(&mut self, id: UnitId) -> Result<&mut U, PartitionError> {
        self.get_mut(id)
            .ok_or_else(|| PartitionError::Inconsistent(format!("unit {id} is not live")))
    }

    /// Mutable access to `dest` alongside shared access to `src`.  The handles must differ.
    pub fn live_pair(&mut self, dest: UnitId, src: UnitId) -> Result<(&mut U, &U), PartitionError> {
        let dead = |id: UnitId| PartitionError::Inconsistent(format!("unit {id} is not live"));
        let (d, s) = (dest.index(), src.index());
        if d == s {
            return Err(PartitionError::Inconsistent(format!(
                "unit {dest} cannot be paired with itself"
            )));
        }
        if d.max(s) >= self.slots.len() {
            return Err(dead(if d > s { dest } else { src }));
        }
        let (dest_slot, src_slot) = if d < s {
            let (low, high) = self.slots.split_at_mut(s);
            (&mut low[d], &high[0])
        } else {
            let (low, high) = self.slots.split_at_mut(d);
            (&mut high[0], &low[s])
        };
        match (dest_slot.as_mut(), src_slot.as_ref()) {
            (Some(dest_unit), Some(src_unit)) => Ok((dest_unit, src_unit)),
            (None, _) => Err(dead(dest)),
            (_, None) => Err(dead(src)),
        }
    }

    /// Iterator over the live units in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &U)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|unit| (UnitId::from_index(i), unit)))
    }

    /// Remove every unit, yielding them in handle order.
    pub fn drain(&mut self) -> impl Iterator<Item = (UnitId, U)> + '_ {
        self.len = 0;
        self.free.clear();
        self.slots
            .drain(..)
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|unit| (UnitId::from_index(i), unit)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn handles_survive_removal() {
        let mut arena = UnitArena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        let c = arena.insert("c");
        assert_eq!(arena.remove(b), Some("b"));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(c), Some(&"c"));
        assert_eq!(arena.get(b), None);
        assert_eq!(arena.remove(b), None);
    }

    #[test]
    fn freed_slots_are_reused_lifo() {
        let mut arena = UnitArena::new();
        let ids: Vec<UnitId> = (0..4).map(|i| arena.insert(i)).collect();
        arena.remove(ids[1]);
        arena.remove(ids[2]);
        assert_eq!(arena.insert(10), ids[2]);
        assert_eq!(arena.insert(11), ids[1]);
        assert_eq!(arena.insert(12), UnitId(4));
        assert_eq!(
            arena.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec![0, 11, 10, 3, 12]
        );
    }

    #[test]
    fn live_pair_splits_borrows() {
        let mut arena = UnitArena::new();
        let a = arena.insert(String::from("a"));
        let b = arena.insert(String::from("b"));
        let (dest, src) = arena.live_pair(b, a).unwrap();
        dest.push_str(src);
        assert_eq!(arena.get(b).map(String::as_str), Some("ba"));
        arena.remove(a);
        assert!(matches!(
            arena.live_pair(b, a),
            Err(PartitionError::Inconsistent(_))
        ));
        assert!(matches!(
            arena.live_pair(b, b),
            Err(PartitionError::Inconsistent(_))
        ));
        assert!(matches!(
            arena.live_pair(b, UnitId(9)),
            Err(PartitionError::Inconsistent(_))
        ));
    }

    #[test]
    fn drain_empties_the_arena() {
        let mut arena = UnitArena::new();
        arena.insert('x');
        let y = arena.insert('y');
        arena.remove(y);
        arena.insert('z');
        let drained: Vec<_> = arena.drain().collect();
        assert_eq!(drained, vec![(UnitId(0), 'x'), (UnitId(1), 'z')]);
        assert!(arena.is_empty());
        assert_eq!(arena.insert('w'), UnitId(0));
    }
}

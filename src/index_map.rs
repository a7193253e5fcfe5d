use crate::errors::{SimulatorError, SimulatorResult};
use crate::types::{QubitId, Slot};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Bijection between live qubit ids and the bit positions (slots) they occupy in the amplitude
/// index. The inverse direction is kept alongside so swaps are O(1).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QubitIndexMap {
    slots: BTreeMap<QubitId, Slot>,
    ids: Vec<QubitId>,
}

impl QubitIndexMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live qubits.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no qubits are allocated.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True if `id` is live.
    pub fn contains(&self, id: QubitId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Slot currently holding `id`.
    pub fn slot(&self, id: QubitId) -> SimulatorResult<Slot> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(SimulatorError::UnknownId(id))
    }

    /// Id held at `slot`.
    pub fn id_at(&self, slot: Slot) -> Option<QubitId> {
        self.ids.get(slot).copied()
    }

    /// Slots for each of `ids`, in order.
    pub fn slots_of(&self, ids: &[QubitId]) -> SimulatorResult<SmallVec<[Slot; 8]>> {
        ids.iter().map(|id| self.slot(*id)).collect()
    }

    /// Bitmask over the slots of `ids`.
    pub fn mask_of(&self, ids: &[QubitId]) -> SimulatorResult<usize> {
        ids.iter()
            .try_fold(0, |acc, id| self.slot(*id).map(|slot| acc | (1 << slot)))
    }

    /// Place `id` in the next free slot.
    pub fn allocate(&mut self, id: QubitId) -> SimulatorResult<Slot> {
        if self.contains(id) {
            return Err(SimulatorError::DuplicateId(id));
        }
        let slot = self.ids.len();
        self.slots.insert(id, slot);
        self.ids.push(id);
        Ok(slot)
    }

    /// Remove `id`, moving every higher slot down by one. Returns the slot `id` occupied.
    pub fn deallocate(&mut self, id: QubitId) -> SimulatorResult<Slot> {
        let slot = self.slots.remove(&id).ok_or(SimulatorError::UnknownId(id))?;
        self.ids.remove(slot);
        self.slots
            .values_mut()
            .filter(|s| **s > slot)
            .for_each(|s| *s -= 1);
        Ok(slot)
    }

    /// Exchange the slots of two live qubits.
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> SimulatorResult<()> {
        let slot_a = self.slot(a)?;
        let slot_b = self.slot(b)?;
        self.slots.insert(a, slot_b);
        self.slots.insert(b, slot_a);
        self.ids.swap(slot_a, slot_b);
        Ok(())
    }

    /// True if `ids` names every live qubit exactly once.
    pub fn is_permutation(&self, ids: &[QubitId]) -> bool {
        ids.len() == self.len()
            && self
                .mask_of(ids)
                .map(|mask| mask.count_ones() as usize == self.len())
                .unwrap_or(false)
    }

    /// Reassign slots so that `ordering[i]` sits at slot `i`. `ordering` must be a permutation of
    /// the live ids.
    pub fn reorder(&mut self, ordering: &[QubitId]) -> SimulatorResult<()> {
        if !self.is_permutation(ordering) {
            return Err(SimulatorError::InvalidPermutation);
        }
        ordering.iter().enumerate().for_each(|(slot, id)| {
            self.slots.insert(*id, slot);
        });
        self.ids = ordering.to_vec();
        Ok(())
    }

    /// Id to slot mapping, ordered by id.
    pub fn to_map(&self) -> BTreeMap<QubitId, Slot> {
        self.slots.clone()
    }

    /// Live ids ordered by slot.
    pub fn ids_by_slot(&self) -> &[QubitId] {
        &self.ids
    }
}

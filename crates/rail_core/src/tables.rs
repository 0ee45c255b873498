//! Bounded entity arenas addressed by small integer handles.

use serde::{Deserialize, Serialize};

use crate::{Pos, Switch, SwitchDef, SwitchId, Train, TrainId, TrainOutcome, TrainSlot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTable {
    slots: Vec<TrainSlot>,
}

impl TrainTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![TrainSlot::Free; capacity],
        }
    }

    pub fn slots(&self) -> &[TrainSlot] {
        &self.slots
    }

    /// First never-used slot. Retired slots are not handed out again.
    pub fn free_slot(&self) -> Option<TrainId> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, TrainSlot::Free))
            .map(TrainId)
    }

    /// Places `train` in its slot. Fails unless the slot is free.
    pub fn insert(&mut self, train: Train) -> bool {
        match self.slots.get_mut(train.id.0) {
            Some(slot) if matches!(slot, TrainSlot::Free) => {
                *slot = TrainSlot::Active(train);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: TrainId) -> Option<&Train> {
        match self.slots.get(id.0) {
            Some(TrainSlot::Active(train)) => Some(train),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        match self.slots.get_mut(id.0) {
            Some(TrainSlot::Active(train)) => Some(train),
            _ => None,
        }
    }

    /// Active trains in slot order.
    pub fn active(&self) -> impl Iterator<Item = &Train> {
        self.slots.iter().filter_map(|slot| match slot {
            TrainSlot::Active(train) => Some(train),
            _ => None,
        })
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut Train> {
        self.slots.iter_mut().filter_map(|slot| match slot {
            TrainSlot::Active(train) => Some(train),
            _ => None,
        })
    }

    pub fn active_ids(&self) -> Vec<TrainId> {
        self.active().map(|train| train.id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn occupant(&self, pos: Pos) -> Option<TrainId> {
        self.active().find(|train| train.pos == pos).map(|train| train.id)
    }

    pub fn is_occupied(&self, pos: Pos) -> bool {
        self.occupant(pos).is_some()
    }

    /// Moves an active train to its terminal slot state, returning it.
    pub fn retire(&mut self, id: TrainId, outcome: TrainOutcome, tick: u64) -> Option<Train> {
        let slot = self.slots.get_mut(id.0)?;
        if !matches!(slot, TrainSlot::Active(_)) {
            return None;
        }
        match std::mem::replace(slot, TrainSlot::Retired { outcome, tick }) {
            TrainSlot::Active(train) => Some(train),
            _ => None,
        }
    }
}

/// One optional switch per letter A–Z.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchTable {
    slots: Vec<Option<Switch>>,
}

impl Default for SwitchTable {
    fn default() -> Self {
        Self {
            slots: vec![None; SwitchId::COUNT],
        }
    }
}

impl SwitchTable {
    pub fn from_defs(defs: &[SwitchDef]) -> Self {
        let mut table = Self::default();
        for def in defs {
            let Some(id) = SwitchId::from_letter(def.letter) else {
                continue;
            };
            table.slots[id.index()] = Some(Switch {
                id,
                mode: def.mode,
                state: def.initial_state.min(1),
                counters: [0; 4],
                thresholds: def.k_values,
                pending_flip: false,
                signal: crate::Signal::Green,
            });
        }
        table
    }

    pub fn get(&self, id: SwitchId) -> Option<&Switch> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SwitchId) -> Option<&mut Switch> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Defined switches in letter order.
    pub fn iter(&self) -> impl Iterator<Item = &Switch> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Switch> {
        self.slots.iter_mut().flatten()
    }
}

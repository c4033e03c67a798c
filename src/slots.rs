// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use serde::{Deserialize, Serialize};

use crate::document::{lenient, lenient_items};

/// A stored snapshot. `values` is parallel to the bound parameter list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default, deserialize_with = "lenient")]
    used: bool,
    #[serde(default, deserialize_with = "lenient_items")]
    values: Vec<f32>,
}

impl Slot {
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Marks the slot used and replaces its values.
    pub fn store<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f32>,
    {
        self.used = true;
        self.values.clear();
        self.values.extend(values);
    }

    /// Marks the slot unused and drops its values.
    pub fn clear(&mut self) {
        self.used = false;
        self.values.clear();
    }

    /// Appends a value for a newly bound column.
    pub fn push(&mut self, value: f32) {
        self.values.push(value);
    }

    /// Pads with zeros or truncates so a used slot matches `columns`.
    pub fn align(&mut self, columns: usize) {
        if self.used {
            self.values.resize(columns, 0.0);
        } else {
            self.values.clear();
        }
    }
}

/// The fixed-size set of slots owned by one instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotBank {
    slots: Vec<Slot>,
}

impl SlotBank {
    pub fn new(count: usize) -> SlotBank {
        SlotBank {
            slots: vec![Slot::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(Slot::clear);
    }

    /// Replaces the contents from persisted slots. Extra entries are ignored and
    /// missing ones are left empty.
    pub fn restore(&mut self, slots: &[Slot], columns: usize) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slots.get(index) {
                Some(stored) => {
                    *slot = stored.clone();
                    slot.align(columns);
                }
                None => slot.clear(),
            }
        }
    }

    pub fn to_vec(&self) -> Vec<Slot> {
        self.slots.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_store_and_clear() {
        let mut slot = Slot::default();
        assert!(!slot.is_used());

        slot.store([1.0, 2.0]);
        assert!(slot.is_used());
        assert_eq!(slot.values(), &[1.0, 2.0]);

        slot.store([3.0]);
        assert_eq!(slot.values(), &[3.0]);

        slot.clear();
        assert!(!slot.is_used());
        assert!(slot.values().is_empty());
    }

    #[test]
    fn test_align() {
        let mut slot = Slot::default();
        slot.store([1.0]);
        slot.align(3);
        assert_eq!(slot.values(), &[1.0, 0.0, 0.0]);
        slot.align(2);
        assert_eq!(slot.values(), &[1.0, 0.0]);

        let mut unused = Slot::default();
        unused.push(4.0);
        unused.align(2);
        assert!(unused.values().is_empty());
    }

    #[test]
    fn test_restore_bank() {
        let mut stored = Slot::default();
        stored.store([5.0]);

        let mut bank = SlotBank::new(3);
        bank.get_mut(2).expect("slot 2 exists").store([9.0, 9.0]);
        bank.restore(&[Slot::default(), stored.clone()], 2);

        assert!(!bank.get(0).expect("slot 0 exists").is_used());
        assert_eq!(bank.get(1).expect("slot 1 exists").values(), &[5.0, 0.0]);
        assert!(!bank.get(2).expect("slot 2 exists").is_used());
    }

    #[test]
    fn test_lenient_slot_decoding() {
        let slot: Slot = serde_json::from_str(r#"{"used": "yes", "values": [1.0, 2.0]}"#)
            .expect("slot should decode");
        assert!(!slot.is_used());
        assert_eq!(slot.values(), &[1.0, 2.0]);

        let slot: Slot = serde_json::from_str(r#"{"used": true}"#).expect("slot should decode");
        assert!(slot.is_used());
        assert!(slot.values().is_empty());

        let slot: Slot = serde_json::from_str(r#"{"used": true, "values": [4.0, "x", 6.0]}"#)
            .expect("slot should decode");
        assert_eq!(slot.values(), &[4.0, 0.0, 6.0]);
    }
}

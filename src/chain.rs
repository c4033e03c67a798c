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

//! Chains of extension instances and the logical slot space they form.
//!
//! A root instance walks the neighbors to its right. Every neighbor that offers
//! a [SlotLink] with the root's slot count extends the address space by that
//! many slots; the first neighbor that does not ends the chain.

use tracing::{debug, trace};

use crate::document::ExtensionDocument;
use crate::error::TransitError;
use crate::slots::{Slot, SlotBank};

/// Maximum number of links behind a root.
pub const MAX_LINKS: usize = 7;

/// Capability offered by chain-compatible instances.
pub trait SlotLink {
    /// Number of slots this link contributes.
    fn slot_count(&self) -> usize;

    fn slot(&self, index: usize) -> Option<&Slot>;

    fn slot_mut(&mut self, index: usize) -> Option<&mut Slot>;

    /// Id of the root that last claimed this link.
    fn owner_id(&self) -> Option<i64>;

    /// Claims the link for a root at the given chain position.
    fn set_owner(&mut self, owner_id: i64, offset: usize, write_mode: bool);

    fn set_panel_theme(&mut self, theme: i64);

    /// Empties the link and forgets its owner.
    fn reset(&mut self);
}

/// An adjacent instance, which may or may not be chain-compatible.
pub trait Neighbor {
    fn slot_link(&mut self) -> Option<&mut dyn SlotLink>;
}

/// A chain-compatible instance that only stores slots.
#[derive(Clone, Debug)]
pub struct Extension {
    bank: SlotBank,
    owner_id: Option<i64>,
    offset: usize,
    write_mode: bool,
    panel_theme: i64,
}

impl Extension {
    pub fn new(slot_count: usize) -> Extension {
        Extension {
            bank: SlotBank::new(slot_count),
            owner_id: None,
            offset: 0,
            write_mode: false,
            panel_theme: 0,
        }
    }

    pub fn bank(&self) -> &SlotBank {
        &self.bank
    }

    /// Position in the chain of the owning root (1 for the first link).
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn write_mode(&self) -> bool {
        self.write_mode
    }

    pub fn panel_theme(&self) -> i64 {
        self.panel_theme
    }

    pub fn to_document(&self) -> ExtensionDocument {
        ExtensionDocument {
            panel_theme: self.panel_theme,
            slots: self.bank.to_vec(),
        }
    }

    /// Restores the stored slots. Ownership is left for the next chain walk.
    pub fn load_document(&mut self, document: &ExtensionDocument) {
        self.panel_theme = document.panel_theme;
        let columns = document
            .slots
            .iter()
            .filter(|slot| slot.is_used())
            .map(|slot| slot.values().len())
            .max()
            .unwrap_or(0);
        self.bank.restore(&document.slots, columns);
    }
}

impl SlotLink for Extension {
    fn slot_count(&self) -> usize {
        self.bank.len()
    }

    fn slot(&self, index: usize) -> Option<&Slot> {
        self.bank.get(index)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.bank.get_mut(index)
    }

    fn owner_id(&self) -> Option<i64> {
        self.owner_id
    }

    fn set_owner(&mut self, owner_id: i64, offset: usize, write_mode: bool) {
        self.owner_id = Some(owner_id);
        self.offset = offset;
        self.write_mode = write_mode;
    }

    fn set_panel_theme(&mut self, theme: i64) {
        self.panel_theme = theme;
    }

    fn reset(&mut self) {
        self.bank.clear();
        self.owner_id = None;
        self.offset = 0;
        self.write_mode = false;
    }
}

impl Neighbor for Extension {
    fn slot_link(&mut self) -> Option<&mut dyn SlotLink> {
        Some(self)
    }
}

/// The slots of a root and its confirmed links, addressed as one range.
pub struct SlotSpace<'a> {
    own: &'a mut SlotBank,
    links: [Option<&'a mut dyn SlotLink>; MAX_LINKS],
    confirmed: usize,
}

impl<'a> SlotSpace<'a> {
    /// Walks `neighbors` in order and claims every compatible link for `root_id`.
    ///
    /// A link previously owned by another root is reset before it is claimed.
    pub fn walk(
        own: &'a mut SlotBank,
        neighbors: &'a mut [&mut dyn Neighbor],
        root_id: i64,
        write_mode: bool,
        panel_theme: i64,
    ) -> SlotSpace<'a> {
        let per_instance = own.len();
        let available = neighbors.len();
        let mut links: [Option<&'a mut dyn SlotLink>; MAX_LINKS] = Default::default();
        let mut confirmed = 0;

        for neighbor in neighbors {
            if confirmed == MAX_LINKS {
                let error = TransitError::CapacityExceeded("chain length");
                trace!(available, %error, "Ignoring links past the chain limit.");
                break;
            }
            let Some(link) = neighbor.slot_link() else {
                break;
            };
            if link.slot_count() != per_instance {
                break;
            }
            if let Some(found) = link.owner_id().filter(|&found| found != root_id) {
                let error = TransitError::StaleTopology {
                    expected: root_id,
                    found,
                };
                debug!(
                    %error,
                    position = confirmed + 1,
                    "Resetting link claimed by another root."
                );
                link.reset();
            }
            link.set_panel_theme(panel_theme);
            link.set_owner(root_id, confirmed + 1, write_mode);
            links[confirmed] = Some(link);
            confirmed += 1;
        }

        SlotSpace {
            own,
            links,
            confirmed,
        }
    }

    /// A space with no links.
    pub fn standalone(own: &'a mut SlotBank) -> SlotSpace<'a> {
        SlotSpace {
            own,
            links: Default::default(),
            confirmed: 0,
        }
    }

    /// Number of confirmed links.
    pub fn links(&self) -> usize {
        self.confirmed
    }

    /// Slots per instance.
    pub fn per_instance(&self) -> usize {
        self.own.len()
    }

    /// Total addressable slots.
    pub fn total(&self) -> usize {
        self.own.len() * (1 + self.confirmed)
    }

    /// Maps a logical index to its chain position (0 is the root) and local index.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let per_instance = self.own.len();
        if per_instance == 0 || index >= self.total() {
            return None;
        }
        Some((index / per_instance, index % per_instance))
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        match self.locate(index)? {
            (0, local) => self.own.get(local),
            (position, local) => self.links[position - 1].as_deref()?.slot(local),
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot> {
        match self.locate(index)? {
            (0, local) => self.own.get_mut(local),
            (position, local) => self.links[position - 1].as_deref_mut()?.slot_mut(local),
        }
    }

    /// Calls `f` on every slot in logical order.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Slot),
    {
        let per_instance = self.own.len();
        for local in 0..per_instance {
            if let Some(slot) = self.own.get_mut(local) {
                f(slot);
            }
        }
        for link in self.links.iter_mut().flatten() {
            for local in 0..per_instance {
                if let Some(slot) = link.slot_mut(local) {
                    f(slot);
                }
            }
        }
    }

    /// Pushes the root's mode flag to every link.
    pub fn sync_write_mode(&mut self, root_id: i64, write_mode: bool) {
        for (position, link) in self.links.iter_mut().flatten().enumerate() {
            link.set_owner(root_id, position + 1, write_mode);
        }
    }

    /// Resets the root's own slots and every confirmed link.
    pub fn reset(&mut self) {
        self.own.clear();
        for link in self.links.iter_mut().flatten() {
            link.reset();
        }
    }
}

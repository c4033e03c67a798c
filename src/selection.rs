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

//! Slot selection: which slot is current, which is armed, and how the slot
//! input picks the next one.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::dsp::rescale;
use crate::error::TransitError;

/// Semitones per volt; the STEP policy maps one semitone to one slot.
const STEPS_PER_VOLT: f32 = 12.0;

/// Full-scale voltage of the VOLT policy.
const VOLT_RANGE: f32 = 10.0;

/// How the slot input addresses slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlotCvMode {
    /// 0..10V spread over the active slots.
    Volt,
    /// One semitone per slot, starting at 0V.
    Step,
    /// Next slot on each trigger.
    #[default]
    Forward,
    /// A trigger commits the armed slot.
    Arm,
    /// Previous slot on each trigger.
    Reverse,
    /// Forward, then back, bouncing at the ends.
    PingPong,
    /// Any active slot.
    Random,
    /// Any active slot except the current one.
    RandomNoRepeat,
    /// One step up or down at random.
    RandomWalk,
    /// Slot 0 on every other trigger, sweeping through the rest in between.
    Alternate,
    /// Every active slot once, in random order, then again.
    Shuffle,
}

impl SlotCvMode {
    /// Maps a persisted integer to a mode. Unknown values fall back to the default.
    pub fn from_persisted(value: i64) -> SlotCvMode {
        match value {
            0 => SlotCvMode::Volt,
            1 => SlotCvMode::Step,
            2 => SlotCvMode::Forward,
            3 => SlotCvMode::Arm,
            4 => SlotCvMode::Reverse,
            5 => SlotCvMode::PingPong,
            6 => SlotCvMode::Random,
            7 => SlotCvMode::RandomNoRepeat,
            8 => SlotCvMode::RandomWalk,
            9 => SlotCvMode::Alternate,
            10 => SlotCvMode::Shuffle,
            _ => SlotCvMode::default(),
        }
    }

    pub fn persisted(self) -> i64 {
        match self {
            SlotCvMode::Volt => 0,
            SlotCvMode::Step => 1,
            SlotCvMode::Forward => 2,
            SlotCvMode::Arm => 3,
            SlotCvMode::Reverse => 4,
            SlotCvMode::PingPong => 5,
            SlotCvMode::Random => 6,
            SlotCvMode::RandomNoRepeat => 7,
            SlotCvMode::RandomWalk => 8,
            SlotCvMode::Alternate => 9,
            SlotCvMode::Shuffle => 10,
        }
    }

    /// Whether the slot input is read as a level rather than a trigger.
    pub fn is_voltage(self) -> bool {
        matches!(self, SlotCvMode::Volt | SlotCvMode::Step)
    }

    /// Whether the reset input applies.
    pub fn honors_reset(self) -> bool {
        matches!(
            self,
            SlotCvMode::Forward | SlotCvMode::Reverse | SlotCvMode::PingPong
        )
    }
}

/// Selection state and the per-policy bookkeeping behind it.
pub struct Selection {
    mode: SlotCvMode,
    current: Option<usize>,
    armed: Option<usize>,
    active_count: usize,
    total: usize,
    direction: isize,
    alternate: usize,
    alternate_direction: isize,
    shuffle: Vec<usize>,
    uniform: Option<(usize, Uniform<usize>)>,
    rng: StdRng,
}

impl Selection {
    /// Creates a selection over `total` slots with all of them active.
    pub fn new(total: usize, seed: Option<u64>) -> Selection {
        let total = total.max(1);
        Selection {
            mode: SlotCvMode::default(),
            current: None,
            armed: None,
            active_count: total,
            total,
            direction: 1,
            alternate: 0,
            alternate_direction: 1,
            shuffle: Vec::with_capacity(total),
            uniform: None,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    /// Forgets the position, the armed slot and the policy state. The mode is kept.
    pub fn reset(&mut self, active_count: usize) {
        self.current = None;
        self.armed = None;
        self.active_count = active_count.max(1);
        self.direction = 1;
        self.alternate = 0;
        self.alternate_direction = 1;
        self.shuffle.clear();
        self.uniform = None;
    }

    pub fn mode(&self) -> SlotCvMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SlotCvMode) {
        self.mode = mode;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn armed(&self) -> Option<usize> {
        self.armed
    }

    /// Stored number of active slots, which may exceed the address space.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Active slots that actually exist.
    pub fn count(&self) -> usize {
        self.active_count.min(self.total)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Updates the size of the address space after a chain walk.
    pub fn set_total(&mut self, total: usize) {
        self.total = total.max(1);
        self.shuffle.reserve(self.total.saturating_sub(self.shuffle.len()));
    }

    /// Changes the number of active slots. A current slot past the new end
    /// moves to slot 0, and any armed slot is dropped.
    pub fn set_active_count(&mut self, count: usize) {
        let count = count.max(1);
        if self.current.is_some_and(|current| current >= count) {
            self.current = Some(0);
        }
        self.active_count = count;
        self.armed = None;
        self.shuffle.clear();
    }

    /// Restores persisted state; a current slot outside the active range is dropped.
    pub fn restore(&mut self, mode: SlotCvMode, current: Option<usize>, active_count: usize) {
        self.reset(active_count);
        self.mode = mode;
        self.current = current.filter(|&current| current < self.active_count);
    }

    /// Validates a load request and updates the selection.
    ///
    /// Returns true when the current slot changed and a fade should start.
    /// An unused or out of range slot leaves everything untouched.
    pub fn request(
        &mut self,
        index: usize,
        is_next: bool,
        force: bool,
        used: bool,
    ) -> Result<bool, TransitError> {
        let count = self.count();
        if index >= count {
            return Err(TransitError::InvalidIndex {
                index,
                bound: count,
            });
        }
        if !used {
            return Err(TransitError::EmptySlot(index));
        }
        if is_next {
            self.armed = Some(index);
            return Ok(false);
        }
        Ok(self.select(index, force))
    }

    /// Moves to a slot picked by the slot or reset input.
    ///
    /// Unlike [Selection::request], an unused slot still becomes current so
    /// the sequence keeps moving through gaps. Returns true when the current
    /// slot changed.
    pub fn advance(&mut self, index: usize) -> Result<bool, TransitError> {
        let count = self.count();
        if index >= count {
            return Err(TransitError::InvalidIndex {
                index,
                bound: count,
            });
        }
        Ok(self.select(index, false))
    }

    fn select(&mut self, index: usize, force: bool) -> bool {
        if self.current == Some(index) && !force {
            return false;
        }
        trace!(slot = index, "Selecting slot.");
        self.current = Some(index);
        self.armed = None;
        true
    }

    /// Makes `index` current without a fade, as after saving into it.
    pub fn set_current(&mut self, index: usize) {
        self.current = Some(index);
    }

    /// Drops the current slot if it is `index`.
    pub fn forget(&mut self, index: usize) {
        if self.current == Some(index) {
            self.current = None;
        }
    }

    /// Maps a level on the slot input to a slot for the VOLT and STEP policies.
    pub fn by_voltage(&self, voltage: f32) -> Option<usize> {
        let target = match self.mode {
            SlotCvMode::Volt => {
                rescale(voltage, 0.0, VOLT_RANGE, 0.0, self.count() as f32).floor()
            }
            SlotCvMode::Step => (voltage * STEPS_PER_VOLT)
                .clamp(0.0, (self.total - 1) as f32)
                .round(),
            _ => return None,
        };
        if target >= 0.0 && (target as usize) < self.count() {
            Some(target as usize)
        } else {
            None
        }
    }

    /// Picks the slot for a trigger on the slot input.
    pub fn on_trigger(&mut self) -> Option<usize> {
        let count = self.count();
        match self.mode {
            SlotCvMode::Volt | SlotCvMode::Step => None,
            SlotCvMode::Arm => self.armed,
            SlotCvMode::Forward => Some(self.forward(count)),
            SlotCvMode::Reverse => Some(match self.current {
                Some(current) => (current.min(count - 1) + count - 1) % count,
                None => count - 1,
            }),
            SlotCvMode::PingPong => Some(self.ping_pong(count)),
            SlotCvMode::Alternate => Some(self.alternate(count)),
            SlotCvMode::Random => Some(self.uniform(count)),
            SlotCvMode::RandomNoRepeat => Some(self.no_repeat(count)),
            SlotCvMode::RandomWalk => Some(match self.current {
                Some(current) if self.rng.gen_bool(0.5) => current.saturating_sub(1),
                Some(current) => (current + 1).min(count - 1),
                None => 0,
            }),
            SlotCvMode::Shuffle => Some(self.shuffle(count)),
        }
    }

    fn forward(&self, count: usize) -> usize {
        self.current.map_or(0, |current| (current + 1) % count)
    }

    fn ping_pong(&mut self, count: usize) -> usize {
        let current = self.current.map_or(-1, |current| current as isize);
        let next = current + self.direction;
        let last = count as isize - 1;
        if next >= last {
            self.direction = -1;
        }
        if next <= 0 {
            self.direction = 1;
        }
        next.clamp(0, last) as usize
    }

    fn alternate(&mut self, count: usize) -> usize {
        if count <= 2 {
            return self.forward(count);
        }
        if self.current != Some(0) {
            return 0;
        }
        let next = self.alternate as isize + self.alternate_direction;
        let last = count as isize - 1;
        if next >= last {
            self.alternate_direction = -1;
        }
        if next <= 1 {
            self.alternate_direction = 1;
        }
        self.alternate = next.clamp(1, last) as usize;
        self.alternate
    }

    fn uniform(&mut self, bound: usize) -> usize {
        let distribution = match self.uniform {
            Some((cached, distribution)) if cached == bound => distribution,
            _ => {
                let distribution = Uniform::new(0, bound);
                self.uniform = Some((bound, distribution));
                distribution
            }
        };
        distribution.sample(&mut self.rng)
    }

    fn no_repeat(&mut self, count: usize) -> usize {
        if count < 2 {
            return self.forward(count);
        }
        match self.current {
            Some(current) if current < count => {
                let pick = self.uniform(count - 1);
                if pick >= current {
                    pick + 1
                } else {
                    pick
                }
            }
            _ => self.uniform(count),
        }
    }

    fn shuffle(&mut self, count: usize) -> usize {
        if self.shuffle.is_empty() {
            self.shuffle.extend(0..count);
            self.shuffle.shuffle(&mut self.rng);
        }
        self.shuffle
            .pop()
            .map_or(0, |pick| pick.min(count - 1))
    }
}

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

//! Slot lights and the status snapshot shared with presentation readers.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::crossfade::Outputs;
use crate::dsp::Timer;

/// Seconds between blink phase toggles.
const BLINK_INTERVAL: f32 = 0.2;

/// Intensity of the active slot while it blinks in write mode.
const BLINK_LEVEL: f32 = 0.7;

/// Intensity of a used but inactive slot in read mode.
const UNUSED_LEVEL: f32 = 0.25;

/// Intensity of an empty slot within the active range in write mode.
const EMPTY_WRITE_LEVEL: f32 = 0.05;

/// Three channel intensities for one slot.
pub type Light = [f32; 3];

/// Selection state the lights are derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightState {
    pub current: Option<usize>,
    pub armed: Option<usize>,
    pub count: usize,
    pub write_mode: bool,
    pub blink: bool,
}

impl LightState {
    /// Intensities for slot `index`.
    pub fn light(&self, index: usize, used: bool) -> Light {
        let active = self.current == Some(index);
        let in_range = index < self.count;
        if !self.write_mode {
            let armed = self.armed == Some(index);
            let middle = if active {
                1.0
            } else if !in_range {
                0.0
            } else if used {
                1.0
            } else {
                UNUSED_LEVEL
            };
            [level(active || armed), middle, level(active)]
        } else if active && self.blink {
            [BLINK_LEVEL; 3]
        } else {
            let empty = if !used && in_range {
                EMPTY_WRITE_LEVEL
            } else {
                0.0
            };
            [level(used), empty, 0.0]
        }
    }
}

fn level(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Snapshot of an instance for presentation readers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Status {
    /// One light per logical slot.
    pub lights: Vec<Light>,
    pub current: Option<usize>,
    pub armed: Option<usize>,
    pub active_count: usize,
    pub total: usize,
    pub write_mode: bool,
    /// Number of bound parameter columns.
    pub columns: usize,
    pub outputs: Outputs,
}

/// Read side of the status snapshot. Cheap to clone.
#[derive(Clone)]
pub struct StatusReader {
    shared: Arc<RwLock<Status>>,
}

impl StatusReader {
    /// Copies the latest published snapshot.
    pub fn snapshot(&self) -> Status {
        self.shared.read().clone()
    }
}

/// Write side of the status snapshot, owned by the evaluation callback.
pub struct StatusBoard {
    shared: Arc<RwLock<Status>>,
    timer: Timer,
    blink: bool,
}

impl StatusBoard {
    pub fn new(slots: usize) -> StatusBoard {
        StatusBoard {
            shared: Arc::new(RwLock::new(Status {
                lights: Vec::with_capacity(slots),
                ..Default::default()
            })),
            timer: Timer::default(),
            blink: false,
        }
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Advances the blink phase by `delta` seconds.
    pub fn tick(&mut self, delta: f32) {
        if self.timer.process(delta) > BLINK_INTERVAL {
            self.timer.reset();
            self.blink = !self.blink;
        }
    }

    pub fn blink(&self) -> bool {
        self.blink
    }

    /// Publishes a new snapshot unless a reader holds the lock; in that case
    /// the update is skipped until the next call.
    pub fn publish<F>(
        &self,
        state: LightState,
        total: usize,
        used: F,
        columns: usize,
        outputs: Outputs,
    ) -> bool
    where
        F: Fn(usize) -> bool,
    {
        let Some(mut status) = self.shared.try_write() else {
            return false;
        };
        status.lights.clear();
        status
            .lights
            .extend((0..total).map(|index| state.light(index, used(index))));
        status.current = state.current;
        status.armed = state.armed;
        status.active_count = state.count;
        status.total = total;
        status.write_mode = state.write_mode;
        status.columns = columns;
        status.outputs = outputs;
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn state(write_mode: bool, blink: bool) -> LightState {
        LightState {
            current: Some(1),
            armed: Some(2),
            count: 4,
            write_mode,
            blink,
        }
    }

    #[test]
    fn test_read_mode_lights() {
        let state = state(false, false);
        assert_eq!(state.light(1, true), [1.0, 1.0, 1.0]);
        assert_eq!(state.light(2, true), [1.0, 1.0, 0.0]);
        assert_eq!(state.light(0, true), [0.0, 1.0, 0.0]);
        assert_eq!(state.light(3, false), [0.0, 0.25, 0.0]);
        assert_eq!(state.light(5, true), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_write_mode_lights() {
        let blinking = state(true, true);
        assert_eq!(blinking.light(1, true), [0.7, 0.7, 0.7]);
        assert_eq!(blinking.light(0, true), [1.0, 0.0, 0.0]);
        assert_eq!(blinking.light(3, false), [0.0, 0.05, 0.0]);
        assert_eq!(blinking.light(6, false), [0.0, 0.0, 0.0]);

        let steady = state(true, false);
        assert_eq!(steady.light(1, true), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_blink_toggles() {
        let mut board = StatusBoard::new(4);
        assert!(!board.blink());
        board.tick(0.125);
        assert!(!board.blink());
        board.tick(0.125);
        assert!(board.blink());
        board.tick(0.125);
        board.tick(0.125);
        assert!(!board.blink());
    }

    #[test]
    fn test_publish_skips_while_read_locked() {
        let board = StatusBoard::new(2);
        let reader = board.reader();
        let state = state(false, false);

        {
            let _guard = board.shared.read();
            assert!(!board.publish(state, 2, |_| true, 1, Outputs::default()));
        }
        assert!(board.publish(state, 2, |_| true, 1, Outputs::default()));

        let status = reader.snapshot();
        assert_eq!(status.lights.len(), 2);
        assert_eq!(status.current, Some(1));
        assert_eq!(status.columns, 1);
    }
}

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

//! Small control-rate helpers: edge detection, pulses, dividers and timers.

/// Voltage at or above which a trigger input is considered high.
const TRIGGER_HIGH: f32 = 1.0;

/// Voltage at or below which a trigger input is considered low again.
const TRIGGER_LOW: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum TriggerState {
    #[default]
    Uninitialized,
    Low,
    High,
}

/// Rising-edge detector with hysteresis.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchmittTrigger {
    state: TriggerState,
}

impl SchmittTrigger {
    /// Feeds one sample and returns true on a rising edge.
    ///
    /// The first sample only initializes the state, so an input that is already
    /// high when first seen does not count as an edge.
    pub fn process(&mut self, input: f32) -> bool {
        match self.state {
            TriggerState::Uninitialized => {
                self.state = if input >= TRIGGER_HIGH {
                    TriggerState::High
                } else {
                    TriggerState::Low
                };
                false
            }
            TriggerState::High => {
                if input <= TRIGGER_LOW {
                    self.state = TriggerState::Low;
                }
                false
            }
            TriggerState::Low => {
                if input >= TRIGGER_HIGH {
                    self.state = TriggerState::High;
                    return true;
                }
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = TriggerState::Uninitialized;
    }
}

/// One-shot pulse of a fixed length.
#[derive(Clone, Copy, Debug, Default)]
pub struct PulseGenerator {
    remaining: f32,
}

impl PulseGenerator {
    /// Starts (or extends) a pulse lasting `duration` seconds.
    pub fn trigger(&mut self, duration: f32) {
        self.remaining = self.remaining.max(duration);
    }

    /// Advances by `delta` seconds and reports whether the pulse is still high.
    pub fn process(&mut self, delta: f32) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= delta;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Fires once every `division` calls.
#[derive(Clone, Copy, Debug)]
pub struct ClockDivider {
    division: u32,
    counter: u32,
}

impl ClockDivider {
    pub fn new(division: u32) -> Self {
        Self {
            division: division.max(1),
            counter: 0,
        }
    }

    pub fn set_division(&mut self, division: u32) {
        self.division = division.max(1);
        self.counter = 0;
    }

    pub fn division(&self) -> u32 {
        self.division
    }

    pub fn process(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.division {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Accumulates elapsed time.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timer {
    time: f32,
}

impl Timer {
    pub fn process(&mut self, delta: f32) -> f32 {
        self.time += delta;
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Linear map of `x` from `[x0, x1]` to `[y0, y1]`. A degenerate input range maps to `y0`.
pub fn rescale(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    let denom = x1 - x0;
    if denom.abs() < f32::EPSILON {
        return y0;
    }
    (x - x0) * (y1 - y0) / denom + y0
}

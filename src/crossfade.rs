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

//! Timed interpolation between two snapshots and the status output it drives.

use crate::dsp::PulseGenerator;
use crate::slew::ShapedSlew;

/// Value the slew limiter climbs to; also the gate/pulse voltage.
pub const CEILING: f32 = 10.0;

/// Near the end of a fade, values this close to an integer snap onto it.
const SNAP_EPSILON: f32 = 5e-3;

/// Maximum number of parallel output channels.
pub const MAX_OUTPUT_CHANNELS: usize = 5;

/// What the status output reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutMode {
    /// All five signals on parallel channels.
    Poly,
    /// The shaped ramp while fading, zero at rest.
    #[default]
    Envelope,
    /// High for the duration of a fade.
    Gate,
    /// Pulse when a fade completes.
    EndOfChange,
    /// Pulse when a fade starts.
    StartOfChange,
    /// Pulse when the current slot changes.
    SlotChange,
}

impl OutMode {
    /// Maps a persisted integer to a mode. Unknown values fall back to the default.
    pub fn from_persisted(value: i64) -> OutMode {
        match value {
            -1 => OutMode::Poly,
            0 => OutMode::Envelope,
            1 => OutMode::Gate,
            2 => OutMode::EndOfChange,
            3 => OutMode::StartOfChange,
            4 => OutMode::SlotChange,
            _ => OutMode::default(),
        }
    }

    pub fn persisted(self) -> i64 {
        match self {
            OutMode::Poly => -1,
            OutMode::Envelope => 0,
            OutMode::Gate => 1,
            OutMode::EndOfChange => 2,
            OutMode::StartOfChange => 3,
            OutMode::SlotChange => 4,
        }
    }
}

/// Voltages on the status output.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Outputs {
    /// Number of active channels (1, or 5 in poly mode).
    pub channels: usize,
    /// Channel voltages; only the first `channels` are meaningful.
    pub voltages: [f32; MAX_OUTPUT_CHANNELS],
}

impl Outputs {
    fn mono(voltage: f32) -> Outputs {
        let mut voltages = [0.0; MAX_OUTPUT_CHANNELS];
        voltages[0] = voltage;
        Outputs {
            channels: 1,
            voltages,
        }
    }

    /// Voltage on a channel, or `None` if the channel is not active.
    pub fn voltage(&self, channel: usize) -> Option<f32> {
        if channel < self.channels {
            Some(self.voltages[channel])
        } else {
            None
        }
    }
}

/// Result of one crossfade step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Mid-fade; parameters should be written at this progress.
    Fading(f32),
    /// The fade just completed on this step; parameters get their final values.
    Completed,
    /// Nothing is moving.
    Resting,
}

/// Crossfade state: the snapshots being blended, the ramp, and the pulses.
pub struct Crossfade {
    old: Vec<f32>,
    new: Vec<f32>,
    slew: ShapedSlew,
    envelope: f32,
    eoc_armed: bool,
    slot_pulse: PulseGenerator,
    soc_pulse: PulseGenerator,
    eoc_pulse: PulseGenerator,
    pulse_duration: f32,
}

impl Crossfade {
    pub fn new(pulse_duration: f32) -> Crossfade {
        let mut slew = ShapedSlew::default();
        slew.reset(CEILING);
        Crossfade {
            old: Vec::new(),
            new: Vec::new(),
            slew,
            envelope: CEILING,
            eoc_armed: false,
            slot_pulse: PulseGenerator::default(),
            soc_pulse: PulseGenerator::default(),
            eoc_pulse: PulseGenerator::default(),
            pulse_duration,
        }
    }

    /// Pre-allocates snapshot storage so starting a fade does not allocate.
    pub fn reserve(&mut self, columns: usize) {
        self.old.reserve(columns.saturating_sub(self.old.len()));
        self.new.reserve(columns.saturating_sub(self.new.len()));
    }

    /// Returns to rest: no fade in progress, no pending pulses.
    pub fn reset(&mut self) {
        self.old.clear();
        self.new.clear();
        self.slew.reset(CEILING);
        self.envelope = CEILING;
        self.eoc_armed = false;
        self.slot_pulse.reset();
        self.soc_pulse.reset();
        self.eoc_pulse.reset();
    }

    /// Signals that the current slot changed.
    pub fn slot_changed(&mut self) {
        self.slot_pulse.trigger(self.pulse_duration);
    }

    /// Starts a new fade from `old` towards `new`.
    pub fn begin<I>(&mut self, old: I, new: &[f32])
    where
        I: IntoIterator<Item = f32>,
    {
        self.old.clear();
        self.old.extend(old);
        self.new.clear();
        self.new.extend_from_slice(new);

        self.slew.reset(0.0);
        self.envelope = 0.0;
        self.soc_pulse.trigger(self.pulse_duration);
        self.eoc_armed = true;
    }

    pub fn is_fading(&self) -> bool {
        self.envelope < CEILING
    }

    /// Normalized position of the ramp in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.envelope / CEILING
    }

    /// Advances the ramp by `delta` seconds and renders the status output.
    pub fn advance(
        &mut self,
        rise: f32,
        shape: f32,
        delta: f32,
        mode: OutMode,
    ) -> (Step, Outputs) {
        self.slew.set_rise(rise);
        self.slew.set_shape(shape);
        let s = self.slew.process(CEILING, delta);
        self.envelope = s;

        let completed = s == CEILING && self.eoc_armed;
        if completed {
            self.eoc_pulse.trigger(self.pulse_duration);
            self.eoc_armed = false;
        }

        let fading = s != CEILING;
        let envelope = if fading { s } else { 0.0 };
        let gate = if fading { CEILING } else { 0.0 };

        let outputs = match mode {
            OutMode::Envelope => Outputs::mono(envelope),
            OutMode::Gate => Outputs::mono(gate),
            OutMode::SlotChange => Outputs::mono(pulse_voltage(&mut self.slot_pulse, delta)),
            OutMode::StartOfChange => Outputs::mono(pulse_voltage(&mut self.soc_pulse, delta)),
            OutMode::EndOfChange => Outputs::mono(pulse_voltage(&mut self.eoc_pulse, delta)),
            OutMode::Poly => Outputs {
                channels: MAX_OUTPUT_CHANNELS,
                voltages: [
                    envelope,
                    gate,
                    pulse_voltage(&mut self.slot_pulse, delta),
                    pulse_voltage(&mut self.soc_pulse, delta),
                    pulse_voltage(&mut self.eoc_pulse, delta),
                ],
            },
        };

        let step = if completed {
            Step::Completed
        } else if fading {
            Step::Fading(s / CEILING)
        } else {
            Step::Resting
        };
        (step, outputs)
    }

    /// Value column `index` is fading towards.
    pub fn target(&self, index: usize) -> Option<f32> {
        self.old.get(index)?;
        self.new.get(index).copied()
    }

    /// Interpolated value of column `index` at `progress`.
    ///
    /// Returns `None` when either snapshot is shorter than `index`; columns past
    /// that point are left untouched.
    pub fn value(&self, index: usize, progress: f32) -> Option<f32> {
        let old = *self.old.get(index)?;
        let new = *self.new.get(index)?;
        let value = old + (new - old) * progress;
        if progress > 1.0 - SNAP_EPSILON && (value.round() - value).abs() < SNAP_EPSILON {
            Some(value.round())
        } else {
            Some(value)
        }
    }
}

fn pulse_voltage(pulse: &mut PulseGenerator, delta: f32) -> f32 {
    if pulse.process(delta) {
        CEILING
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DELTA: f32 = 1e-3;

    #[test]
    fn test_rest_state() {
        let mut crossfade = Crossfade::new(1e-3);
        assert!(!crossfade.is_fading());

        let (step, outputs) = crossfade.advance(1.0, 0.0, DELTA, OutMode::Envelope);
        assert_eq!(step, Step::Resting);
        assert_eq!(outputs.voltage(0), Some(0.0));
        assert_eq!(outputs.voltage(1), None);
    }

    #[test]
    fn test_linear_fade_midpoint_and_completion() {
        let mut crossfade = Crossfade::new(1e-3);
        crossfade.begin([0.0], &[10.0]);
        assert_eq!(crossfade.value(0, 0.0), Some(0.0));

        let mut completions = 0;
        let mut last_progress = 0.0;
        for i in 1..=1100 {
            let (step, _) = crossfade.advance(1.0, 0.0, DELTA, OutMode::Envelope);
            match step {
                Step::Fading(progress) => {
                    if i == 500 {
                        let v = crossfade.value(0, progress).expect("column 0 exists");
                        assert!((v - 5.0).abs() < 0.02, "expected ~5 at T/2, got {}", v);
                    }
                    last_progress = progress;
                }
                Step::Completed => {
                    completions += 1;
                    assert!(i >= 999, "completed too early at step {}", i);
                }
                Step::Resting => {}
            }
        }

        assert_eq!(completions, 1);
        assert!(last_progress > 0.99);
        assert_eq!(crossfade.value(0, 1.0), Some(10.0));
    }

    #[test]
    fn test_snap_to_integer_near_end() {
        let mut crossfade = Crossfade::new(1e-3);
        crossfade.begin([0.0, 0.0], &[3.0, 2.5]);

        assert_eq!(crossfade.value(0, 0.999), Some(3.0));
        let fractional = crossfade.value(1, 0.999).expect("column 1 exists");
        assert!((fractional - 2.4975).abs() < 1e-4);
        // No snapping away from the end.
        let early = crossfade.value(0, 0.9999 - 0.5).expect("column 0 exists");
        assert!((early - 1.4997).abs() < 1e-3);
    }

    #[test]
    fn test_short_snapshot_stops_columns() {
        let mut crossfade = Crossfade::new(1e-3);
        crossfade.begin([1.0, 2.0], &[5.0]);
        assert!(crossfade.value(0, 0.5).is_some());
        assert_eq!(crossfade.value(1, 0.5), None);
    }

    #[test]
    fn test_poly_reports_all_signals() {
        let mut crossfade = Crossfade::new(0.01);
        crossfade.slot_changed();
        crossfade.begin([0.0], &[1.0]);

        let (_, outputs) = crossfade.advance(1.0, 0.0, DELTA, OutMode::Poly);
        assert_eq!(outputs.channels, 5);
        assert!(outputs.voltages[0] > 0.0);
        assert_eq!(outputs.voltages[1], CEILING);
        assert_eq!(outputs.voltages[2], CEILING);
        assert_eq!(outputs.voltages[3], CEILING);
        assert_eq!(outputs.voltages[4], 0.0);
    }

    #[test]
    fn test_end_of_change_pulse_fires_once() {
        let mut crossfade = Crossfade::new(2e-3);
        crossfade.begin([0.0], &[1.0]);

        let mut high = 0;
        for _ in 0..100 {
            let (_, outputs) = crossfade.advance(0.01, 0.0, DELTA, OutMode::EndOfChange);
            if outputs.voltages[0] > 0.0 {
                high += 1;
            }
        }
        // A 2ms pulse sampled every 1ms is high on two or three consecutive steps.
        assert!((2..=3).contains(&high), "pulse high for {} steps", high);
    }

    #[test]
    fn test_out_mode_persisted_round_trip() {
        for mode in [
            OutMode::Poly,
            OutMode::Envelope,
            OutMode::Gate,
            OutMode::EndOfChange,
            OutMode::StartOfChange,
            OutMode::SlotChange,
        ] {
            assert_eq!(OutMode::from_persisted(mode.persisted()), mode);
        }
        assert_eq!(OutMode::from_persisted(42), OutMode::Envelope);
    }
}

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
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;

mod error;

pub use error::ConfigError;

/// Default number of slots owned by a single instance.
pub const DEFAULT_SLOT_COUNT: usize = 12;

/// Default crossfade subsampling divisor ("lower CPU").
pub const DEFAULT_PROCESS_DIVISION: u32 = 8;

/// Static configuration of a transit instance.
///
/// Every field is optional in the source file; missing fields take the defaults
/// listed on the constants above and in the `default_*` functions below.
#[derive(Deserialize, Clone, Debug)]
pub struct TransitConfig {
    /// Number of slots owned by the root and by every extension.
    #[serde(default = "default_slot_count")]
    slot_count: usize,

    /// Crossfade engine runs once every `process_division` evaluations. 1 runs
    /// at audio rate; 64 is the cheapest setting hosts usually offer.
    #[serde(default = "default_process_division")]
    process_division: u32,

    /// Mapping indicator refresh and release retry divisor.
    #[serde(default = "default_handle_division")]
    handle_division: u32,

    /// Status light recompute divisor.
    #[serde(default = "default_light_division")]
    light_division: u32,

    /// Capacity of the deferred handle release queue.
    #[serde(default = "default_queue_capacity")]
    release_queue_capacity: usize,

    /// Capacity of the presentation command queue.
    #[serde(default = "default_queue_capacity")]
    command_queue_capacity: usize,

    /// Length of the slot/start/end pulses, in seconds.
    #[serde(default = "default_pulse_duration")]
    pulse_duration: f32,

    /// Time after a reset edge during which the slot input is ignored, in seconds.
    #[serde(default = "default_reset_guard")]
    reset_guard: f32,

    /// Rise time added per volt on the fade modulation input, in seconds.
    #[serde(default = "default_fade_cv_seconds_per_volt")]
    fade_cv_seconds_per_volt: f32,
}

fn default_slot_count() -> usize {
    DEFAULT_SLOT_COUNT
}

fn default_process_division() -> u32 {
    DEFAULT_PROCESS_DIVISION
}

fn default_handle_division() -> u32 {
    4096
}

fn default_light_division() -> u32 {
    512
}

fn default_queue_capacity() -> usize {
    64
}

fn default_pulse_duration() -> f32 {
    1e-3
}

fn default_reset_guard() -> f32 {
    1e-3
}

fn default_fade_cv_seconds_per_volt() -> f32 {
    0.1
}

impl Default for TransitConfig {
    fn default() -> Self {
        TransitConfig {
            slot_count: default_slot_count(),
            process_division: default_process_division(),
            handle_division: default_handle_division(),
            light_division: default_light_division(),
            release_queue_capacity: default_queue_capacity(),
            command_queue_capacity: default_queue_capacity(),
            pulse_duration: default_pulse_duration(),
            reset_guard: default_reset_guard(),
            fade_cv_seconds_per_volt: default_fade_cv_seconds_per_volt(),
        }
    }
}

impl TransitConfig {
    /// Creates a default configuration with the given slot count.
    pub fn with_slot_count(slot_count: usize) -> TransitConfig {
        TransitConfig {
            slot_count: slot_count.max(1),
            ..Default::default()
        }
    }

    /// Parse a configuration from a file. The format is inferred from the extension.
    pub fn deserialize(path: &Path) -> Result<TransitConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<TransitConfig>()?
            .sanitized())
    }

    /// Parse a configuration from an inline YAML document.
    pub fn from_yaml(yaml: &str) -> Result<TransitConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<TransitConfig>()?
            .sanitized())
    }

    /// Clamps counts and divisions that would otherwise stall or panic.
    fn sanitized(mut self) -> TransitConfig {
        self.slot_count = self.slot_count.max(1);
        self.process_division = self.process_division.max(1);
        self.handle_division = self.handle_division.max(1);
        self.light_division = self.light_division.max(1);
        self.release_queue_capacity = self.release_queue_capacity.max(1);
        self.command_queue_capacity = self.command_queue_capacity.max(1);
        self.pulse_duration = self.pulse_duration.max(0.0);
        self.reset_guard = self.reset_guard.max(0.0);
        self
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn process_division(&self) -> u32 {
        self.process_division
    }

    pub fn handle_division(&self) -> u32 {
        self.handle_division
    }

    pub fn light_division(&self) -> u32 {
        self.light_division
    }

    pub fn release_queue_capacity(&self) -> usize {
        self.release_queue_capacity
    }

    pub fn command_queue_capacity(&self) -> usize {
        self.command_queue_capacity
    }

    pub fn pulse_duration(&self) -> f32 {
        self.pulse_duration
    }

    pub fn reset_guard(&self) -> f32 {
        self.reset_guard
    }

    pub fn fade_cv_seconds_per_volt(&self) -> f32 {
        self.fade_cv_seconds_per_volt
    }
}

#[cfg(test)]
impl TransitConfig {
    /// Creates a config that evaluates every division on every sample (test only).
    pub fn for_test(slot_count: usize) -> TransitConfig {
        TransitConfig {
            process_division: 1,
            handle_division: 1,
            light_division: 1,
            ..TransitConfig::with_slot_count(slot_count)
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = TransitConfig::from_yaml("{}").expect("empty config should parse");

        assert_eq!(config.slot_count(), DEFAULT_SLOT_COUNT);
        assert_eq!(config.process_division(), DEFAULT_PROCESS_DIVISION);
        assert_eq!(config.handle_division(), 4096);
        assert_eq!(config.light_division(), 512);
        assert!((config.pulse_duration() - 1e-3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
            slot_count: 8
            process_division: 64
            fade_cv_seconds_per_volt: 0.5
        "#;

        let config = TransitConfig::from_yaml(yaml).expect("config should parse");
        assert_eq!(config.slot_count(), 8);
        assert_eq!(config.process_division(), 64);
        assert!((config.fade_cv_seconds_per_volt() - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.release_queue_capacity(), 64);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let yaml = r#"
            slot_count: 0
            process_division: 0
            release_queue_capacity: 0
        "#;

        let config = TransitConfig::from_yaml(yaml).expect("config should parse");
        assert_eq!(config.slot_count(), 1);
        assert_eq!(config.process_division(), 1);
        assert_eq!(config.release_queue_capacity(), 1);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("unable to create temp file");
        writeln!(file, "slot_count: 16\nlight_division: 256").expect("unable to write config");

        let config = TransitConfig::deserialize(file.path()).expect("config should load");
        assert_eq!(config.slot_count(), 16);
        assert_eq!(config.light_division(), 256);
    }

    #[test]
    fn test_bad_type_is_an_error() {
        assert!(TransitConfig::from_yaml("slot_count: lots").is_err());
    }
}

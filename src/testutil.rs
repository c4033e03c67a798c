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

//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::bindings::ReleaseDrain;
use crate::config::TransitConfig;
use crate::crossfade::Outputs;
use crate::registry::MemoryRegistry;
use crate::transit::{Frame, Session, Transit};

/// A registry with two owners:
/// - owner 1: three parameters in `[0, 10]`, all at 2.0
/// - owner 2: two parameters in `[0, 1]`, all at 0.5
pub fn registry() -> Arc<MemoryRegistry> {
    let registry = Arc::new(MemoryRegistry::new(11));
    for param_index in 0..3 {
        registry.add_param(1, param_index, 2.0, 0.0, 10.0);
    }
    for param_index in 0..2 {
        registry.add_param(2, param_index, 0.5, 0.0, 1.0);
    }
    registry
}

/// A root with id 1 and twelve slots, running every divider on every sample.
pub fn transit(registry: &Arc<MemoryRegistry>) -> (Transit, ReleaseDrain) {
    Transit::with_seed(TransitConfig::for_test(12), registry.clone(), 1, Some(1))
}

/// Evaluates `frame` `samples` times and returns the last outputs.
pub fn run(session: &mut Session, frame: &Frame, samples: usize) -> Outputs {
    let mut outputs = Outputs::default();
    for _ in 0..samples {
        outputs = session.evaluate(frame);
    }
    outputs
}

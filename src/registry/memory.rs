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

//! An in-process registry, for hosts without their own and for tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{ParamHandle, ParamRef, ParameterRegistry};

#[derive(Clone, Copy, Debug)]
struct Param {
    value: f32,
    min: f32,
    max: f32,
}

struct Inner {
    params: HashMap<ParamRef, Param>,
    handles: HashMap<u64, ParamRef>,
    indicators: HashMap<u64, bool>,
    next_handle: u64,
    rng: StdRng,
}

/// A registry backed by a hash map of parameters.
pub struct MemoryRegistry {
    inner: RwLock<Inner>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        MemoryRegistry::new(0)
    }
}

impl MemoryRegistry {
    /// Creates an empty registry; `seed` drives randomization.
    pub fn new(seed: u64) -> MemoryRegistry {
        MemoryRegistry {
            inner: RwLock::new(Inner {
                params: HashMap::new(),
                handles: HashMap::new(),
                indicators: HashMap::new(),
                next_handle: 1,
                rng: StdRng::seed_from_u64(seed),
            }),
        }
    }

    /// Adds (or replaces) a parameter with the given value and range.
    pub fn add_param(&self, owner_id: i64, param_index: usize, value: f32, min: f32, max: f32) {
        self.inner.write().params.insert(
            ParamRef::new(owner_id, param_index),
            Param {
                value: value.clamp(min, max),
                min,
                max,
            },
        );
    }

    /// Removes every parameter of an owner, as if the owner was deleted.
    pub fn remove_owner(&self, owner_id: i64) {
        self.inner
            .write()
            .params
            .retain(|param, _| param.owner_id != owner_id);
    }

    /// Reads a parameter directly, bypassing handles.
    pub fn value(&self, param: ParamRef) -> Option<f32> {
        self.inner.read().params.get(&param).map(|p| p.value)
    }

    /// Writes a parameter directly, bypassing handles.
    pub fn set(&self, param: ParamRef, value: f32) {
        if let Some(p) = self.inner.write().params.get_mut(&param) {
            p.value = value.clamp(p.min, p.max);
        }
    }

    /// Number of live registrations.
    pub fn registered(&self) -> usize {
        self.inner.read().handles.len()
    }

    /// Whether a handle is still registered.
    pub fn is_registered(&self, handle: ParamHandle) -> bool {
        self.inner.read().handles.contains_key(&handle.0)
    }

    /// Last indicator visibility pushed for a handle.
    pub fn indicator(&self, handle: ParamHandle) -> Option<bool> {
        self.inner.read().indicators.get(&handle.0).copied()
    }
}

impl ParameterRegistry for MemoryRegistry {
    fn register(&self, param: ParamRef) -> ParamHandle {
        let mut inner = self.inner.write();
        let id = inner.next_handle;
        inner.next_handle += 1;
        inner.handles.insert(id, param);
        debug!(
            handle = id,
            owner_id = param.owner_id,
            param_index = param.param_index,
            "Registered parameter."
        );
        ParamHandle(id)
    }

    fn unregister(&self, handle: ParamHandle) {
        let mut inner = self.inner.write();
        inner.handles.remove(&handle.0);
        inner.indicators.remove(&handle.0);
    }

    fn resolve_current_value(&self, handle: ParamHandle) -> Option<f32> {
        let inner = self.inner.read();
        let param = inner.handles.get(&handle.0)?;
        inner.params.get(param).map(|p| p.value)
    }

    fn set_value(&self, handle: ParamHandle, value: f32) {
        let mut inner = self.inner.write();
        let Some(param) = inner.handles.get(&handle.0).copied() else {
            return;
        };
        if let Some(p) = inner.params.get_mut(&param) {
            p.value = value.clamp(p.min, p.max);
        }
    }

    fn request_randomize(&self, handle: ParamHandle) {
        let mut inner = self.inner.write();
        let Some(param) = inner.handles.get(&handle.0).copied() else {
            return;
        };
        let Some(range) = inner.params.get(&param).map(|p| (p.min, p.max)) else {
            return;
        };
        let value = if range.1 > range.0 {
            inner.rng.gen_range(range.0..=range.1)
        } else {
            range.0
        };
        if let Some(p) = inner.params.get_mut(&param) {
            p.value = value;
        }
    }

    fn param_count(&self, owner_id: i64) -> Option<usize> {
        let inner = self.inner.read();
        let count = inner
            .params
            .keys()
            .filter(|param| param.owner_id == owner_id)
            .map(|param| param.param_index + 1)
            .max()?;
        Some(count)
    }

    fn set_indicator_visible(&self, handle: ParamHandle, visible: bool) {
        let mut inner = self.inner.write();
        if inner.handles.contains_key(&handle.0) {
            inner.indicators.insert(handle.0, visible);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_handles_resolve_until_owner_removed() {
        let registry = MemoryRegistry::new(1);
        registry.add_param(7, 0, 0.25, 0.0, 1.0);
        let handle = registry.register(ParamRef::new(7, 0));

        assert_eq!(registry.resolve_current_value(handle), Some(0.25));
        registry.set_value(handle, 2.0);
        assert_eq!(registry.resolve_current_value(handle), Some(1.0));

        registry.remove_owner(7);
        assert_eq!(registry.resolve_current_value(handle), None);
        // Writing to a vanished parameter is a no-op.
        registry.set_value(handle, 0.5);
        assert_eq!(registry.value(ParamRef::new(7, 0)), None);
    }

    #[test]
    fn test_unregister() {
        let registry = MemoryRegistry::new(1);
        registry.add_param(1, 0, 0.0, 0.0, 1.0);
        let handle = registry.register(ParamRef::new(1, 0));
        assert!(registry.is_registered(handle));

        registry.unregister(handle);
        assert!(!registry.is_registered(handle));
        assert_eq!(registry.resolve_current_value(handle), None);
    }

    #[test]
    fn test_randomize_stays_in_range() {
        let registry = MemoryRegistry::new(3);
        registry.add_param(1, 0, 0.0, -5.0, 5.0);
        let handle = registry.register(ParamRef::new(1, 0));

        for _ in 0..50 {
            registry.request_randomize(handle);
            let value = registry
                .resolve_current_value(handle)
                .expect("param should resolve");
            assert!((-5.0..=5.0).contains(&value));
        }
    }

    #[test]
    fn test_param_count() {
        let registry = MemoryRegistry::new(1);
        assert_eq!(registry.param_count(4), None);
        registry.add_param(4, 0, 0.0, 0.0, 1.0);
        registry.add_param(4, 2, 0.0, 0.0, 1.0);
        assert_eq!(registry.param_count(4), Some(3));
    }
}

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

//! The bound parameter list and the deferred release of registry handles.

use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, warn};

use crate::error::TransitError;
use crate::registry::{ParamHandle, ParamRef, ParameterRegistry};

/// One column of the bound parameter list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binding {
    param: ParamRef,
    /// `None` once the column has been unbound.
    handle: Option<ParamHandle>,
}

impl Binding {
    pub fn param(&self) -> ParamRef {
        self.param
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

/// Ordered, append-only list of bound parameters.
///
/// The position of a binding is its column in every slot, so unbinding never
/// removes the entry; it only retires the handle. Only `clear` shrinks the list.
pub struct Bindings {
    entries: Vec<Binding>,
    registry: Arc<dyn ParameterRegistry>,
    releases: HeapProd<ParamHandle>,
    /// Handles the release queue had no room for; retried later.
    retiring: Vec<ParamHandle>,
}

/// Consumer side of the release queue. Owns nothing real-time and may be
/// moved to a maintenance thread.
pub struct ReleaseDrain {
    releases: HeapCons<ParamHandle>,
    registry: Arc<dyn ParameterRegistry>,
}

impl ReleaseDrain {
    /// Unregisters every queued handle and returns how many were released.
    pub fn drain(&mut self) -> usize {
        let mut released = 0;
        while let Some(handle) = self.releases.try_pop() {
            self.registry.unregister(handle);
            released += 1;
        }
        if released > 0 {
            debug!(released, "Released parameter handles.");
        }
        released
    }

    /// Number of handles waiting to be released.
    pub fn pending(&self) -> usize {
        self.releases.occupied_len()
    }
}

impl Drop for ReleaseDrain {
    fn drop(&mut self) {
        self.drain();
    }
}

impl Bindings {
    /// Creates an empty list whose release queue holds `capacity` handles.
    pub fn new(registry: Arc<dyn ParameterRegistry>, capacity: usize) -> (Bindings, ReleaseDrain) {
        let (releases, consumer) = HeapRb::new(capacity.max(1)).split();
        (
            Bindings {
                entries: Vec::new(),
                registry: Arc::clone(&registry),
                releases,
                retiring: Vec::with_capacity(capacity.max(1)),
            },
            ReleaseDrain {
                releases: consumer,
                registry,
            },
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<&Binding> {
        self.entries.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.iter()
    }

    pub fn registry(&self) -> &Arc<dyn ParameterRegistry> {
        &self.registry
    }

    /// Whether a live binding for `param` exists.
    pub fn contains(&self, param: ParamRef) -> bool {
        self.entries
            .iter()
            .any(|binding| binding.is_live() && binding.param == param)
    }

    /// Binds a parameter and returns its column and current value (absent reads as 0).
    ///
    /// Returns `None` if the parameter is already bound.
    pub fn bind(&mut self, param: ParamRef) -> Option<(usize, f32)> {
        if self.contains(param) {
            return None;
        }
        let handle = self.registry.register(param);
        self.entries.push(Binding {
            param,
            handle: Some(handle),
        });
        let value = self.registry.resolve_current_value(handle).unwrap_or(0.0);
        Some((self.entries.len() - 1, value))
    }

    /// Appends a binding without reading its value, as when restoring a document.
    pub fn restore(&mut self, param: ParamRef) {
        let handle = self.registry.register(param);
        self.entries.push(Binding {
            param,
            handle: Some(handle),
        });
    }

    /// Appends a column whose binding was already released.
    pub fn restore_released(&mut self, param: ParamRef) {
        self.entries.push(Binding {
            param,
            handle: None,
        });
    }

    /// Retires the handle of a column. The column itself stays in place.
    pub fn unbind(&mut self, column: usize) -> Result<(), TransitError> {
        let bound = self.entries.len();
        let binding = self
            .entries
            .get_mut(column)
            .ok_or(TransitError::InvalidIndex {
                index: column,
                bound,
            })?;
        let handle = binding.handle.take().ok_or(TransitError::MissingReference)?;
        self.retire(handle);
        Ok(())
    }

    /// Current value of a column, or `None` if it does not resolve.
    pub fn read(&self, column: usize) -> Option<f32> {
        let handle = self.entries.get(column)?.handle?;
        self.registry.resolve_current_value(handle)
    }

    /// Current values of every column, with absent parameters read as 0.
    pub fn read_all(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.entries.len()).map(|column| self.read(column).unwrap_or(0.0))
    }

    /// Writes a column. Unbound or vanished parameters are skipped silently.
    pub fn write(&self, column: usize, value: f32) {
        if let Some(handle) = self.entries.get(column).and_then(|b| b.handle) {
            self.registry.set_value(handle, value);
        }
    }

    /// Asks the owner of a column to randomize it.
    pub fn randomize(&self, column: usize) {
        if let Some(handle) = self.entries.get(column).and_then(|b| b.handle) {
            self.registry.request_randomize(handle);
        }
    }

    /// Pushes indicator visibility to every live handle.
    pub fn refresh_indicators(&self, visible: bool) {
        self.entries
            .iter()
            .filter_map(|binding| binding.handle)
            .for_each(|handle| self.registry.set_indicator_visible(handle, visible));
    }

    /// Retires every handle and empties the list.
    pub fn clear(&mut self) {
        let handles: Vec<ParamHandle> = self.entries.drain(..).filter_map(|b| b.handle).collect();
        handles.into_iter().for_each(|handle| self.retire(handle));
    }

    /// Retries handles the release queue previously rejected. Returns how many
    /// are still waiting.
    pub fn retry_releases(&mut self) -> usize {
        while let Some(handle) = self.retiring.last().copied() {
            if self.releases.try_push(handle).is_err() {
                break;
            }
            self.retiring.pop();
        }
        self.retiring.len()
    }

    fn retire(&mut self, handle: ParamHandle) {
        if self.releases.try_push(handle).is_err() {
            warn!(
                handle = handle.0,
                "Release queue full, deferring handle to the next drain."
            );
            self.retiring.push(handle);
        }
    }
}

impl Drop for Bindings {
    fn drop(&mut self) {
        // Teardown runs off the real-time path, so release directly.
        for handle in self.entries.iter().filter_map(|b| b.handle) {
            self.registry.unregister(handle);
        }
        for handle in self.retiring.drain(..) {
            self.registry.unregister(handle);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::registry::MemoryRegistry;

    fn registry() -> Arc<MemoryRegistry> {
        let registry = Arc::new(MemoryRegistry::new(1));
        registry.add_param(1, 0, 0.5, 0.0, 1.0);
        registry.add_param(1, 1, 3.0, 0.0, 10.0);
        registry.add_param(2, 0, -1.0, -5.0, 5.0);
        registry
    }

    #[test]
    fn test_bind_is_idempotent() {
        let registry = registry();
        let (mut bindings, _drain) = Bindings::new(registry.clone(), 4);

        assert_eq!(bindings.bind(ParamRef::new(1, 0)), Some((0, 0.5)));
        assert_eq!(bindings.bind(ParamRef::new(1, 0)), None);
        assert_eq!(bindings.bind(ParamRef::new(1, 1)), Some((1, 3.0)));
        assert_eq!(bindings.len(), 2);
        assert_eq!(registry.registered(), 2);
    }

    #[test]
    fn test_missing_parameter_reads_zero() {
        let registry = registry();
        let (mut bindings, _drain) = Bindings::new(registry.clone(), 4);
        assert_eq!(bindings.bind(ParamRef::new(99, 0)), Some((0, 0.0)));

        bindings.bind(ParamRef::new(2, 0));
        registry.remove_owner(2);
        let values: Vec<f32> = bindings.read_all().collect();
        assert_eq!(values, vec![0.0, 0.0]);

        // Writing to a vanished owner does nothing.
        bindings.write(1, 3.0);
        assert_eq!(registry.value(ParamRef::new(2, 0)), None);
    }

    #[test]
    fn test_unbind_keeps_column_and_defers_release() {
        let registry = registry();
        let (mut bindings, mut drain) = Bindings::new(registry.clone(), 4);
        bindings.bind(ParamRef::new(1, 0));
        bindings.bind(ParamRef::new(1, 1));

        bindings.unbind(0).expect("column 0 is bound");
        assert_eq!(bindings.len(), 2);
        assert!(!bindings.get(0).expect("column 0 exists").is_live());
        assert_eq!(bindings.read(0), None);
        // Still registered until the maintenance side drains.
        assert_eq!(registry.registered(), 2);

        assert_eq!(drain.pending(), 1);
        assert_eq!(drain.drain(), 1);
        assert_eq!(registry.registered(), 1);

        // A second unbind of the same column reports the missing handle.
        assert!(matches!(
            bindings.unbind(0),
            Err(TransitError::MissingReference)
        ));
        assert!(matches!(
            bindings.unbind(5),
            Err(TransitError::InvalidIndex { index: 5, bound: 2 })
        ));

        // The parameter can be bound again, as a new column.
        assert_eq!(bindings.bind(ParamRef::new(1, 0)), Some((2, 0.5)));
    }

    #[test]
    fn test_full_queue_retries_later() {
        let registry = registry();
        let (mut bindings, mut drain) = Bindings::new(registry.clone(), 1);
        bindings.bind(ParamRef::new(1, 0));
        bindings.bind(ParamRef::new(1, 1));
        bindings.bind(ParamRef::new(2, 0));

        bindings.clear();
        assert!(bindings.is_empty());
        assert_eq!(drain.pending(), 1);

        assert_eq!(drain.drain(), 1);
        assert_eq!(bindings.retry_releases(), 1);
        assert_eq!(drain.drain(), 1);
        assert_eq!(bindings.retry_releases(), 0);
        assert_eq!(drain.drain(), 1);
        assert_eq!(registry.registered(), 0);
    }

    #[test]
    fn test_drop_unregisters_live_handles() {
        let registry = registry();
        {
            let (mut bindings, _drain) = Bindings::new(registry.clone(), 4);
            bindings.bind(ParamRef::new(1, 0));
            bindings.bind(ParamRef::new(1, 1));
        }
        assert_eq!(registry.registered(), 0);
    }
}

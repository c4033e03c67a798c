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

//! The host-side parameter registry that transit binds against.
//!
//! Transit never holds a reference to a parameter. It holds opaque handles and
//! asks the registry to resolve them, so the host decides what happens when an
//! owner disappears.

use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::MemoryRegistry;

/// Identifies a remote parameter by owner and index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub owner_id: i64,
    pub param_index: usize,
}

impl ParamRef {
    pub fn new(owner_id: i64, param_index: usize) -> ParamRef {
        ParamRef {
            owner_id,
            param_index,
        }
    }
}

/// Opaque registration handle issued by a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamHandle(pub u64);

/// A registry of externally owned parameters.
///
/// Implementations must tolerate handles whose owner has gone away: reads
/// return `None` and writes do nothing.
pub trait ParameterRegistry: Send + Sync {
    /// Registers interest in a parameter and returns a handle for it.
    fn register(&self, param: ParamRef) -> ParamHandle;

    /// Drops a registration. Not safe to call from the real-time path.
    fn unregister(&self, handle: ParamHandle);

    /// Current value of the parameter, if it still resolves.
    fn resolve_current_value(&self, handle: ParamHandle) -> Option<f32>;

    /// Writes a value to the parameter.
    fn set_value(&self, handle: ParamHandle, value: f32);

    /// Asks the parameter's owner to randomize it.
    fn request_randomize(&self, handle: ParamHandle);

    /// Number of parameters an owner exposes, if the owner exists.
    fn param_count(&self, _owner_id: i64) -> Option<usize> {
        None
    }

    /// Shows or hides the mapping indicator on a bound parameter.
    fn set_indicator_visible(&self, _handle: ParamHandle, _visible: bool) {}
}

/// Renumbers owner ids while a document is imported.
pub trait IdRemapper {
    /// Maps a persisted owner id to the live one.
    fn remap(&self, owner_id: i64) -> i64;

    /// True when this instance already exists in the host and the document is
    /// not being loaded as a copy, in which case loading must be skipped.
    fn already_present(&self) -> bool {
        false
    }
}

/// Leaves ids untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityRemap;

impl IdRemapper for IdentityRemap {
    fn remap(&self, owner_id: i64) -> i64 {
        owner_id
    }
}

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

/// Errors produced by slot, binding and chain operations.
///
/// None of these are fatal. The evaluation callback consumes them locally so
/// the host never sees a failure; callers that invoke operations directly can
/// inspect them to find out why a request was ignored.
#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    /// The owner or parameter behind a binding no longer exists.
    #[error("parameter reference no longer resolves")]
    MissingReference,

    /// A slot or channel index outside of the current bounds.
    #[error("index {index} is out of bounds (limit {bound})")]
    InvalidIndex { index: usize, bound: usize },

    /// The slot was never saved, so there is nothing to act on.
    #[error("slot {0} is empty")]
    EmptySlot(usize),

    /// A bounded resource (chain length, release queue, command queue) is full.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    /// A chain link was still owned by a different root.
    #[error("chain link owned by {found}, expected {expected}")]
    StaleTopology { expected: i64, found: i64 },

    /// The instance a command was addressed to has been dropped.
    #[error("instance is gone")]
    Disconnected,

    /// A persisted document could not be parsed at all.
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),
}

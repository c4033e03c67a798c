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

//! A snapshot sequencer and morpher for parameters owned by a modular host.
//!
//! A [Transit] captures the values of bound parameters into slots, recalls
//! them from a control input or buttons, and crossfades between the previous
//! and the new values with a shaped ramp. Extension instances chained to the
//! right of a root add more slots to the same address space.

pub mod bindings;
pub mod chain;
pub mod command;
pub mod config;
pub mod crossfade;
pub mod document;
pub mod dsp;
pub mod error;
pub mod registry;
pub mod selection;
pub mod slew;
pub mod slots;
pub mod status;
pub mod transit;

#[cfg(test)]
mod testutil;

pub use bindings::ReleaseDrain;
pub use chain::{Extension, Neighbor, SlotLink, SlotSpace, MAX_LINKS};
pub use command::{Command, CommandSender};
pub use crate::config::TransitConfig;
pub use crossfade::{OutMode, Outputs};
pub use document::{Document, ExtensionDocument};
pub use error::TransitError;
pub use registry::{IdRemapper, IdentityRemap, ParamHandle, ParamRef, ParameterRegistry};
pub use selection::SlotCvMode;
pub use status::{Status, StatusReader};
pub use transit::{ButtonEvent, Frame, Press, Session, Transit};

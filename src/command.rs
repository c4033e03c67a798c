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

//! Requests from presentation threads, applied by the next evaluation.

use crossbeam_channel::{Sender, TrySendError};

use crate::crossfade::OutMode;
use crate::error::TransitError;
use crate::selection::SlotCvMode;

/// A request to change an instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Load a slot directly.
    Load(usize),
    Save(usize),
    Clear(usize),
    Randomize(usize),
    /// Remember a slot as the paste source.
    Copy(usize),
    /// Copy the remembered slot into this one.
    Paste(usize),
    SetActiveCount(usize),
    SetWriteMode(bool),
    SetFade(f32),
    SetShape(f32),
    SetPanelTheme(i64),
    SetMappingIndicatorHidden(bool),
    SetProcessDivision(u32),
    SetSlotCvMode(SlotCvMode),
    SetOutMode(OutMode),
}

/// Sends commands to an instance without blocking.
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    pub(crate) fn new(sender: Sender<Command>) -> CommandSender {
        CommandSender { sender }
    }

    /// Queues a command. Fails if the queue is full or the instance is gone.
    pub fn send(&self, command: Command) -> Result<(), TransitError> {
        self.sender.try_send(command).map_err(|error| match error {
            TrySendError::Full(_) => TransitError::CapacityExceeded("command queue"),
            TrySendError::Disconnected(_) => TransitError::Disconnected,
        })
    }
}

#[cfg(test)]
mod test {
    use crossbeam_channel::bounded;

    use super::*;

    #[test]
    fn test_send_reports_full_and_disconnected() {
        let (sender, receiver) = bounded(1);
        let sender = CommandSender::new(sender);

        sender.send(Command::Load(1)).expect("queue has room");
        assert!(matches!(
            sender.send(Command::Load(2)),
            Err(TransitError::CapacityExceeded(_))
        ));
        assert_eq!(receiver.try_recv().ok(), Some(Command::Load(1)));

        drop(receiver);
        assert!(matches!(
            sender.send(Command::Clear(0)),
            Err(TransitError::Disconnected)
        ));
    }
}

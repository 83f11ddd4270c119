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
use std::{io::Write, sync::Arc};

use tracing::debug;

use crate::audio::Device;
use crate::error::CycleError;
use crate::samples::{Kit, SampleSlot};

/// Maps trigger codes onto kit slots and fires them on the audio device.
pub struct Dispatcher<W: Write> {
    kit: Kit,
    base_code: u8,
    device: Arc<dyn Device>,
    /// Where status lines go. None disables them.
    status: Option<W>,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(kit: Kit, base_code: u8, device: Arc<dyn Device>, status: Option<W>) -> Self {
        Dispatcher {
            kit,
            base_code,
            device,
            status,
        }
    }

    /// Plays the slot selected by the code and returns its index. Codes that select no
    /// slot are ignored and return None.
    pub fn dispatch(&mut self, code: u8) -> Result<Option<usize>, CycleError> {
        let Some(slot) = lookup(&self.kit, self.base_code, code) else {
            return Ok(None);
        };

        self.device.play(slot)?;
        debug!(code, slot = slot.name(), "Triggered");

        if let Some(status) = self.status.as_mut() {
            writeln!(status, "Played: {}", slot.name()).map_err(CycleError::Status)?;
        }
        Ok(Some(slot.index()))
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Returns the status sink.
    pub fn status(&self) -> Option<&W> {
        self.status.as_ref()
    }
}

/// Returns the slot a code selects. The range follows the kit's size.
fn lookup(kit: &Kit, base_code: u8, code: u8) -> Option<&SampleSlot> {
    code.checked_sub(base_code)
        .and_then(|index| kit.get(index as usize))
}

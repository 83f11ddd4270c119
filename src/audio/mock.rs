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
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::error::AudioError;
use super::mixer::{Voice, VoicePool};
use crate::samples::SampleSlot;

/// Number of output channels the mock pretends to have.
const MOCK_CHANNELS: u16 = 2;

/// A mock device. Runs the real voice pool but never opens an output stream;
/// audio only advances when [`Device::render`] is called.
pub struct Device {
    name: String,
    pool: Mutex<VoicePool>,
    triggered: Mutex<Vec<usize>>,
    fail_next: AtomicBool,
    stopped: AtomicBool,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, max_voices: usize) -> Device {
        info!(device = name, max_voices, "Using mock audio device");
        Device {
            name: name.to_string(),
            pool: Mutex::new(VoicePool::new(max_voices, MOCK_CHANNELS)),
            triggered: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Returns the slot indices that have been played, in trigger order.
    pub fn triggered(&self) -> Vec<usize> {
        self.triggered.lock().clone()
    }

    /// Makes the next play fail.
    pub fn fail_next_play(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    /// Returns true once the device has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Returns the slots of the voices still sounding, oldest first.
    pub fn active_slots(&self) -> Vec<usize> {
        self.pool.lock().active_slots()
    }

    /// Mixes the given number of frames, advancing every voice.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut pool = self.pool.lock();
        let mut output = vec![0.0; frames * pool.output_channels() as usize];
        pool.mix(&mut output);
        output
    }
}

impl super::Device for Device {
    fn play(&self, slot: &SampleSlot) -> Result<(), AudioError> {
        if self.stopped.load(Ordering::Relaxed) || self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(AudioError::Disconnected);
        }

        self.pool.lock().start(Voice::new(slot));
        self.triggered.lock().push(slot.index());
        debug!(device = self.name, slot = slot.name(), "Mock voice started");
        Ok(())
    }

    fn active_voices(&self) -> usize {
        self.pool.lock().active()
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::Relaxed) {
            self.pool.lock().clear();
            info!(device = self.name, "Mock audio released");
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

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
use std::{fmt, sync::Arc};

use crate::config;
use crate::samples::SampleSlot;

pub mod cpal;
pub mod error;
pub mod mixer;
pub mod mock;
mod thread_priority;

pub use error::AudioError;

/// An output that can play kit samples.
pub trait Device: fmt::Display + Send + Sync {
    /// Starts the slot's sample as a new, independent voice and returns immediately.
    /// Voices already sounding, including ones for the same slot, keep playing.
    fn play(&self, slot: &SampleSlot) -> Result<(), AudioError>;

    /// Returns the number of voices currently sounding.
    fn active_voices(&self) -> usize;

    /// Silences everything and releases the output. Plays after this fail.
    fn stop(&self);
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, AudioError> {
    cpal::Device::list()
}

/// Opens the device named in the config.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, config.max_voices())));
    };

    Ok(Arc::new(cpal::Device::open(config)?))
}

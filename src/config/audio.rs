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
use serde::Deserialize;

use super::error::ConfigError;

/// The device name that selects the host's default output.
pub const DEFAULT_DEVICE: &str = "default";
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Small buffers keep trigger latency low. If playback clicks or pops, try 512.
pub const DEFAULT_BUFFER_SIZE: usize = 256;
pub const DEFAULT_MAX_VOICES: usize = 16;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The audio device. "default" picks the host default, "mock..." picks the mock device.
    device: Option<String>,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Output stream buffer size in frames (default: 256).
    /// Lower values mean lower latency but more risk of underruns.
    buffer_size: Option<usize>,

    /// Maximum number of simultaneously sounding voices (default: 16).
    max_voices: Option<usize>,
}

impl Audio {
    /// Creates an audio configuration for the named device with default settings.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the output stream buffer size in frames.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Returns the size of the voice pool.
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::Zero {
                field: "audio.sample_rate",
            });
        }
        if self.buffer_size() == 0 {
            return Err(ConfigError::Zero {
                field: "audio.buffer_size",
            });
        }
        if self.max_voices() == 0 {
            return Err(ConfigError::Zero {
                field: "audio.max_voices",
            });
        }
        Ok(())
    }
}

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

const DEFAULT_KIT_PATH: &str = "SAMPLES";

/// A YAML representation of the drum kit.
#[derive(Deserialize, Clone, Debug)]
pub struct Kit {
    /// The directory that relative slot files are resolved against.
    #[serde(default = "default_path")]
    path: String,

    /// The slots in code order: the first slot is played by the base code.
    #[serde(default = "default_slots")]
    slots: Vec<Slot>,
}

/// A YAML representation of a single kit slot.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Slot {
    /// Human readable name, used in status lines.
    name: String,

    /// The audio file for this slot.
    file: String,

    /// Playback gain (default: 1.0).
    volume: Option<f32>,
}

fn default_path() -> String {
    DEFAULT_KIT_PATH.to_string()
}

fn default_slots() -> Vec<Slot> {
    vec![
        Slot::new("Snare", "SNARES/07_Snare_16_SP.wav"),
        Slot::new("Hi-Hat", "HIHATS/Boom-Bap Hat CL 53.wav"),
        Slot::new("Tom", "TOMS/TOM.wav"),
        Slot::new("Crash", "CYMBALS/07_Perc_05_SP.wav"),
        Slot::new("Ride", "CYMBALS/MachineRide.wav"),
        Slot::new("Kick", "KICKS/Boom-Bap Kick 53.wav"),
    ]
}

impl Default for Kit {
    fn default() -> Self {
        Kit {
            path: default_path(),
            slots: default_slots(),
        }
    }
}

impl Kit {
    /// Creates a kit from the given slots.
    pub fn new(path: &str, slots: Vec<Slot>) -> Kit {
        Kit {
            path: path.to_string(),
            slots,
        }
    }

    /// Returns the sample directory as written in the config.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the slots in code order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(super) fn validate(&self, base_code: u8) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::EmptyKit);
        }

        let addressable = (u8::MAX - base_code) as usize + 1;
        if self.slots.len() > addressable {
            return Err(ConfigError::TooManySlots {
                count: self.slots.len(),
                addressable,
                base_code,
            });
        }

        for slot in self.slots.iter() {
            let volume = slot.volume();
            if !volume.is_finite() || volume < 0.0 {
                return Err(ConfigError::InvalidVolume {
                    name: slot.name.clone(),
                    volume,
                });
            }
        }
        Ok(())
    }
}

impl Slot {
    /// Creates a slot at full volume.
    pub fn new(name: &str, file: &str) -> Slot {
        Slot {
            name: name.to_string(),
            file: file.to_string(),
            volume: None,
        }
    }

    /// Sets the slot volume.
    pub fn with_volume(mut self, volume: f32) -> Slot {
        self.volume = Some(volume);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }
}

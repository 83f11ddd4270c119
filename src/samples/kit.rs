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
use std::path::{Path, PathBuf};

use tracing::{info, span, Level};

use super::loader::{LoadedSample, SampleLoader};
use crate::config;
use crate::error::StartupError;

/// A kit slot with its sample decoded and ready to play.
#[derive(Clone)]
pub struct SampleSlot {
    index: usize,
    name: String,
    volume: f32,
    sample: LoadedSample,
}

impl SampleSlot {
    pub fn new(index: usize, name: &str, volume: f32, sample: LoadedSample) -> SampleSlot {
        SampleSlot {
            index,
            name: name.to_string(),
            volume,
            sample,
        }
    }

    /// The slot's position in the kit.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn sample(&self) -> &LoadedSample {
        &self.sample
    }
}

/// The loaded drum kit. Slot order matches code order and never changes after loading.
pub struct Kit {
    slots: Vec<SampleSlot>,
}

impl Kit {
    /// Decodes every slot's file. Any file that can't be loaded fails the whole kit.
    pub fn load(
        config: &config::Kit,
        samples_dir: &Path,
        sample_rate: u32,
    ) -> Result<Kit, StartupError> {
        let span = span!(Level::INFO, "load kit");
        let _enter = span.enter();

        let mut loader = SampleLoader::new(sample_rate);
        let mut slots = Vec::with_capacity(config.slots().len());
        for (index, slot) in config.slots().iter().enumerate() {
            let path = resolve(samples_dir, slot.file());
            let sample = loader.load(&path)?;
            slots.push(SampleSlot::new(index, slot.name(), slot.volume(), sample));
        }

        info!(
            slots = slots.len(),
            memory_kb = loader.total_memory_usage() / 1024,
            "Kit loaded"
        );
        Ok(Kit { slots })
    }

    /// Builds a kit from slots that are already loaded.
    pub fn from_slots(slots: Vec<SampleSlot>) -> Kit {
        Kit { slots }
    }

    /// Returns the slot at the given index, if the kit has one.
    pub fn get(&self, index: usize) -> Option<&SampleSlot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleSlot> {
        self.slots.iter()
    }
}

fn resolve(samples_dir: &Path, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        samples_dir.join(file)
    }
}

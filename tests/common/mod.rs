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
#![allow(dead_code)]

use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use hound::{SampleFormat, WavSpec, WavWriter};

/// The default kit's files, relative to the kit directory.
pub const DEFAULT_FILES: [&str; 6] = [
    "SNARES/07_Snare_16_SP.wav",
    "HIHATS/Boom-Bap Hat CL 53.wav",
    "TOMS/TOM.wav",
    "CYMBALS/07_Perc_05_SP.wav",
    "CYMBALS/MachineRide.wav",
    "KICKS/Boom-Bap Kick 53.wav",
];

/// Writes a short mono click to the given path, creating parent directories.
pub fn write_click(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )
    .unwrap();
    for i in 0..4410 {
        writer.write_sample(((i % 100) * 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Populates a kit directory with every default sample.
pub fn write_default_kit(dir: &Path) {
    for file in DEFAULT_FILES {
        write_click(&dir.join(file));
    }
}

/// Wait for the given predicate to return true or fail.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if predicate() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("{}", error_msg);
}

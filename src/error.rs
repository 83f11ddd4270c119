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
use std::{io, path::PathBuf};

use crate::audio::AudioError;
use crate::config::ConfigError;

/// Errors that stop the program before the dispatch loop begins.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("sample file not found: {}", path.display())]
    MissingSample { path: PathBuf },

    #[error("unable to read sample file {}: {source}", path.display())]
    UnreadableSample {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to decode sample file {}: {reason}", path.display())]
    UndecodableSample { path: PathBuf, reason: String },

    #[error("unable to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("audio output error: {0}")]
    Audio(#[from] AudioError),
}

/// Errors raised inside a single dispatch cycle. The loop logs these and carries on.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("serial read failed: {0}")]
    Serial(#[source] io::Error),

    #[error("playback failed: {0}")]
    Playback(#[from] AudioError),

    #[error("unable to write status line: {0}")]
    Status(#[source] io::Error),
}

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
/// Error types for audio output operations
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no device found with name {0}")]
    DeviceNotFound(String),

    #[error("no default output device is available")]
    NoDefaultDevice,

    #[error("unable to query device: {0}")]
    Query(String),

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unable to spawn output thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("audio output is not running")]
    Disconnected,
}

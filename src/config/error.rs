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

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from a bad value without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid duration '{value}' for {field}: {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("the kit must define at least one slot")]
    EmptyKit,

    #[error("slot '{name}' has invalid volume {volume}")]
    InvalidVolume { name: String, volume: f32 },

    #[error("kit defines {count} slots, but only {addressable} codes are addressable from base code {base_code}")]
    TooManySlots {
        count: usize,
        addressable: usize,
        base_code: u8,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

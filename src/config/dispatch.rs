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
use std::time::Duration;

use serde::Deserialize;

use super::{error::ConfigError, parse_duration};

/// The code that selects slot 0. The firmware sends ASCII digits.
pub const DEFAULT_BASE_CODE: u8 = b'0';
const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(1);
const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_millis(100);

/// A YAML representation of the dispatch loop settings.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Dispatch {
    /// The byte value mapped to slot 0 (default: 48, ASCII '0').
    base_code: Option<u8>,

    /// Print a status line for every played sample (default: true).
    /// Writing the line costs a little latency per hit.
    status_lines: Option<bool>,

    /// Sleep between polling cycles (default: 1ms).
    idle_delay: Option<String>,

    /// Sleep after a failed cycle before polling again (default: 100ms).
    error_cooldown: Option<String>,
}

impl Dispatch {
    /// Returns the base code.
    pub fn base_code(&self) -> u8 {
        self.base_code.unwrap_or(DEFAULT_BASE_CODE)
    }

    /// Returns true if status lines should be written.
    pub fn status_lines(&self) -> bool {
        self.status_lines.unwrap_or(true)
    }

    /// Returns the idle delay between polling cycles.
    pub fn idle_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration("dispatch.idle_delay", &self.idle_delay, DEFAULT_IDLE_DELAY)
    }

    /// Returns the cooldown after a failed cycle.
    pub fn error_cooldown(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "dispatch.error_cooldown",
            &self.error_cooldown,
            DEFAULT_ERROR_COOLDOWN,
        )
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.idle_delay()?;
        self.error_cooldown()?;
        Ok(())
    }
}

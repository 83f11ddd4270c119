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

/// The baud rate the trigger firmware talks at.
pub const DEFAULT_BAUD_RATE: u32 = 230_400;

/// Most boards reset when the port is opened, so give them a moment before listening.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// A YAML representation of the serial endpoint.
#[derive(Deserialize, Clone, Debug)]
pub struct Serial {
    /// The serial device, e.g. /dev/ttyACM0 or COM8.
    port: String,

    /// The baud rate (default: 230400).
    baud_rate: Option<u32>,

    /// How long to wait after opening the port before listening (default: 1s).
    settle_delay: Option<String>,
}

impl Serial {
    /// New will create a new serial configuration.
    pub fn new(port: &str) -> Serial {
        Serial {
            port: port.to_string(),
            baud_rate: None,
            settle_delay: None,
        }
    }

    /// Returns the serial device name.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns the baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE)
    }

    /// Returns the delay between opening the port and entering the dispatch loop.
    pub fn settle_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration("serial.settle_delay", &self.settle_delay, DEFAULT_SETTLE_DELAY)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate() == 0 {
            return Err(ConfigError::Zero {
                field: "serial.baud_rate",
            });
        }
        self.settle_delay()?;
        Ok(())
    }
}

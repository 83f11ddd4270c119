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
use std::{fmt, io};

use tracing::info;

use crate::config;
use crate::error::StartupError;

pub mod mock;
mod port;

pub use port::PortInfo;

/// A byte source the trigger codes arrive on.
pub trait Endpoint: fmt::Display + Send {
    /// Returns how many bytes can be read right now without waiting.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Reads into the buffer without waiting and returns the number of bytes read.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Lists serial ports known to the system.
pub fn list_ports() -> Result<Vec<PortInfo>, serialport::Error> {
    port::list()
}

/// Opens the endpoint named in the config.
pub fn open(config: &config::Serial) -> Result<Box<dyn Endpoint>, StartupError> {
    let port = config.port();
    if port.starts_with("mock") {
        let (endpoint, _feeder) = mock::Endpoint::new(port);
        return Ok(Box::new(endpoint));
    }

    Ok(Box::new(port::Port::open(port, config.baud_rate())?))
}

/// Polls an endpoint and hands back everything that has arrived since the last poll.
pub struct SerialReader {
    endpoint: Box<dyn Endpoint>,
    buffer: Vec<u8>,
}

impl SerialReader {
    pub fn new(endpoint: Box<dyn Endpoint>) -> SerialReader {
        SerialReader {
            endpoint,
            buffer: Vec::with_capacity(64),
        }
    }

    /// Reads every byte that is pending, in arrival order. Returns an empty slice
    /// immediately when nothing is waiting.
    pub fn drain(&mut self) -> io::Result<&[u8]> {
        let available = match self.endpoint.bytes_available() {
            Ok(available) => available,
            Err(e) if is_no_data(&e) => 0,
            Err(e) => return Err(e),
        };
        if available == 0 {
            return Ok(&[]);
        }

        self.buffer.resize(available, 0);
        let read = match self.endpoint.read_available(&mut self.buffer) {
            Ok(read) => read,
            Err(e) if is_no_data(&e) => 0,
            Err(e) => return Err(e),
        };
        Ok(&self.buffer[..read])
    }

    /// Returns the endpoint's display name.
    pub fn name(&self) -> String {
        self.endpoint.to_string()
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        info!(port = %self.endpoint, "Serial port closed");
    }
}

// A zero timeout read reports an empty port as a timeout on some platforms.
fn is_no_data(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

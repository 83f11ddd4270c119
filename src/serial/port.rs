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
use std::{fmt, io, io::Read, time::Duration};

use serialport::{SerialPort, SerialPortType};
use tracing::{info, span, Level};

use crate::error::StartupError;

/// A serial port as reported by the system.
pub struct PortInfo {
    name: String,
    kind: String,
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

pub(super) fn list() -> Result<Vec<PortInfo>, serialport::Error> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()?
        .into_iter()
        .map(|port| PortInfo {
            kind: match port.port_type {
                SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("USB: {}", product),
                    None => format!("USB: {:04x}:{:04x}", usb.vid, usb.pid),
                },
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "Unknown".to_string(),
            },
            name: port.port_name,
        })
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

/// A real serial port opened for zero-timeout reads.
pub(super) struct Port {
    name: String,
    baud_rate: u32,
    port: Box<dyn SerialPort>,
}

impl Port {
    pub(super) fn open(name: &str, baud_rate: u32) -> Result<Port, StartupError> {
        let span = span!(Level::INFO, "open serial");
        let _enter = span.enter();

        let port = serialport::new(name, baud_rate)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|source| StartupError::SerialOpen {
                port: name.to_string(),
                source,
            })?;

        info!(port = name, baud_rate, "Serial port opened");
        Ok(Port {
            name: name.to_string(),
            baud_rate,
            port,
        })
    }
}

impl super::Endpoint for Port {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} baud)", self.name, self.baud_rate)
    }
}

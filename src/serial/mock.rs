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
use std::{collections::VecDeque, fmt, io, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

#[derive(Default)]
struct State {
    pending: VecDeque<u8>,
    failures: VecDeque<io::ErrorKind>,
    closed: bool,
}

/// A mock serial endpoint. Bytes only arrive when a [`Feeder`] pushes them.
pub struct Endpoint {
    name: String,
    state: Arc<Mutex<State>>,
}

/// The test side of a mock endpoint.
#[derive(Clone)]
pub struct Feeder {
    state: Arc<Mutex<State>>,
}

impl Endpoint {
    /// Creates a mock endpoint and the feeder that drives it.
    pub fn new(name: &str) -> (Endpoint, Feeder) {
        info!(port = name, "Using mock serial endpoint");
        let state = Arc::new(Mutex::new(State::default()));
        (
            Endpoint {
                name: name.to_string(),
                state: state.clone(),
            },
            Feeder { state },
        )
    }
}

impl super::Endpoint for Endpoint {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut state = self.state.lock();
        if let Some(kind) = state.failures.pop_front() {
            return Err(io::Error::new(kind, "injected mock failure"));
        }
        Ok(state.pending.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let count = buf.len().min(state.pending.len());
        for (dst, src) in buf.iter_mut().zip(state.pending.drain(..count)) {
            *dst = src;
        }
        Ok(count)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.state.lock().closed = true;
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

impl Feeder {
    /// Queues bytes as if they had arrived on the wire.
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().pending.extend(bytes);
    }

    /// Makes the next poll of the endpoint fail with the given kind.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.state.lock().failures.push_back(kind);
    }

    /// Returns the number of injected failures not yet raised.
    pub fn pending_failures(&self) -> usize {
        self.state.lock().failures.len()
    }

    /// Returns true once the endpoint has been dropped.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

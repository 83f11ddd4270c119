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
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Represents the current cancel state.
#[derive(PartialEq)]
enum CancelState {
    Untouched,
    Cancelled,
}

/// A cancel handle is shared between whoever receives the interrupt and the loops that
/// must stop because of it. It's each loop's responsibility to check it.
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<(Mutex<CancelState>, Condvar)>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            state: Arc::new((Mutex::new(CancelState::Untouched), Condvar::new())),
        }
    }

    /// Returns true if the handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.state.0.lock() == CancelState::Cancelled
    }

    /// Blocks until the handle is cancelled.
    pub fn wait(&self) {
        let (lock, condvar) = &*self.state;
        let mut state = lock.lock();
        condvar.wait_while(&mut state, |state| *state == CancelState::Untouched);
    }

    /// Sleeps for up to the given duration, waking early on cancellation.
    /// Returns true if the handle was cancelled.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let (lock, condvar) = &*self.state;
        let mut state = lock.lock();
        condvar.wait_while_for(
            &mut state,
            |state| *state == CancelState::Untouched,
            timeout,
        );
        *state == CancelState::Cancelled
    }

    /// Cancels the handle and wakes every waiter.
    pub fn cancel(&self) {
        let (lock, condvar) = &*self.state;
        let mut state = lock.lock();
        if *state == CancelState::Untouched {
            *state = CancelState::Cancelled;
            condvar.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || cancel_handle.wait())
        };

        cancel_handle.cancel();
        assert!(join.join().is_ok());
        assert!(cancel_handle.is_cancelled());
    }

    #[test]
    fn test_sleep_times_out() {
        let cancel_handle = CancelHandle::new();

        let start = Instant::now();
        assert!(!cancel_handle.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let cancel_handle = CancelHandle::new();

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = cancel_handle.sleep(Duration::from_secs(30));
                (cancelled, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        cancel_handle.cancel();

        let (cancelled, elapsed) = join.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(30));
    }

    #[test]
    fn test_sleep_after_cancel_returns_immediately() {
        let cancel_handle = CancelHandle::new();
        cancel_handle.cancel();

        assert!(cancel_handle.sleep(Duration::from_secs(30)));
    }
}

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

//! The poll/dispatch loop.
//!
//! One thread owns the serial reader and the dispatcher. Each cycle drains whatever
//! arrived, fires the matching slots in arrival order, then idles briefly. Playback
//! itself happens on the audio device's thread, so a cycle never waits on a sound.

use std::{io::Write, time::Duration};

use tracing::{error, info, span, warn, Level};

use crate::audio;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{CycleError, StartupError};
use crate::playsync::CancelHandle;
use crate::samples::Kit;
use crate::serial::{self, SerialReader};

/// How long the loop sleeps between cycles and after a failed one.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub idle_delay: Duration,
    pub error_cooldown: Duration,
}

/// Counters kept by the dispatch loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub cycles: u64,
    pub received: u64,
    pub played: u64,
    pub ignored: u64,
    /// Individual failures. One cycle can add several.
    pub errors: u64,
}

/// Owns everything the dispatch loop touches.
pub struct Engine<W: Write> {
    reader: SerialReader,
    dispatcher: Dispatcher<W>,
    timing: Timing,
    stats: Stats,
}

impl<W: Write> Engine<W> {
    pub fn new(reader: SerialReader, dispatcher: Dispatcher<W>, timing: Timing) -> Self {
        Engine {
            reader,
            dispatcher,
            timing,
            stats: Stats::default(),
        }
    }

    /// Brings everything up in dependency order: the kit, then audio, then serial.
    /// A kit that can't be loaded means the serial port is never touched. Status
    /// lines go to the given sink if the config enables them. Cancelling the handle
    /// cuts the settle delay short.
    pub fn start(
        config: &Config,
        status: W,
        shutdown: &CancelHandle,
    ) -> Result<Engine<W>, StartupError> {
        let span = span!(Level::INFO, "start");
        let _enter = span.enter();

        let dispatch = config.dispatch();
        let timing = Timing {
            idle_delay: dispatch.idle_delay()?,
            error_cooldown: dispatch.error_cooldown()?,
        };
        let settle_delay = config.serial().settle_delay()?;

        let kit = Kit::load(
            config.kit(),
            &config.samples_dir(),
            config.audio().sample_rate(),
        )?;
        let device = audio::get_device(config.audio())?;
        info!(device = %device, "Audio ready");

        let endpoint = serial::open(config.serial())?;
        if !settle_delay.is_zero() {
            info!(settle_delay = ?settle_delay, "Waiting for the board to settle");
            shutdown.sleep(settle_delay);
        }

        let status = dispatch.status_lines().then_some(status);
        let dispatcher = Dispatcher::new(kit, dispatch.base_code(), device, status);
        Ok(Engine::new(SerialReader::new(endpoint), dispatcher, timing))
    }

    /// Runs a single poll/dispatch cycle and returns the number of slots played.
    ///
    /// Every drained byte is dispatched even if an earlier one failed. The first
    /// failure is returned once the batch is done and later ones are logged here.
    /// A hit whose status line couldn't be written still counts as played.
    pub fn cycle(&mut self) -> Result<usize, CycleError> {
        self.stats.cycles += 1;
        let codes = match self.reader.drain() {
            Ok(codes) => codes,
            Err(e) => {
                self.stats.errors += 1;
                return Err(CycleError::Serial(e));
            }
        };
        self.stats.received += codes.len() as u64;

        let mut played = 0;
        let mut first_error = None;
        for &code in codes {
            let result = self.dispatcher.dispatch(code);
            match result {
                Ok(Some(_)) | Err(CycleError::Status(_)) => played += 1,
                Ok(None) => self.stats.ignored += 1,
                Err(_) => {}
            }
            if let Err(e) = result {
                self.stats.errors += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(code, err = %e, "Dispatch failed");
                }
            }
        }
        self.stats.played += played as u64;

        match first_error {
            Some(e) => Err(e),
            None => Ok(played),
        }
    }

    /// Cycles until the handle is cancelled. Failed cycles are logged and followed
    /// by the error cooldown; they never end the loop.
    pub fn run(&mut self, shutdown: &CancelHandle) -> Stats {
        let span = span!(Level::INFO, "dispatch loop");
        let _enter = span.enter();

        info!(
            port = self.reader.name(),
            slots = self.dispatcher.kit().len(),
            idle_delay = ?self.timing.idle_delay,
            "Dispatch loop started"
        );

        while !shutdown.is_cancelled() {
            match self.cycle() {
                Ok(_) => spin_sleep::sleep(self.timing.idle_delay),
                Err(e) => {
                    error!(err = %e, cooldown = ?self.timing.error_cooldown, "Cycle failed");
                    if shutdown.sleep(self.timing.error_cooldown) {
                        break;
                    }
                }
            }
        }

        info!(
            cycles = self.stats.cycles,
            received = self.stats.received,
            played = self.stats.played,
            ignored = self.stats.ignored,
            errors = self.stats.errors,
            "Dispatch loop stopped"
        );
        self.stats
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn dispatcher(&self) -> &Dispatcher<W> {
        &self.dispatcher
    }

    /// Closes the serial endpoint, then releases the audio device.
    pub fn close(self) {
        let Engine {
            reader, dispatcher, ..
        } = self;
        drop(reader);
        dispatcher.device().stop();
    }
}

#[cfg(test)]
mod test {
    use std::{io, sync::Arc, thread, time::Instant};

    use super::*;
    use crate::audio::mock;
    use crate::serial::mock::{Endpoint, Feeder};
    use crate::testutil::{default_kit, eventually, BrokenPipe};

    fn engine(status: bool) -> (Engine<Vec<u8>>, Feeder, Arc<mock::Device>) {
        let (endpoint, feeder) = Endpoint::new("mock-serial");
        let device = Arc::new(mock::Device::get("mock", 16));
        let dispatcher = Dispatcher::new(
            default_kit(),
            b'0',
            device.clone(),
            status.then(Vec::new),
        );
        let timing = Timing {
            idle_delay: Duration::from_millis(1),
            error_cooldown: Duration::from_millis(20),
        };
        (
            Engine::new(SerialReader::new(Box::new(endpoint)), dispatcher, timing),
            feeder,
            device,
        )
    }

    #[test]
    fn test_cycle_with_nothing_pending() {
        let (mut engine, _feeder, device) = engine(true);

        assert_eq!(engine.cycle().unwrap(), 0);
        assert!(device.triggered().is_empty());
        assert_eq!(engine.stats().cycles, 1);
    }

    #[test]
    fn test_cycle_dispatches_in_arrival_order() {
        let (mut engine, feeder, device) = engine(true);
        feeder.feed(&[0x30, 0x35, 0x39, 0x32]);

        assert_eq!(engine.cycle().unwrap(), 3);
        assert_eq!(device.triggered(), vec![0, 5, 2]);
        assert_eq!(
            engine.dispatcher().status().unwrap().as_slice(),
            b"Played: Snare\nPlayed: Kick\nPlayed: Tom\n"
        );
        assert_eq!(
            engine.stats(),
            Stats {
                cycles: 1,
                received: 4,
                played: 3,
                ignored: 1,
                errors: 0,
            }
        );
    }

    #[test]
    fn test_failed_play_does_not_drop_the_rest_of_the_batch() {
        let (mut engine, feeder, device) = engine(false);
        feeder.feed(b"012");
        device.fail_next_play();

        assert!(matches!(engine.cycle(), Err(CycleError::Playback(_))));
        assert_eq!(device.triggered(), vec![1, 2]);
    }

    #[test]
    fn test_hits_count_as_played_when_status_write_fails() {
        let (endpoint, feeder) = Endpoint::new("mock-serial");
        let device = Arc::new(mock::Device::get("mock", 16));
        let dispatcher = Dispatcher::new(default_kit(), b'0', device.clone(), Some(BrokenPipe));
        let timing = Timing {
            idle_delay: Duration::from_millis(1),
            error_cooldown: Duration::from_millis(20),
        };
        let mut engine = Engine::new(SerialReader::new(Box::new(endpoint)), dispatcher, timing);
        feeder.feed(b"012");

        assert!(matches!(engine.cycle(), Err(CycleError::Status(_))));
        assert_eq!(device.triggered(), vec![0, 1, 2]);
        assert_eq!(engine.stats().played, 3);
        assert_eq!(engine.stats().errors, 3);
    }

    #[test]
    fn test_failed_play_counts_once() {
        let (mut engine, feeder, device) = engine(false);
        feeder.feed(b"12");
        device.fail_next_play();

        assert!(engine.cycle().is_err());
        assert_eq!(engine.stats().played, 1);
        assert_eq!(engine.stats().errors, 1);
    }

    #[test]
    fn test_read_error_is_a_cycle_error() {
        let (mut engine, feeder, _device) = engine(false);
        feeder.fail_next_read(io::ErrorKind::BrokenPipe);

        assert!(matches!(engine.cycle(), Err(CycleError::Serial(_))));
    }

    #[test]
    fn test_run_survives_failed_cycles() {
        let (mut engine, feeder, device) = engine(false);
        let shutdown = CancelHandle::new();

        let handle = {
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                let stats = engine.run(&shutdown);
                (engine, stats)
            })
        };

        feeder.feed(b"0");
        eventually(|| device.triggered().len() == 1, "first hit never played");

        feeder.fail_next_read(io::ErrorKind::BrokenPipe);
        feeder.feed(b"4");
        eventually(|| device.triggered().len() == 2, "loop stopped after a failure");
        assert_eq!(device.triggered(), vec![0, 4]);

        shutdown.cancel();
        let (engine, stats) = handle.join().unwrap();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.played, 2);

        engine.close();
        assert!(feeder.is_closed());
        assert!(device.is_stopped());
    }

    #[test]
    fn test_cancel_during_cooldown_stops_promptly() {
        let (endpoint, feeder) = Endpoint::new("mock-serial");
        let device = Arc::new(mock::Device::get("mock", 16));
        let dispatcher: Dispatcher<Vec<u8>> = Dispatcher::new(default_kit(), b'0', device, None);
        let timing = Timing {
            idle_delay: Duration::from_millis(1),
            error_cooldown: Duration::from_secs(60),
        };
        let mut engine = Engine::new(SerialReader::new(Box::new(endpoint)), dispatcher, timing);
        let shutdown = CancelHandle::new();

        feeder.fail_next_read(io::ErrorKind::BrokenPipe);
        let handle = {
            let shutdown = shutdown.clone();
            thread::spawn(move || engine.run(&shutdown))
        };

        eventually(|| feeder.pending_failures() == 0, "loop never polled");
        let cancelled_at = Instant::now();
        shutdown.cancel();

        let stats = handle.join().unwrap();
        assert_eq!(stats.errors, 1);
        assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_returns_immediately_when_already_cancelled() {
        let (mut engine, _feeder, _device) = engine(false);
        let shutdown = CancelHandle::new();
        shutdown.cancel();

        let stats = engine.run(&shutdown);
        assert_eq!(stats.cycles, 0);
    }
}

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
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, span, warn, Level};

use super::error::AudioError;
use super::mixer::{Voice, VoicePool};
use super::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use crate::{config, playsync::CancelHandle, samples::SampleSlot};

/// An output device as reported by the host.
pub struct DeviceInfo {
    name: String,
    max_channels: u16,
    host_id: cpal::HostId,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A running cpal output stream that mixes triggered voices.
///
/// The stream lives on its own thread because cpal streams aren't Send on every
/// platform. Voices reach the audio callback over a channel, so triggering never
/// takes a lock the callback holds.
pub struct Device {
    /// The name of the device.
    name: String,
    /// Number of interleaved output channels.
    channels: u16,
    /// Output sample rate.
    sample_rate: u32,
    /// Channel for handing new voices to the audio callback.
    voice_tx: Sender<Voice>,
    /// Voice count published by the audio callback.
    active: Arc<AtomicUsize>,
    /// Stops the output thread.
    shutdown: CancelHandle,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, {}Hz)",
            self.name, self.channels, self.sample_rate
        )
    }
}

impl Device {
    /// Lists the output devices of every available host.
    pub fn list() -> Result<Vec<DeviceInfo>, AudioError> {
        // Suppress noisy backend output while probing.
        let _shh_stdout = shh::stdout().ok();
        let _shh_stderr = shh::stderr().ok();

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    warn!(err = %e, host = host_id.name(), "Host unavailable");
                    continue;
                }
            };
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|c| c.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };
                if max_channels == 0 {
                    continue;
                }
                let name = match device.name() {
                    Ok(name) => name,
                    Err(_) => continue,
                };
                devices.push(DeviceInfo {
                    name,
                    max_channels,
                    host_id,
                });
            }
        }

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    /// Finds the device named in the config, or the host default for "default".
    fn find(name: &str) -> Result<cpal::Device, AudioError> {
        if name == config::audio::DEFAULT_DEVICE {
            return cpal::default_host()
                .default_output_device()
                .ok_or(AudioError::NoDefaultDevice);
        }

        let _shh_stdout = shh::stdout().ok();
        let _shh_stderr = shh::stderr().ok();

        for host_id in cpal::available_hosts() {
            let Ok(host) = cpal::host_from_id(host_id) else {
                continue;
            };
            let Ok(devices) = host.output_devices() else {
                continue;
            };
            for device in devices {
                if device.name().is_ok_and(|n| n.trim() == name) {
                    return Ok(device);
                }
            }
        }

        Err(AudioError::DeviceNotFound(name.to_string()))
    }

    /// Opens the configured device and starts its output stream.
    pub fn open(config: &config::Audio) -> Result<Device, AudioError> {
        let span = span!(Level::INFO, "open audio (cpal)");
        let _enter = span.enter();

        let device = Self::find(config.device())?;
        let name = device
            .name()
            .unwrap_or_else(|_| config.device().to_string());
        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::Query(e.to_string()))?;
        let channels = default_config.channels();
        let sample_format = default_config.sample_format();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(config.sample_rate()),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size() as u32),
        };

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let active = Arc::new(AtomicUsize::new(0));
        let shutdown = CancelHandle::new();
        let pool = VoicePool::new(config.max_voices(), channels);

        let output_thread = {
            let active = active.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("drumtrig-output".to_string())
                .spawn(move || {
                    let stream = match build_stream(
                        &device,
                        sample_format,
                        &stream_config,
                        pool,
                        voice_rx,
                        active,
                    ) {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    if let Err(e) = stream.play() {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));

                    // Keep the stream alive until shutdown.
                    shutdown.wait();
                    drop(stream);
                    info!("Output stream stopped");
                })
                .map_err(AudioError::Spawn)?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = output_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = output_thread.join();
                return Err(AudioError::Disconnected);
            }
        }

        info!(
            device = name,
            channels,
            sample_rate = config.sample_rate(),
            buffer_size = config.buffer_size(),
            max_voices = config.max_voices(),
            format = ?sample_format,
            "Output stream started"
        );

        Ok(Device {
            name,
            channels,
            sample_rate: config.sample_rate(),
            voice_tx,
            active,
            shutdown,
            output_thread: Mutex::new(Some(output_thread)),
        })
    }
}

/// Builds the output stream for the device's native sample format.
fn build_stream(
    device: &cpal::Device,
    sample_format: cpal::SampleFormat,
    config: &cpal::StreamConfig,
    pool: VoicePool,
    voice_rx: Receiver<Voice>,
    active: Arc<AtomicUsize>,
) -> Result<cpal::Stream, AudioError> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, pool, voice_rx, active),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, pool, voice_rx, active),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, pool, voice_rx, active),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, pool, voice_rx, active),
        other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
    }
}

/// Audio callback: pick up new voices, mix, convert to the device format.
fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut pool: VoicePool,
    voice_rx: Receiver<Voice>,
    active: Arc<AtomicUsize>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(priority, rt_audio, &mut priority_set);

            while let Ok(voice) = voice_rx.try_recv() {
                pool.start(voice);
            }

            // Only grows on the first callback or if the host changes period size.
            if scratch.len() != data.len() {
                scratch.resize(data.len(), 0.0);
            }
            pool.mix(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }

            active.store(pool.active(), Ordering::Relaxed);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl super::Device for Device {
    fn play(&self, slot: &SampleSlot) -> Result<(), AudioError> {
        if self.shutdown.is_cancelled() {
            return Err(AudioError::Disconnected);
        }
        self.voice_tx
            .send(Voice::new(slot))
            .map_err(|_| AudioError::Disconnected)
    }

    fn active_voices(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        self.shutdown.cancel();
        if let Some(output_thread) = self.output_thread.lock().take() {
            if output_thread.join().is_err() {
                error!(device = self.name, "Output thread panicked");
            }
            info!(device = self.name, "Audio output released");
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        super::Device::stop(self);
    }
}

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

//! Sample loading and caching for triggered samples.
//!
//! Samples are decoded entirely into memory at startup so a trigger never touches the disk.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use crate::error::StartupError;

/// A loaded sample that can be played back.
/// The sample data is stored in an Arc so every voice shares one copy.
#[derive(Clone)]
pub struct LoadedSample {
    /// The sample data as interleaved f32 samples.
    data: Arc<Vec<f32>>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl LoadedSample {
    /// Wraps already decoded interleaved samples.
    pub fn from_interleaved(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        LoadedSample {
            data: Arc::new(data),
            channel_count,
            sample_rate,
        }
    }

    /// Returns the shared interleaved data.
    pub fn data(&self) -> &Arc<Vec<f32>> {
        &self.data
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Manages loading and caching of sample data.
pub struct SampleLoader {
    /// Cache of loaded samples by file path.
    cache: HashMap<PathBuf, LoadedSample>,
    /// Target sample rate (matches the audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a sample from a file into memory, resampled to the target rate.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<LoadedSample, StartupError> {
        if let Some(sample) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        let (mut samples, channel_count, file_rate) = decode(path)?;
        if file_rate != self.target_sample_rate {
            debug!(
                path = ?path,
                from = file_rate,
                to = self.target_sample_rate,
                "Resampling"
            );
            samples = resample_linear(&samples, channel_count, file_rate, self.target_sample_rate);
        }

        let loaded = LoadedSample::from_interleaved(samples, channel_count, self.target_sample_rate);

        info!(
            path = ?path,
            channels = channel_count,
            file_rate,
            duration_ms = loaded.duration().as_millis(),
            memory_kb = loaded.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes a whole file into interleaved f32 samples.
/// Returns the samples, the channel count and the file's sample rate.
fn decode(path: &Path) -> Result<(Vec<f32>, u16, u32), StartupError> {
    let undecodable = |reason: String| StartupError::UndecodableSample {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => StartupError::MissingSample {
            path: path.to_path_buf(),
        },
        _ => StartupError::UnreadableSample {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let detected = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| undecodable(e.to_string()))?;
    let mut format_reader = detected.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| undecodable("no audio track found".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| undecodable("sample rate not specified".to_string()))?;
    let mut channel_count = params.channels.map(|c| c.count() as u16).unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| undecodable(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(undecodable(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count() as u16;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path, error = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(undecodable(e.to_string())),
        }
    }

    if channel_count == 0 {
        return Err(undecodable("unable to determine channel count".to_string()));
    }

    Ok((samples, channel_count, sample_rate))
}

/// Converts interleaved samples between rates by interpolating between neighbouring
/// frames. Good enough for one-shots.
fn resample_linear(samples: &[f32], channel_count: u16, from: u32, to: u32) -> Vec<f32> {
    let channels = channel_count.max(1) as usize;
    let frames: Vec<&[f32]> = samples.chunks_exact(channels).collect();
    let Some(last) = frames.last() else {
        return Vec::new();
    };

    let step = from as f64 / to as f64;
    let out_frames = (frames.len() as f64 / step).ceil() as usize;
    let mut resampled = Vec::with_capacity(out_frames * channels);

    for n in 0..out_frames {
        let position = n as f64 * step;
        let index = position as usize;
        let weight = (position - index as f64) as f32;
        let current = frames.get(index).unwrap_or(last);
        let next = frames.get(index + 1).unwrap_or(current);
        resampled.extend(
            current
                .iter()
                .zip(next.iter())
                .map(|(a, b)| a + (b - a) * weight),
        );
    }

    resampled
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_resample_up_interpolates() {
        let resampled = resample_linear(&[0.0, 1.0], 1, 22050, 44100);

        assert_eq!(resampled.len(), 4);
        assert_eq!(resampled[0], 0.0);
        assert!((resampled[1] - 0.5).abs() < 1e-6);
        assert_eq!(resampled[2], 1.0);
        assert_eq!(resampled[3], 1.0);
    }

    #[test]
    fn test_resample_keeps_channels_apart() {
        let interleaved = vec![0.5, -0.5, 0.5, -0.5, 0.5, -0.5];

        let resampled = resample_linear(&interleaved, 2, 48000, 44100);

        assert_eq!(resampled.len() % 2, 0);
        assert!(resampled.chunks_exact(2).all(|f| f[0] == 0.5 && f[1] == -0.5));
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample_linear(&[], 1, 22050, 44100).is_empty());
    }

    #[test]
    fn test_load_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snare.wav");
        write_wav(&path, &[0, 8192, 16384, -16384], 1, 44100);

        let mut loader = SampleLoader::new(44100);
        let sample = loader.load(&path).unwrap();

        assert_eq!(sample.channel_count(), 1);
        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.frames(), 4);
        assert!((sample.data()[1] - 0.25).abs() < 1e-3);
        assert!((sample.data()[3] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_load_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_wav(&path, &vec![1000; 2205 * 2], 2, 22050);

        let mut loader = SampleLoader::new(44100);
        let sample = loader.load(&path).unwrap();

        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.frames(), 4410);
    }

    #[test]
    fn test_load_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ride.wav");
        write_wav(&path, &[1, 2, 3, 4], 1, 44100);

        let mut loader = SampleLoader::new(44100);
        let first = loader.load(&path).unwrap();
        let second = loader.load(&path).unwrap();

        assert!(Arc::ptr_eq(first.data(), second.data()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.wav");

        let mut loader = SampleLoader::new(44100);
        match loader.load(&path) {
            Err(StartupError::MissingSample { path: missing }) => assert_eq!(missing, path),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_garbage_file_is_undecodable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        let mut loader = SampleLoader::new(44100);
        assert!(matches!(
            loader.load(&path),
            Err(StartupError::UndecodableSample { .. })
        ));
    }
}

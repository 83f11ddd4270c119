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

//! Polyphonic voice mixing that's independent of any audio backend.
//!
//! Every trigger becomes its own [`Voice`]. Voices never replace or wait for each
//! other; the pool only steals the oldest voice once it is full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::samples::SampleSlot;

/// Global voice ID counter. IDs increase with start order.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// One playing instance of a slot's sample.
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The slot index that triggered this voice.
    slot: usize,
    /// Interleaved sample data shared with the slot.
    data: Arc<Vec<f32>>,
    /// Number of interleaved channels in data.
    channels: usize,
    /// Linear gain applied while mixing.
    gain: f32,
    /// Next frame to play.
    position: usize,
}

impl Voice {
    /// Creates a new voice positioned at the start of the slot's sample.
    pub fn new(slot: &SampleSlot) -> Voice {
        let sample = slot.sample();
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed),
            slot: slot.index(),
            data: sample.data().clone(),
            channels: sample.channel_count().max(1) as usize,
            gain: slot.volume(),
            position: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    fn total_frames(&self) -> usize {
        self.data.len() / self.channels
    }

    fn is_finished(&self) -> bool {
        self.position >= self.total_frames()
    }

    /// Adds this voice into the interleaved output. Mono voices are sent to every output
    /// channel, anything else maps channel for channel. Returns false once the voice is done.
    fn mix_into(&mut self, output: &mut [f32], output_channels: usize) -> bool {
        let start = self.position * self.channels;
        let source = self.data[start..].chunks_exact(self.channels);
        let mut mixed = 0;

        for (out_frame, in_frame) in output.chunks_exact_mut(output_channels).zip(source) {
            if self.channels == 1 {
                let value = in_frame[0] * self.gain;
                for out in out_frame.iter_mut() {
                    *out += value;
                }
            } else {
                for (out, value) in out_frame.iter_mut().zip(in_frame) {
                    *out += value * self.gain;
                }
            }
            mixed += 1;
        }

        self.position += mixed;
        !self.is_finished()
    }
}

/// A fixed size pool of concurrently sounding voices.
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
    output_channels: usize,
}

impl VoicePool {
    /// Creates a new pool. The backing storage is allocated up front so starting a voice
    /// from the audio callback never allocates.
    pub fn new(max_voices: usize, output_channels: u16) -> VoicePool {
        let max_voices = max_voices.max(1);
        VoicePool {
            voices: Vec::with_capacity(max_voices),
            max_voices,
            output_channels: output_channels.max(1) as usize,
        }
    }

    /// Starts a voice alongside whatever is already playing. If the pool is full the
    /// oldest voice is stolen; its ID is returned.
    pub fn start(&mut self, voice: Voice) -> Option<u64> {
        let mut stolen = None;
        if self.voices.len() >= self.max_voices {
            if let Some((oldest, _)) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, voice)| voice.id)
            {
                stolen = Some(self.voices.swap_remove(oldest).id);
            }
        }
        self.voices.push(voice);
        stolen
    }

    /// Mixes every active voice into the interleaved output buffer, overwriting it.
    /// Finished voices are released.
    pub fn mix(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        let output_channels = self.output_channels;
        self.voices
            .retain_mut(|voice| voice.mix_into(output, output_channels));

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Returns the number of voices still sounding.
    pub fn active(&self) -> usize {
        self.voices.len()
    }

    /// Returns the slot indices of the sounding voices, oldest first.
    pub fn active_slots(&self) -> Vec<usize> {
        let mut voices: Vec<&Voice> = self.voices.iter().collect();
        voices.sort_by_key(|voice| voice.id);
        voices.iter().map(|voice| voice.slot).collect()
    }

    /// Silences every voice.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn output_channels(&self) -> u16 {
        self.output_channels as u16
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("active_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}

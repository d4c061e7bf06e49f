//! Real-time additive oscillator bank
//!
//! [`OscillatorBank::render`] is what runs inside the audio callback. It sums
//! one sine per voice into a mono signal, copies that signal to every output
//! channel and advances each voice's phase by the number of frames written.
//!
//! # Safety ceiling
//!
//! After each voice is accumulated the running sum is checked. If its
//! magnitude exceeds 1.0 anywhere in the block, nothing from that block is
//! played: the output is silenced, the bank latches into a halted state and
//! the shared halt flag is raised for the controlling thread. There is no
//! limiter or clipping path.
//!
//! # Real-time constraints
//!
//! `render` never allocates, locks or logs. The mono accumulator is
//! allocated once, at construction, and device requests larger than it are
//! rendered in pieces.

use crate::voice::{SonificationVoice, VoiceBank};
use cpal::{FromSample, SizedSample};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Largest magnitude the summed signal may reach
pub const AMPLITUDE_CEILING: f64 = 1.0;

/// Outcome of one render call
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderStatus {
    /// `frames` frames were written
    Rendered { frames: usize },
    /// Output was silenced because the signal reached `magnitude` at
    /// `frame` (within the block that tripped the ceiling)
    Halted { frame: usize, magnitude: f64 },
}

impl RenderStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, RenderStatus::Halted { .. })
    }
}

pub struct OscillatorBank {
    bank: VoiceBank,
    sample_rate: f64,
    scratch: Vec<f64>,
    halted: Option<RenderStatus>,
    halt_flag: Arc<AtomicBool>,
}

impl OscillatorBank {
    /// `max_block` sizes the mono accumulator; it should match the stream's
    /// block size.
    pub fn new(bank: VoiceBank, sample_rate: u32, max_block: usize) -> Self {
        Self {
            bank,
            sample_rate: f64::from(sample_rate),
            scratch: vec![0.0; max_block.max(1)],
            halted: None,
            halt_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised by the callback when the ceiling trips
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.halt_flag)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn voices(&self) -> &[SonificationVoice] {
        self.bank.voices()
    }

    /// Fill an interleaved `output` buffer with `channels` channels.
    pub fn render<T>(&mut self, output: &mut [T], channels: usize) -> RenderStatus
    where
        T: SizedSample + FromSample<f64>,
    {
        if let Some(status) = self.halted {
            silence(output);
            return status;
        }
        if channels == 0 {
            return RenderStatus::Rendered { frames: 0 };
        }

        let total_frames = output.len() / channels;
        let chunk_frames = self.scratch.len();
        let mut written = 0;
        let mut tripped = None;

        for chunk in output[..total_frames * channels].chunks_mut(chunk_frames * channels) {
            let frames = chunk.len() / channels;
            let mono = &mut self.scratch[..frames];

            if self.bank.is_empty() {
                fill_ramp(mono, written, self.sample_rate);
            } else if let Some((frame, magnitude)) =
                accumulate(self.bank.voices(), mono, written, self.sample_rate)
            {
                tripped = Some(RenderStatus::Halted {
                    frame: written + frame,
                    magnitude,
                });
                break;
            }

            for (frame, &value) in chunk.chunks_mut(channels).zip(mono.iter()) {
                for sample in frame.iter_mut() {
                    *sample = T::from_sample(value);
                }
            }
            written += frames;
        }

        if let Some(status) = tripped {
            self.halted = Some(status);
            self.halt_flag.store(true, Ordering::Release);
            silence(output);
            return status;
        }

        // Only a block that played in full moves the phases on
        for voice in self.bank.voices_mut() {
            voice.phase_index += written as u64;
        }

        // Trailing partial frame, if the device handed us one
        silence(&mut output[total_frames * channels..]);

        RenderStatus::Rendered { frames: written }
    }

    /// Render `frames` mono samples into a fresh buffer (for offline checks)
    pub fn render_mono(&mut self, frames: usize) -> (Vec<f32>, RenderStatus) {
        let mut out = vec![0.0f32; frames];
        let status = self.render(&mut out, 1);
        (out, status)
    }
}

/// Sum every voice into `mono`, starting `offset` frames past each voice's
/// phase, checking the ceiling after each voice.
/// Returns the first offending frame and its magnitude.
fn accumulate(
    voices: &[SonificationVoice],
    mono: &mut [f64],
    offset: usize,
    sample_rate: f64,
) -> Option<(usize, f64)> {
    mono.fill(0.0);
    for voice in voices {
        let step = TAU * voice.frequency / sample_rate;
        let start = (voice.phase_index + offset as u64) as f64;
        for (i, acc) in mono.iter_mut().enumerate() {
            *acc += voice.amplitude * (step * (start + i as f64)).sin();
        }
        if let Some(hit) = mono
            .iter()
            .enumerate()
            .find(|(_, v)| v.abs() > AMPLITUDE_CEILING)
        {
            return Some((hit.0, hit.1.abs()));
        }
    }
    None
}

/// Degenerate output for an empty bank: `offset + i` over the sample rate
fn fill_ramp(mono: &mut [f64], offset: usize, sample_rate: f64) {
    for (i, v) in mono.iter_mut().enumerate() {
        *v = (offset + i) as f64 / sample_rate;
    }
}

fn silence<T>(output: &mut [T])
where
    T: SizedSample + FromSample<f64>,
{
    for sample in output.iter_mut() {
        *sample = T::from_sample(0.0f64);
    }
}

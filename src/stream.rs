//! Real-time audio output using cpal
//!
//! A [`PlaybackStream`] owns one cpal output stream and, through its
//! callback closure, the [`OscillatorBank`] for one material. Dropping the
//! stream closes the device; nothing outlives it.

use crate::config::{AudioSettings, MAX_BLOCK_SIZE};
use crate::error::{Result, SonifyError};
use crate::oscillator_bank::OscillatorBank;
use crate::voice::VoiceBank;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Output is always stereo
pub const OUTPUT_CHANNELS: u16 = 2;

/// How often the controlling thread checks for a halt while playing
const HALT_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played for the full duration
    Completed,
    /// Stopped early by the amplitude ceiling
    Halted,
}

pub struct PlaybackStream {
    stream: cpal::Stream,
    halt_flag: Arc<AtomicBool>,
    device_name: String,
    config: StreamConfig,
}

impl PlaybackStream {
    /// Open the default output device and build a paused stream playing `bank`
    pub fn open(settings: &AudioSettings, bank: VoiceBank) -> Result<Self> {
        let host = cpal::default_host();
        debug!("Audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or_else(|| SonifyError::Audio("No audio output device found".to_string()))?;
        let device_name = device.name()?;
        info!("Audio device: {}", device_name);

        let (sample_format, buffer_range) = stereo_format(&device, settings.sample_rate)?;
        let block = fixed_buffer_size(&buffer_range, settings.block_size);
        if block != settings.block_size {
            warn!(
                "Device cannot use {} frame blocks, using {}",
                settings.block_size, block
            );
        }

        let config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: SampleRate(settings.sample_rate),
            buffer_size: BufferSize::Fixed(block),
        };
        info!("Audio config: {:?} ({:?})", config, sample_format);

        let oscillators = OscillatorBank::new(bank, settings.sample_rate, block as usize);
        let halt_flag = oscillators.halt_flag();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, oscillators),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, oscillators),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, oscillators),
            other => {
                return Err(SonifyError::Audio(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }?;

        Ok(Self {
            stream,
            halt_flag,
            device_name,
            config,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start the stream, wait `duration` (or until the ceiling trips), stop it
    pub fn play_for(&self, duration: Duration) -> Result<PlaybackOutcome> {
        self.stream.play()?;
        info!(
            "Playing for {:.1}s at {} Hz",
            duration.as_secs_f64(),
            self.config.sample_rate.0
        );

        let deadline = Instant::now() + duration;
        let outcome = loop {
            if self.halt_flag.load(Ordering::Acquire) {
                break PlaybackOutcome::Halted;
            }
            let now = Instant::now();
            if now >= deadline {
                break PlaybackOutcome::Completed;
            }
            std::thread::sleep(HALT_POLL.min(deadline - now));
        };

        self.stream.pause()?;
        if outcome == PlaybackOutcome::Halted {
            warn!("Signal exceeded the amplitude ceiling, output halted");
        }
        Ok(outcome)
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        debug!("Closing audio stream on {}", self.device_name);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut oscillators: OscillatorBank,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f64>,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            oscillators.render(data, channels);
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Pick a stereo output format at `sample_rate`, preferring f32
fn stereo_format(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<(SampleFormat, SupportedBufferSize)> {
    let rate = SampleRate(sample_rate);
    let mut candidates: Vec<_> = device
        .supported_output_configs()?
        .filter(|c| c.channels() == OUTPUT_CHANNELS)
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .collect();
    candidates.sort_by_key(|c| format_rank(c.sample_format()));

    candidates
        .first()
        .map(|c| (c.sample_format(), c.buffer_size().clone()))
        .ok_or_else(|| {
            SonifyError::Audio(format!(
                "Output device has no stereo configuration at {} Hz",
                sample_rate
            ))
        })
}

fn format_rank(format: SampleFormat) -> u8 {
    match format {
        SampleFormat::F32 => 0,
        SampleFormat::I16 => 1,
        SampleFormat::U16 => 2,
        _ => 3,
    }
}

/// `requested` clamped into what the device reports it can do
pub fn fixed_buffer_size(supported: &SupportedBufferSize, requested: u32) -> u32 {
    match supported {
        SupportedBufferSize::Range { min, max } => requested.clamp(*min, (*max).max(*min)),
        SupportedBufferSize::Unknown => requested.min(MAX_BLOCK_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_clamped_to_device_range() {
        let range = SupportedBufferSize::Range { min: 64, max: 8192 };
        assert_eq!(fixed_buffer_size(&range, 44100), 8192);
        assert_eq!(fixed_buffer_size(&range, 16), 64);
        assert_eq!(fixed_buffer_size(&range, 1024), 1024);
    }

    #[test]
    fn test_unknown_buffer_range_keeps_request() {
        assert_eq!(fixed_buffer_size(&SupportedBufferSize::Unknown, 44100), 44100);
        assert_eq!(
            fixed_buffer_size(&SupportedBufferSize::Unknown, u32::MAX),
            MAX_BLOCK_SIZE
        );
    }

    #[test]
    fn test_prefers_float_output() {
        assert!(format_rank(SampleFormat::F32) < format_rank(SampleFormat::I16));
        assert!(format_rank(SampleFormat::I16) < format_rank(SampleFormat::U16));
    }
}

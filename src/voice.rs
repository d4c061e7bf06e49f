//! Voice table for the oscillator bank

use crate::error::{Result, SonifyError};
use serde::Serialize;

/// Rounding slack allowed on the amplitude sum at construction
pub const AMPLITUDE_SUM_TOLERANCE: f64 = 1e-9;

/// One sine partial: an audible frequency, its amplitude, and how many
/// samples of it have been rendered so far.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SonificationVoice {
    /// Hz
    pub frequency: f64,
    /// 0.0 - 1.0
    pub amplitude: f64,
    /// Samples rendered since the stream started
    pub phase_index: u64,
}

impl SonificationVoice {
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
            phase_index: 0,
        }
    }
}

/// The set of voices for one material, with amplitudes summing to at most 1
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VoiceBank {
    voices: Vec<SonificationVoice>,
}

impl VoiceBank {
    /// Build from parallel frequency / amplitude arrays.
    ///
    /// Fails if the lengths differ, an amplitude is negative or non-finite,
    /// or the amplitudes sum above 1.
    pub fn new(frequencies: &[f64], amplitudes: &[f64]) -> Result<Self> {
        if frequencies.len() != amplitudes.len() {
            return Err(SonifyError::InvalidConfig(format!(
                "{} frequencies but {} amplitudes",
                frequencies.len(),
                amplitudes.len()
            )));
        }
        if let Some(bad) = amplitudes.iter().find(|a| !a.is_finite() || **a < 0.0) {
            return Err(SonifyError::InvalidConfig(format!(
                "voice amplitude {} is not a non-negative number",
                bad
            )));
        }
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(SonifyError::InvalidConfig(format!(
                "voice frequency {} Hz is not positive",
                bad
            )));
        }
        let total: f64 = amplitudes.iter().sum();
        if total > 1.0 + AMPLITUDE_SUM_TOLERANCE {
            return Err(SonifyError::AmplitudeCeiling(total));
        }

        Ok(Self {
            voices: frequencies
                .iter()
                .zip(amplitudes)
                .map(|(&f, &a)| SonificationVoice::new(f, a))
                .collect(),
        })
    }

    /// Skips every check; lets tests drive the callback past its ceiling
    #[cfg(test)]
    pub(crate) fn from_voices_unchecked(voices: Vec<SonificationVoice>) -> Self {
        Self { voices }
    }

    pub fn voices(&self) -> &[SonificationVoice] {
        &self.voices
    }

    pub(crate) fn voices_mut(&mut self) -> &mut [SonificationVoice] {
        &mut self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn amplitude_sum(&self) -> f64 {
        self.voices.iter().map(|v| v.amplitude).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_voices_at_phase_zero() {
        let bank = VoiceBank::new(&[220.0, 440.0], &[0.5, 0.5]).unwrap();
        assert_eq!(bank.len(), 2);
        assert!(bank.voices().iter().all(|v| v.phase_index == 0));
        assert!((bank.amplitude_sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_amplitude_sum_above_one() {
        let result = VoiceBank::new(&[220.0, 440.0], &[0.6, 0.6]);
        assert!(matches!(result, Err(SonifyError::AmplitudeCeiling(_))));
    }

    #[test]
    fn test_tolerates_rounding() {
        let third = 1.0 / 3.0;
        assert!(VoiceBank::new(&[100.0, 200.0, 300.0], &[third, third, third]).is_ok());
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        assert!(VoiceBank::new(&[220.0], &[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_rejects_negative_amplitude() {
        assert!(VoiceBank::new(&[220.0, 330.0], &[-0.5, 0.5]).is_err());
    }

    #[test]
    fn test_empty_bank() {
        let bank = VoiceBank::new(&[], &[]).unwrap();
        assert!(bank.is_empty());
    }
}

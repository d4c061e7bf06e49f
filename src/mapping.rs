//! Linear mapping from phonon frequencies onto an audible band

use crate::config::MappingSettings;
use crate::units::REFERENCE_TONE_HZ;
use tracing::{debug, info};

/// Linear rescale of `[min_in, max_in]` (THz) onto `[min_audible, max_audible]` (Hz)
#[derive(Clone, Debug, PartialEq)]
pub struct RangeMapper {
    pub min_audible: f64,
    pub max_audible: f64,
    pub min_phonon: Option<f64>,
    pub max_phonon: Option<f64>,
}

impl RangeMapper {
    pub fn new(min_audible: f64, max_audible: f64) -> Self {
        Self {
            min_audible,
            max_audible,
            min_phonon: None,
            max_phonon: None,
        }
    }

    pub fn from_settings(settings: &MappingSettings) -> Self {
        Self {
            min_audible: settings.min_audible,
            max_audible: settings.max_audible,
            min_phonon: settings.min_phonon,
            max_phonon: settings.max_phonon,
        }
    }

    pub fn with_phonon_bounds(mut self, min_phonon: Option<f64>, max_phonon: Option<f64>) -> Self {
        self.min_phonon = min_phonon;
        self.max_phonon = max_phonon;
        self
    }

    /// Input span for `frequencies`: the data range, widened (never narrowed)
    /// by any configured bounds.
    pub fn input_range(&self, frequencies: &[f64]) -> Option<(f64, f64)> {
        let data_min = frequencies.iter().copied().reduce(f64::min)?;
        let data_max = frequencies.iter().copied().reduce(f64::max)?;
        let lo = self.min_phonon.map_or(data_min, |m| m.min(data_min));
        let hi = self.max_phonon.map_or(data_max, |m| m.max(data_max));
        Some((lo, hi))
    }

    /// Map phonon frequencies (THz) to audible frequencies (Hz)
    pub fn map(&self, frequencies: &[f64]) -> Vec<f64> {
        if frequencies.len() == 1 {
            info!(
                "Only one phonon frequency, mapping to {} Hz",
                REFERENCE_TONE_HZ
            );
            return vec![REFERENCE_TONE_HZ];
        }
        let Some((lo, hi)) = self.input_range(frequencies) else {
            return Vec::new();
        };
        let span = hi - lo;
        if span <= 0.0 {
            info!(
                "Phonon frequencies have zero spread, mapping all to {} Hz",
                REFERENCE_TONE_HZ
            );
            return vec![REFERENCE_TONE_HZ; frequencies.len()];
        }

        let scale = (self.max_audible - self.min_audible) / span;
        debug!(
            "Mapping [{:.4}, {:.4}] THz onto [{}, {}] Hz",
            lo, hi, self.min_audible, self.max_audible
        );
        frequencies
            .iter()
            .map(|&f| {
                let hz = scale * (f - lo) + self.min_audible;
                hz.clamp(self.min_audible, self.max_audible)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_map_example() {
        let mapper = RangeMapper::new(20.0, 800.0);
        let mapped = mapper.map(&[1.0, 2.0, 3.0, 4.0]);
        let expected = [20.0, 280.0, 540.0, 800.0];
        for (got, want) in mapped.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_single_frequency_is_reference_tone() {
        let mapper = RangeMapper::new(20.0, 8000.0).with_phonon_bounds(Some(0.0), Some(16.0));
        assert_eq!(mapper.map(&[7.3]), vec![440.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(RangeMapper::new(20.0, 800.0).map(&[]).is_empty());
    }

    #[test]
    fn test_identical_frequencies_do_not_divide_by_zero() {
        let mapped = RangeMapper::new(20.0, 800.0).map(&[2.0, 2.0, 2.0]);
        assert_eq!(mapped, vec![440.0; 3]);
    }

    #[test]
    fn test_overrides_widen_range() {
        let mapper = RangeMapper::new(20.0, 820.0).with_phonon_bounds(Some(0.0), Some(8.0));
        let mapped = mapper.map(&[2.0, 4.0]);
        assert!((mapped[0] - 220.0).abs() < 1e-9);
        assert!((mapped[1] - 420.0).abs() < 1e-9);
    }

    #[test]
    fn test_overrides_never_shrink_range() {
        // Bounds inside the data are ignored in favour of the data's span
        let mapper = RangeMapper::new(20.0, 800.0).with_phonon_bounds(Some(2.0), Some(3.0));
        assert_eq!(mapper.input_range(&[1.0, 4.0]), Some((1.0, 4.0)));
        let mapped = mapper.map(&[1.0, 4.0]);
        assert!((mapped[0] - 20.0).abs() < 1e-9);
        assert!((mapped[1] - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_outputs_within_audible_band() {
        let mapper = RangeMapper::new(55.0, 4000.0).with_phonon_bounds(None, Some(20.0));
        let input: Vec<f64> = (1..200).map(|i| i as f64 * 0.07).collect();
        for hz in mapper.map(&input) {
            assert!((55.0..=4000.0).contains(&hz));
        }
    }
}

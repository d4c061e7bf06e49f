//! Phonon modes and the filters applied before mapping
//!
//! Frequencies here are always in THz, as reported by the phonon source.

use crate::units::bose_einstein_occupation;
use serde::{Deserialize, Serialize};

/// A retained phonon mode and the weight it will sound with
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhononMode {
    /// THz
    pub frequency: f64,
    pub weight: f64,
}

/// Phonon density of states sampled on its own frequency grid
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityOfStates {
    /// THz, ascending
    pub frequencies: Vec<f64>,
    pub densities: Vec<f64>,
}

impl DensityOfStates {
    pub fn new(frequencies: Vec<f64>, densities: Vec<f64>) -> Self {
        let mut points: Vec<(f64, f64)> = frequencies.into_iter().zip(densities).collect();
        points.retain(|(f, _)| f.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (frequencies, densities) = points.into_iter().unzip();
        Self {
            frequencies,
            densities,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Linearly interpolated density at `frequency`; 0 outside the grid.
    pub fn density_at(&self, frequency: f64) -> f64 {
        let grid = &self.frequencies;
        let (Some(&first), Some(&last)) = (grid.first(), grid.last()) else {
            return 0.0;
        };
        if frequency < first || frequency > last {
            return 0.0;
        }
        // First grid point >= frequency
        let hi = grid.partition_point(|&g| g < frequency);
        if hi == 0 || grid[hi] == frequency {
            return self.densities[hi];
        }
        let lo = hi - 1;
        let span = grid[hi] - grid[lo];
        if span <= 0.0 {
            return self.densities[hi];
        }
        let frac = (frequency - grid[lo]) / span;
        self.densities[lo] * (1.0 - frac) + self.densities[hi] * frac
    }

    /// Densities aligned with `frequencies`
    pub fn weights_at(&self, frequencies: &[f64]) -> Vec<f64> {
        frequencies.iter().map(|&f| self.density_at(f)).collect()
    }
}

/// Drop imaginary (reported as negative), zero and non-finite frequencies
pub fn filter_imaginary(frequencies: &[f64]) -> Vec<f64> {
    frequencies
        .iter()
        .copied()
        .filter(|f| f.is_finite() && *f > 0.0)
        .collect()
}

/// Sort ascending and collapse exact duplicates
///
/// Degenerate branches share a frequency; each distinct value gets one voice.
pub fn unique_frequencies(mut frequencies: Vec<f64>) -> Vec<f64> {
    frequencies.sort_by(|a, b| a.total_cmp(b));
    frequencies.dedup();
    frequencies
}

/// Modes with a mean Bose-Einstein occupation of at least one at `temperature`
pub fn thermally_occupied(frequencies: &[f64], temperature: f64) -> Vec<f64> {
    frequencies
        .iter()
        .copied()
        .filter(|&f| bose_einstein_occupation(f, temperature) >= 1.0)
        .collect()
}

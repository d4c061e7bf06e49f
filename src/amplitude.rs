//! Per-voice amplitudes from density of states and thermal occupation
//!
//! The result always sums to 1 (or is empty), which is what keeps the
//! oscillator bank under its safety ceiling before the stream starts.

use crate::error::{Result, SonifyError};
use crate::units::bose_einstein_occupation;
use tracing::{debug, warn};

/// Derive one amplitude per frequency.
///
/// * `frequencies_thz` - retained phonon frequencies
/// * `dos` - density of states aligned with `frequencies_thz`, or `None` for
///   uniform weights
/// * `temperature` - if set, reweight by Bose-Einstein occupation
pub fn derive_amplitudes(
    frequencies_thz: &[f64],
    dos: Option<&[f64]>,
    temperature: Option<f64>,
) -> Result<Vec<f64>> {
    let mut weights = match dos {
        Some(dos) => {
            if dos.len() != frequencies_thz.len() {
                return Err(SonifyError::DosLengthMismatch {
                    frequencies: frequencies_thz.len(),
                    weights: dos.len(),
                });
            }
            normalize_by_max(dos.iter().map(|&w| sanitize(w)).collect())
        }
        None => vec![1.0; frequencies_thz.len()],
    };

    if let Some(t) = temperature {
        let occupations = normalize_by_max(
            frequencies_thz
                .iter()
                .map(|&f| bose_einstein_occupation(f, t))
                .collect(),
        );
        for (w, n) in weights.iter_mut().zip(occupations) {
            *w *= n;
        }
        debug!("Applied Bose-Einstein weighting at {} K", t);
    }

    Ok(normalize_sum(weights))
}

fn sanitize(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

/// Scale so the largest entry is 1; all-zero input is returned unchanged.
fn normalize_by_max(mut values: Vec<f64>) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
    values
}

/// Scale so the entries sum to 1.
fn normalize_sum(mut weights: Vec<f64>) -> Vec<f64> {
    if weights.is_empty() {
        return weights;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        warn!("All mode weights vanished, falling back to uniform amplitudes");
        let uniform = 1.0 / weights.len() as f64;
        weights.iter_mut().for_each(|w| *w = uniform);
    } else {
        for w in weights.iter_mut() {
            *w /= total;
        }
    }
    clamp_sum_to_one(&mut weights);
    weights
}

/// Division can leave the sum a few ulps above 1; shrink until it is not.
fn clamp_sum_to_one(weights: &mut [f64]) {
    let shrink = 1.0 - weights.len() as f64 * f64::EPSILON;
    while weights.iter().sum::<f64>() > 1.0 {
        for w in weights.iter_mut() {
            *w *= shrink;
        }
    }
}

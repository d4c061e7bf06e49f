//! From a raw phonon spectrum to a playable voice table
//!
//! 1. drop imaginary modes and collapse duplicates
//! 2. optionally keep only thermally occupied modes
//! 3. sample the density of states at the retained modes
//! 4. map onto the audible band
//! 5. derive amplitudes (sum = 1)
//! 6. build the [`VoiceBank`]
//!
//! [`prepare_each`] runs that over a sequence of materials, skipping the
//! ones that cannot be prepared.

use crate::amplitude::derive_amplitudes;
use crate::config::SonifyConfig;
use crate::error::{Result, SonifyError};
use crate::mapping::RangeMapper;
use crate::modes::{filter_imaginary, thermally_occupied, unique_frequencies, PhononMode};
use crate::source::PhononSpectrum;
use crate::voice::VoiceBank;
use tracing::{debug, error, info};

/// Voices ready for playback along with the modes they came from
#[derive(Clone, Debug)]
pub struct PreparedVoices {
    pub material: String,
    /// Retained modes (THz) with their final amplitudes
    pub modes: Vec<PhononMode>,
    /// Audible frequency (Hz) per mode, same order as `modes`
    pub audible: Vec<f64>,
    pub bank: VoiceBank,
}

pub fn prepare_voices(spectrum: &PhononSpectrum, config: &SonifyConfig) -> Result<PreparedVoices> {
    let material = spectrum.material.as_str();

    let mut frequencies = unique_frequencies(filter_imaginary(&spectrum.frequencies));
    let dropped = spectrum.frequencies.len() - frequencies.len();
    if dropped > 0 {
        debug!(
            "{}: dropped {} imaginary or duplicate modes",
            material, dropped
        );
    }

    let temperature = config.thermal.temperature;
    if config.thermal.thermal_cutoff {
        let t = temperature.ok_or_else(|| {
            SonifyError::InvalidConfig("thermal_cutoff requires a temperature".to_string())
        })?;
        let before = frequencies.len();
        frequencies = thermally_occupied(&frequencies, t);
        info!(
            "{}: {} of {} modes thermally occupied at {} K",
            material,
            frequencies.len(),
            before,
            t
        );
    }

    if frequencies.is_empty() {
        return Err(SonifyError::NoPhysicalModes(material.to_string()));
    }
    info!("{}: phonon frequencies (THz) {:?}", material, frequencies);

    let dos_weights = spectrum.dos.as_ref().map(|dos| dos.weights_at(&frequencies));
    let audible = RangeMapper::from_settings(&config.mapping).map(&frequencies);
    let amplitudes = derive_amplitudes(&frequencies, dos_weights.as_deref(), temperature)?;
    info!("{}: audible frequencies (Hz) {:?}", material, audible);

    let bank = VoiceBank::new(&audible, &amplitudes)?;
    let modes = frequencies
        .iter()
        .zip(&amplitudes)
        .map(|(&frequency, &weight)| PhononMode { frequency, weight })
        .collect();

    Ok(PreparedVoices {
        material: material.to_string(),
        modes,
        audible,
        bank,
    })
}

/// Which materials of a run were handled and which were skipped
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub handled: Vec<String>,
    pub skipped: Vec<String>,
}

/// Prepare each `(material id, fetched spectrum)` in order and hand the
/// voices to `handle`.
///
/// A material whose fetch or preparation fails (no phonon data, no real
/// modes, network trouble) is logged and skipped. An audio error returned
/// by `handle` ends the run.
pub fn prepare_each<I, F>(spectra: I, config: &SonifyConfig, mut handle: F) -> Result<RunSummary>
where
    I: IntoIterator<Item = (String, Result<PhononSpectrum>)>,
    F: FnMut(PreparedVoices) -> Result<()>,
{
    let mut summary = RunSummary::default();
    for (id, fetched) in spectra {
        let result = fetched
            .and_then(|spectrum| prepare_voices(&spectrum, config))
            .and_then(&mut handle);
        match result {
            Ok(()) => summary.handled.push(id),
            Err(e @ SonifyError::Audio(_)) => return Err(e),
            Err(e) => {
                error!("Skipping {}: {}", id, e);
                summary.skipped.push(id);
            }
        }
    }
    Ok(summary)
}

//! Physical constants and unit conversions
//!
//! Phonon sources report frequencies in THz. Energies are in joules and
//! temperatures in kelvin.

/// Planck constant (J·s, exact SI value)
pub const PLANCK: f64 = 6.626_070_15e-34;

/// Boltzmann constant (J/K, exact SI value)
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Hz per THz
pub const THZ_TO_HZ: f64 = 1e12;

/// Reference tone used when a material has a single mode
pub const REFERENCE_TONE_HZ: f64 = 440.0;

/// Convert a frequency in THz to Hz
#[inline]
pub fn thz_to_hz(frequency_thz: f64) -> f64 {
    frequency_thz * THZ_TO_HZ
}

/// Energy (J) of a quantum with the given frequency in THz
#[inline]
pub fn frequency_to_energy(frequency_thz: f64) -> f64 {
    PLANCK * thz_to_hz(frequency_thz)
}

/// Mean Bose-Einstein occupation `1 / (exp(E/kT) - 1)` of a mode at
/// `frequency_thz` and `temperature` kelvin.
///
/// Returns 0.0 when the exponent overflows (very cold or very stiff modes)
/// and for non-positive frequencies, which carry no thermal population.
pub fn bose_einstein_occupation(frequency_thz: f64, temperature: f64) -> f64 {
    if frequency_thz <= 0.0 || temperature <= 0.0 {
        return 0.0;
    }
    let x = frequency_to_energy(frequency_thz) / (BOLTZMANN * temperature);
    let denom = x.exp_m1();
    if denom.is_finite() && denom > 0.0 {
        1.0 / denom
    } else {
        0.0
    }
}

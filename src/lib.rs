//! # phonon-sonify - listen to a crystal's vibrational spectrum
//!
//! Phonon frequencies (THz) are filtered, mapped linearly onto an audible
//! band and played as a sum of sines, one per mode, through the default
//! audio output.
//!
//! ## Signal Flow
//!
//! 1. **Sources** ([`source`]) fetch raw frequencies from the Materials
//!    Project or read a phonopy `mesh.yaml`
//! 2. **Filtering** ([`modes`]) drops imaginary modes, optionally keeping
//!    only thermally occupied ones
//! 3. **Mapping** ([`mapping`]) rescales THz onto the audible band
//! 4. **Amplitudes** ([`amplitude`]) come from the density of states and
//!    Bose-Einstein occupation, normalized to sum to 1
//! 5. **Playback** ([`stream`]) runs the [`oscillator_bank`] inside the
//!    cpal callback, halting if the signal ever exceeds 1.0
//!
//! ## Example
//!
//! ```rust
//! use phonon_sonify::config::SonifyConfig;
//! use phonon_sonify::oscillator_bank::OscillatorBank;
//! use phonon_sonify::pipeline::prepare_voices;
//! use phonon_sonify::source::PhononSpectrum;
//!
//! let mut config = SonifyConfig::default();
//! config.mapping.max_audible = 800.0;
//!
//! let spectrum = PhononSpectrum::new("demo", vec![-0.1, 1.0, 2.0, 3.0, 4.0]);
//! let prepared = prepare_voices(&spectrum, &config).unwrap();
//! assert_eq!(prepared.bank.len(), 4);
//!
//! // Render one second offline instead of opening a device
//! let mut oscillators = OscillatorBank::new(prepared.bank, 44100, 1024);
//! let (samples, status) = oscillators.render_mono(44100);
//! assert!(!status.is_halted());
//! assert!(samples.iter().all(|s| s.abs() <= 1.0));
//! ```

pub mod amplitude;
pub mod config;
pub mod error;
pub mod mapping;
pub mod modes;
pub mod oscillator_bank;
pub mod pipeline;
pub mod source;
pub mod stream;
pub mod units;
pub mod voice;

pub use config::SonifyConfig;
pub use error::{Result, SonifyError};
pub use oscillator_bank::{OscillatorBank, RenderStatus};
pub use pipeline::{prepare_each, prepare_voices, PreparedVoices, RunSummary};
pub use stream::{PlaybackOutcome, PlaybackStream};
pub use voice::{SonificationVoice, VoiceBank};

//! Sonification configuration
//!
//! Settings live in a TOML file with one table per concern:
//!
//! ```toml
//! [audio]
//! sample_rate = 44100
//! block_size = 44100
//! duration_secs = 5.0
//!
//! [mapping]
//! min_audible = 20.0
//! max_audible = 8000.0
//! max_phonon = 16.0      # THz, optional
//!
//! [thermal]
//! temperature = 300.0    # K, optional
//! thermal_cutoff = false
//!
//! [source]
//! gamma_only = true
//!
//! [api]
//! base_url = "https://api.materialsproject.org"
//! key_env = "MP_API_KEY"
//! timeout_secs = 30
//! ```
//!
//! Missing tables and keys fall back to the defaults above. Command-line
//! flags are applied on top with [`SonifyConfig::apply_overrides`].

use crate::error::{Result, SonifyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Largest callback block the oscillator bank will allocate for (frames)
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonifyConfig {
    pub audio: AudioSettings,
    pub mapping: MappingSettings,
    pub thermal: ThermalSettings,
    pub source: SourceSettings,
    pub api: ApiSettings,
}

/// Output device settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frames per callback block
    pub block_size: u32,
    /// How long each material plays, in seconds
    pub duration_secs: f64,
}

impl AudioSettings {
    /// Playback time per material
    pub fn duration(&self) -> Result<Duration> {
        if self.duration_secs <= 0.0 {
            return invalid(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration_secs
            ));
        }
        Duration::try_from_secs_f64(self.duration_secs).map_err(|_| {
            SonifyError::InvalidConfig(format!(
                "duration of {} seconds is not representable",
                self.duration_secs
            ))
        })
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 44100,
            duration_secs: 5.0,
        }
    }
}

/// Phonon (THz) to audible (Hz) range mapping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    pub min_audible: f64,
    pub max_audible: f64,
    /// Lower phonon bound in THz; the data minimum when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_phonon: Option<f64>,
    /// Upper phonon bound in THz; the data maximum when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_phonon: Option<f64>,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            min_audible: 20.0,
            max_audible: 8000.0,
            min_phonon: None,
            max_phonon: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalSettings {
    /// Temperature in kelvin for Bose-Einstein weighting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Drop modes whose occupation at `temperature` is below one
    pub thermal_cutoff: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Only use modes at the gamma point
    pub gamma_only: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self { gamma_only: true }
    }
}

/// Materials database client settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Environment variable holding the API key
    pub key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.materialsproject.org".to_string(),
            key_env: "MP_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Values supplied on the command line; `None` leaves the file value alone
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub sample_rate: Option<u32>,
    pub block_size: Option<u32>,
    pub duration_secs: Option<f64>,
    pub min_audible: Option<f64>,
    pub max_audible: Option<f64>,
    pub min_phonon: Option<f64>,
    pub max_phonon: Option<f64>,
    pub temperature: Option<f64>,
    pub thermal_cutoff: bool,
    pub all_qpoints: bool,
}

impl SonifyConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` if given, else the user config file if it exists,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/phonon-sonify/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("phonon-sonify").join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.sample_rate {
            self.audio.sample_rate = v;
        }
        if let Some(v) = overrides.block_size {
            self.audio.block_size = v;
        }
        if let Some(v) = overrides.duration_secs {
            self.audio.duration_secs = v;
        }
        if let Some(v) = overrides.min_audible {
            self.mapping.min_audible = v;
        }
        if let Some(v) = overrides.max_audible {
            self.mapping.max_audible = v;
        }
        if overrides.min_phonon.is_some() {
            self.mapping.min_phonon = overrides.min_phonon;
        }
        if overrides.max_phonon.is_some() {
            self.mapping.max_phonon = overrides.max_phonon;
        }
        if overrides.temperature.is_some() {
            self.thermal.temperature = overrides.temperature;
        }
        if overrides.thermal_cutoff {
            self.thermal.thermal_cutoff = true;
        }
        if overrides.all_qpoints {
            self.source.gamma_only = false;
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return invalid("sample_rate must be positive");
        }
        if audio.block_size == 0 || audio.block_size > MAX_BLOCK_SIZE {
            return invalid(format!(
                "block_size must be between 1 and {} frames, got {}",
                MAX_BLOCK_SIZE, audio.block_size
            ));
        }
        audio.duration()?;

        let m = &self.mapping;
        if !m.min_audible.is_finite() || !m.max_audible.is_finite() {
            return invalid("audible bounds must be finite");
        }
        if m.min_audible <= 0.0 {
            return invalid(format!("min_audible must be positive, got {}", m.min_audible));
        }
        if m.min_audible >= m.max_audible {
            return invalid(format!(
                "min_audible ({}) must be below max_audible ({})",
                m.min_audible, m.max_audible
            ));
        }
        let nyquist = f64::from(audio.sample_rate) / 2.0;
        if m.max_audible > nyquist {
            return invalid(format!(
                "max_audible ({} Hz) exceeds the Nyquist limit ({} Hz)",
                m.max_audible, nyquist
            ));
        }
        for (name, bound) in [("min_phonon", m.min_phonon), ("max_phonon", m.max_phonon)] {
            if let Some(v) = bound {
                if !v.is_finite() {
                    return invalid(format!("{} must be finite", name));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (m.min_phonon, m.max_phonon) {
            if lo >= hi {
                return invalid(format!(
                    "min_phonon ({}) must be below max_phonon ({})",
                    lo, hi
                ));
            }
        }

        if let Some(t) = self.thermal.temperature {
            if !t.is_finite() || t <= 0.0 {
                return invalid(format!("temperature must be positive kelvin, got {}", t));
            }
        } else if self.thermal.thermal_cutoff {
            return invalid("thermal_cutoff requires a temperature");
        }

        if self.api.key_env.trim().is_empty() {
            return invalid("api.key_env must name an environment variable");
        }
        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(SonifyError::InvalidConfig(msg.into()))
}

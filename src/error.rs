//! Error types for phonon sonification
//!
//! Every fallible operation in the crate returns [`Result`], whose error
//! side is [`SonifyError`].

use std::fmt;

/// Errors raised while preparing or playing a sonification
#[derive(Debug)]
pub enum SonifyError {
    /// A configuration value is out of range or malformed
    InvalidConfig(String),
    /// The database returned no phonon band structure for a material
    MissingPhononData(String),
    /// Every mode of a material was filtered out before mapping
    NoPhysicalModes(String),
    /// Density-of-states weights do not line up with the retained modes
    DosLengthMismatch { frequencies: usize, weights: usize },
    /// A voice table whose amplitudes sum above the safety ceiling
    AmplitudeCeiling(f64),
    /// The API credential environment variable is not set
    MissingApiKey(String),
    /// A phonon mesh file could not be interpreted
    MeshFormat(String),
    /// No usable audio output device or stream configuration
    Audio(String),
    /// HTTP failure talking to the materials database
    Http(reqwest::Error),
    IoError(std::io::Error),
    SerdeError(String),
}

impl fmt::Display for SonifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SonifyError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SonifyError::MissingPhononData(id) => {
                write!(f, "No phonon data available for material {}", id)
            }
            SonifyError::NoPhysicalModes(id) => {
                write!(f, "No real (positive) phonon modes left for {}", id)
            }
            SonifyError::DosLengthMismatch {
                frequencies,
                weights,
            } => write!(
                f,
                "Density of states has {} weights for {} frequencies",
                weights, frequencies
            ),
            SonifyError::AmplitudeCeiling(sum) => {
                write!(f, "Voice amplitudes sum to {:.6}, above the 1.0 ceiling", sum)
            }
            SonifyError::MissingApiKey(var) => {
                write!(f, "Materials database API key not set (export {})", var)
            }
            SonifyError::MeshFormat(msg) => write!(f, "Malformed phonon mesh: {}", msg),
            SonifyError::Audio(msg) => write!(f, "Audio error: {}", msg),
            SonifyError::Http(e) => write!(f, "HTTP error: {}", e),
            SonifyError::IoError(e) => write!(f, "IO error: {}", e),
            SonifyError::SerdeError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for SonifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SonifyError::Http(e) => Some(e),
            SonifyError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SonifyError {
    fn from(e: std::io::Error) -> Self {
        SonifyError::IoError(e)
    }
}

impl From<reqwest::Error> for SonifyError {
    fn from(e: reqwest::Error) -> Self {
        SonifyError::Http(e)
    }
}

impl From<serde_json::Error> for SonifyError {
    fn from(e: serde_json::Error) -> Self {
        SonifyError::SerdeError(e.to_string())
    }
}

impl From<serde_yaml::Error> for SonifyError {
    fn from(e: serde_yaml::Error) -> Self {
        SonifyError::MeshFormat(e.to_string())
    }
}

impl From<toml::de::Error> for SonifyError {
    fn from(e: toml::de::Error) -> Self {
        SonifyError::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for SonifyError {
    fn from(e: toml::ser::Error) -> Self {
        SonifyError::SerdeError(e.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for SonifyError {
    fn from(e: cpal::SupportedStreamConfigsError) -> Self {
        SonifyError::Audio(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for SonifyError {
    fn from(e: cpal::BuildStreamError) -> Self {
        SonifyError::Audio(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for SonifyError {
    fn from(e: cpal::PlayStreamError) -> Self {
        SonifyError::Audio(e.to_string())
    }
}

impl From<cpal::PauseStreamError> for SonifyError {
    fn from(e: cpal::PauseStreamError) -> Self {
        SonifyError::Audio(e.to_string())
    }
}

impl From<cpal::DeviceNameError> for SonifyError {
    fn from(e: cpal::DeviceNameError) -> Self {
        SonifyError::Audio(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SonifyError>;

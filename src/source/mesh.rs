//! phonopy `mesh.yaml` reader
//!
//! Only the parts needed for sonification are read:
//!
//! ```yaml
//! phonon:
//! - q-position: [ 0.0000000, 0.0000000, 0.0000000 ]
//!   band:
//!   - # 1
//!     frequency:    -0.0000012
//!   - # 2
//!     frequency:     4.1234567
//! ```

use super::{gamma_index, PhononSpectrum};
use crate::error::{Result, SonifyError};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct MeshFile {
    #[serde(default)]
    phonon: Vec<MeshQPoint>,
}

#[derive(Debug, Deserialize)]
struct MeshQPoint {
    #[serde(rename = "q-position", default)]
    q_position: Vec<f64>,
    #[serde(default)]
    band: Vec<MeshBand>,
}

#[derive(Debug, Deserialize)]
struct MeshBand {
    frequency: f64,
}

/// Read phonon frequencies (THz) from a phonopy mesh file
pub fn frequencies_from_mesh(path: &Path, gamma_only: bool) -> Result<PhononSpectrum> {
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let spectrum = parse_mesh(&name, &content, gamma_only)?;
    info!(
        "Read {} frequencies from {}",
        spectrum.frequencies.len(),
        path.display()
    );
    Ok(spectrum)
}

/// Parse mesh YAML text; `material` labels the result
pub fn parse_mesh(material: &str, content: &str, gamma_only: bool) -> Result<PhononSpectrum> {
    let mesh: MeshFile = serde_yaml::from_str(content)?;
    if mesh.phonon.is_empty() {
        return Err(SonifyError::MeshFormat(format!(
            "{} has no `phonon` q-points",
            material
        )));
    }

    let frequencies: Vec<f64> = if gamma_only {
        let index = match gamma_index(mesh.phonon.iter().map(|q| q.q_position.as_slice())) {
            Some(i) => i,
            None => {
                warn!(
                    "{} has no q-point at the origin, using the first q-point {:?}",
                    material, mesh.phonon[0].q_position
                );
                0
            }
        };
        mesh.phonon[index].band.iter().map(|b| b.frequency).collect()
    } else {
        mesh.phonon
            .iter()
            .flat_map(|q| q.band.iter().map(|b| b.frequency))
            .collect()
    };

    Ok(PhononSpectrum::new(material, frequencies))
}

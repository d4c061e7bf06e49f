//! Where phonon frequencies come from
//!
//! - [`materials_project`] - remote materials database (needs an API key)
//! - [`mesh`] - a local phonopy `mesh.yaml`
//!
//! Both produce a [`PhononSpectrum`]: raw frequencies in THz, possibly
//! including imaginary modes, plus an optional density of states.

pub mod materials_project;
pub mod mesh;

use crate::modes::DensityOfStates;

pub use materials_project::MaterialsProjectClient;
pub use mesh::frequencies_from_mesh;

/// Raw phonon data for one material
#[derive(Clone, Debug, PartialEq)]
pub struct PhononSpectrum {
    /// Material identifier or file name
    pub material: String,
    /// THz, unfiltered
    pub frequencies: Vec<f64>,
    pub dos: Option<DensityOfStates>,
}

impl PhononSpectrum {
    pub fn new(material: impl Into<String>, frequencies: Vec<f64>) -> Self {
        Self {
            material: material.into(),
            frequencies,
            dos: None,
        }
    }

    pub fn with_dos(mut self, dos: DensityOfStates) -> Self {
        self.dos = Some(dos);
        self
    }
}

/// Index of the q-point at the origin, if any
pub(crate) fn gamma_index<'a, I>(qpoints: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    qpoints
        .into_iter()
        .position(|q| !q.is_empty() && q.iter().all(|c| c.abs() < 1e-8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_index() {
        let qpoints = [vec![0.5, 0.0, 0.0], vec![0.0, 0.0, 0.0]];
        assert_eq!(gamma_index(qpoints.iter().map(|q| q.as_slice())), Some(1));

        let none = [vec![0.25, 0.25, 0.0]];
        assert_eq!(gamma_index(none.iter().map(|q| q.as_slice())), None);
    }
}

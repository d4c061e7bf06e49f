//! Materials Project phonon client
//!
//! Fetches the phonon band structure and density of states for a material
//! id (e.g. `mp-149`). Requests carry the API key from the environment in
//! the `X-API-KEY` header.

use super::{gamma_index, PhononSpectrum};
use crate::config::ApiSettings;
use crate::error::{Result, SonifyError};
use crate::modes::DensityOfStates;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct PhononResponse {
    #[serde(default)]
    data: Vec<PhononDoc>,
}

#[derive(Debug, Deserialize)]
struct PhononDoc {
    #[serde(alias = "phonon_bandstructure")]
    ph_bs: Option<BandStructure>,
    #[serde(alias = "phonon_dos")]
    ph_dos: Option<DosDoc>,
}

#[derive(Debug, Deserialize)]
struct BandStructure {
    /// `bands[branch][qpoint]`, THz
    #[serde(default)]
    bands: Vec<Vec<f64>>,
    #[serde(default)]
    qpoints: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct DosDoc {
    #[serde(default)]
    frequencies: Vec<f64>,
    #[serde(default)]
    densities: Vec<f64>,
}

pub struct MaterialsProjectClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MaterialsProjectClient {
    /// Build a client, reading the key from `settings.key_env`
    pub fn from_env(settings: &ApiSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SonifyError::MissingApiKey(settings.key_env.clone()))?;
        Self::new(settings, api_key)
    }

    pub fn new(settings: &ApiSettings, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn phonon_url(&self) -> String {
        format!("{}/materials/phonon/", self.base_url)
    }

    /// Fetch the phonon spectrum for `material_id`
    pub async fn fetch(&self, material_id: &str, gamma_only: bool) -> Result<PhononSpectrum> {
        let url = self.phonon_url();
        debug!("GET {} for {}", url, material_id);
        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&[
                ("material_ids", material_id),
                ("_fields", "material_id,ph_bs,ph_dos"),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SonifyError::MissingPhononData(material_id.to_string()));
        }
        let body = response.error_for_status()?.text().await?;
        let spectrum = parse_phonon_response(material_id, &body, gamma_only)?;
        info!(
            "Fetched {} frequencies for {}{}",
            spectrum.frequencies.len(),
            material_id,
            if spectrum.dos.is_some() { " with DOS" } else { "" }
        );
        Ok(spectrum)
    }
}

/// Decode a phonon endpoint response body
pub fn parse_phonon_response(
    material_id: &str,
    body: &str,
    gamma_only: bool,
) -> Result<PhononSpectrum> {
    let response: PhononResponse = serde_json::from_str(body)?;
    let missing = || SonifyError::MissingPhononData(material_id.to_string());

    let doc = response.data.into_iter().next().ok_or_else(missing)?;
    let bs = doc.ph_bs.ok_or_else(missing)?;
    if bs.bands.is_empty() {
        return Err(missing());
    }

    let frequencies: Vec<f64> = if gamma_only {
        let q = gamma_index(bs.qpoints.iter().map(|q| q.as_slice())).unwrap_or(0);
        if let Some(coords) = bs.qpoints.get(q) {
            debug!("Extracting {} frequencies at q-point {:?}", material_id, coords);
        }
        bs.bands.iter().filter_map(|branch| branch.get(q).copied()).collect()
    } else {
        bs.bands.iter().flatten().copied().collect()
    };
    if frequencies.is_empty() {
        return Err(missing());
    }

    let mut spectrum = PhononSpectrum::new(material_id, frequencies);
    if let Some(dos) = doc.ph_dos {
        if !dos.frequencies.is_empty() && dos.frequencies.len() == dos.densities.len() {
            spectrum = spectrum.with_dos(DensityOfStates::new(dos.frequencies, dos.densities));
        }
    }
    Ok(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "data": [{
            "material_id": "mp-10378",
            "ph_bs": {
                "qpoints": [[0.0, 0.0, 0.0], [0.5, 0.0, 0.5]],
                "bands": [[-0.01, 1.5], [2.0, 2.5], [4.0, 3.5]]
            },
            "ph_dos": {
                "frequencies": [0.0, 2.0, 4.0],
                "densities": [0.0, 1.0, 0.5]
            }
        }],
        "meta": {"total_doc": 1}
    }"#;

    #[test]
    fn test_gamma_column() {
        let spectrum = parse_phonon_response("mp-10378", BODY, true).unwrap();
        assert_eq!(spectrum.frequencies, vec![-0.01, 2.0, 4.0]);
        let dos = spectrum.dos.unwrap();
        assert_eq!(dos.density_at(2.0), 1.0);
    }

    #[test]
    fn test_all_qpoints() {
        let spectrum = parse_phonon_response("mp-10378", BODY, false).unwrap();
        assert_eq!(spectrum.frequencies.len(), 6);
    }

    #[test]
    fn test_no_documents_is_missing_data() {
        let result = parse_phonon_response("mp-1", r#"{"data": []}"#, true);
        assert!(matches!(result, Err(SonifyError::MissingPhononData(id)) if id == "mp-1"));
    }

    #[test]
    fn test_null_band_structure_is_missing_data() {
        let body = r#"{"data": [{"material_id": "mp-2", "ph_bs": null}]}"#;
        let result = parse_phonon_response("mp-2", body, true);
        assert!(matches!(result, Err(SonifyError::MissingPhononData(_))));
    }

    #[test]
    fn test_newer_field_names() {
        let body = r#"{"data": [{"phonon_bandstructure": {"qpoints": [[0,0,0]], "bands": [[3.0]]}}]}"#;
        let spectrum = parse_phonon_response("mp-3", body, true).unwrap();
        assert_eq!(spectrum.frequencies, vec![3.0]);
        assert!(spectrum.dos.is_none());
    }

    #[test]
    fn test_missing_key() {
        let settings = ApiSettings {
            key_env: "PHONON_SONIFY_TEST_UNSET_KEY".to_string(),
            ..ApiSettings::default()
        };
        assert!(matches!(
            MaterialsProjectClient::from_env(&settings),
            Err(SonifyError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_url_trims_slash() {
        let settings = ApiSettings {
            base_url: "http://localhost:8080/".to_string(),
            ..ApiSettings::default()
        };
        let client = MaterialsProjectClient::new(&settings, "k".to_string()).unwrap();
        assert_eq!(client.phonon_url(), "http://localhost:8080/materials/phonon/");
    }
}

/// End-to-end sonification tests
///
/// Exercises the whole preparation chain (mesh file -> filter -> map ->
/// amplitudes -> voice bank) and then renders the bank offline, checking the
/// properties the audio callback must keep:
/// - every sample stays within the 1.0 ceiling
/// - phases carry across callback blocks
/// - stereo channels carry the same signal
/// - an empty bank produces a ramp, an overdriven one halts
use phonon_sonify::config::SonifyConfig;
use phonon_sonify::pipeline::prepare_voices;
use phonon_sonify::source::mesh::frequencies_from_mesh;
use phonon_sonify::source::PhononSpectrum;
use phonon_sonify::{OscillatorBank, RenderStatus, SonifyError, VoiceBank};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const SAMPLE_RATE: u32 = 44100;

const BAS_MESH: &str = r#"
mesh: [ 4, 4, 4 ]
nqpoint: 2
natom: 2
phonon:
- q-position: [ 0.0000000, 0.0000000, 0.0000000 ]
  weight: 1
  band:
  - # 1
    frequency:    -0.0000021
  - # 2
    frequency:    -0.0000021
  - # 3
    frequency:     0.0000000
  - # 4
    frequency:     4.0110732
  - # 5
    frequency:     4.0110732
  - # 6
    frequency:     6.1208710
- q-position: [ 0.2500000, 0.0000000, 0.0000000 ]
  weight: 6
  band:
  - # 1
    frequency:     1.2044170
  - # 2
    frequency:     1.2044170
  - # 3
    frequency:     2.0517765
  - # 4
    frequency:     4.1071103
  - # 5
    frequency:     4.1071103
  - # 6
    frequency:     5.9876543
"#;

fn write_mesh(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write mesh");
    file
}

fn calculate_rms(audio: &[f32]) -> f32 {
    let sum: f32 = audio.iter().map(|x| x * x).sum();
    (sum / audio.len() as f32).sqrt()
}

// ========== Preparation ==========

#[test]
fn test_mesh_gamma_point_to_voices() {
    let file = write_mesh(BAS_MESH);
    let spectrum = frequencies_from_mesh(file.path(), true).unwrap();
    let prepared = prepare_voices(&spectrum, &SonifyConfig::default()).unwrap();

    // Acoustic (imaginary / zero) modes gone, degenerate optical pair merged
    assert_eq!(prepared.bank.len(), 2);
    assert!(prepared.modes.iter().all(|m| m.frequency > 0.0));
    assert!((prepared.audible[0] - 20.0).abs() < 1e-9);
    assert!((prepared.audible[1] - 8000.0).abs() < 1e-9);
}

#[test]
fn test_mesh_all_qpoints_with_fixed_phonon_range() {
    let file = write_mesh(BAS_MESH);
    let spectrum = frequencies_from_mesh(file.path(), false).unwrap();

    let mut config = SonifyConfig::default();
    config.mapping.min_phonon = Some(0.0);
    config.mapping.max_phonon = Some(16.0);
    config.mapping.max_audible = 1620.0;

    let prepared = prepare_voices(&spectrum, &config).unwrap();
    assert_eq!(prepared.bank.len(), 6);
    for hz in &prepared.audible {
        assert!((20.0..=1620.0).contains(hz), "{} Hz out of band", hz);
    }
    // 0..16 THz onto 20..1620 Hz is 100 Hz per THz
    let first = prepared.modes[0].frequency;
    assert!((prepared.audible[0] - (20.0 + first * 100.0)).abs() < 1e-9);
}

#[test]
fn test_missing_mesh_file() {
    let dir = tempdir().unwrap();
    let result = frequencies_from_mesh(&dir.path().join("mesh.yaml"), true);
    assert!(matches!(result, Err(SonifyError::IoError(_))));
}

#[test]
fn test_config_file_drives_mapping() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[mapping]\nmin_audible = 100.0\nmax_audible = 200.0\n\n[audio]\nduration_secs = 1.5\n",
    )
    .unwrap();

    let config = SonifyConfig::discover(Some(&path)).unwrap();
    config.validate().unwrap();
    assert_eq!(config.audio.duration_secs, 1.5);

    let spectrum = PhononSpectrum::new("cfg", vec![1.0, 3.0, 5.0]);
    let prepared = prepare_voices(&spectrum, &config).unwrap();
    assert_eq!(prepared.audible, vec![100.0, 150.0, 200.0]);
}

// ========== Rendering ==========

#[test]
fn test_prepared_bank_never_trips_ceiling() {
    let mut config = SonifyConfig::default();
    config.thermal.temperature = Some(300.0);
    let spectrum = PhononSpectrum::new(
        "dense",
        (1..=40).map(|i| i as f64 * 0.37).collect(),
    );
    let prepared = prepare_voices(&spectrum, &config).unwrap();
    assert!(prepared.bank.amplitude_sum() <= 1.0 + 1e-9);

    let mut osc = OscillatorBank::new(prepared.bank, SAMPLE_RATE, 4096);
    let mut out = vec![0.0f32; 4096 * 2];
    for _ in 0..20 {
        let status = osc.render(&mut out, 2);
        assert_eq!(status, RenderStatus::Rendered { frames: 4096 });
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }
    assert!(osc.voices().iter().all(|v| v.phase_index == 4096 * 20));
}

#[test]
fn test_blocks_join_without_discontinuity() {
    let bank = VoiceBank::new(&[523.25, 659.25, 783.99], &[0.3, 0.3, 0.3]).unwrap();
    let mut continuous = OscillatorBank::new(bank.clone(), SAMPLE_RATE, 2048);
    let mut blocked = OscillatorBank::new(bank, SAMPLE_RATE, 2048);

    let (reference, _) = continuous.render_mono(2048);
    let mut pieces = Vec::new();
    for size in [100, 512, 1000, 436] {
        let (piece, _) = blocked.render_mono(size);
        pieces.extend(piece);
    }

    assert_eq!(pieces.len(), reference.len());
    for (i, (a, b)) in reference.iter().zip(&pieces).enumerate() {
        assert!((a - b).abs() < 1e-5, "sample {} differs: {} vs {}", i, a, b);
    }
}

#[test]
fn test_stereo_output_is_duplicated_mono() {
    let bank = VoiceBank::new(&[220.0, 330.0], &[0.5, 0.5]).unwrap();
    let mut stereo = OscillatorBank::new(bank.clone(), SAMPLE_RATE, 1024);
    let mut mono = OscillatorBank::new(bank, SAMPLE_RATE, 1024);

    let mut interleaved = vec![0.0f32; 2048];
    stereo.render(&mut interleaved, 2);
    let (reference, _) = mono.render_mono(1024);

    for (frame, expected) in interleaved.chunks(2).zip(&reference) {
        assert_eq!(frame[0], *expected);
        assert_eq!(frame[1], *expected);
    }
    assert!(calculate_rms(&reference) > 0.2);
}

#[test]
fn test_zero_voices_emit_monotonic_ramp() {
    let mut osc = OscillatorBank::new(VoiceBank::default(), SAMPLE_RATE, 512);
    let mut out = vec![0.0f32; 1024];
    let status = osc.render(&mut out, 2);
    assert_eq!(status, RenderStatus::Rendered { frames: 512 });

    let left: Vec<f32> = out.chunks(2).map(|f| f[0]).collect();
    assert_eq!(left[0], 0.0);
    assert!(left.windows(2).all(|w| w[1] > w[0]));
    assert!(calculate_rms(&left) > 0.0);
}

#[test]
fn test_u16_output_centres_on_equilibrium() {
    let mut osc = OscillatorBank::new(
        VoiceBank::new(&[440.0], &[0.5]).unwrap(),
        SAMPLE_RATE,
        256,
    );
    let mut out = vec![0u16; 512];
    osc.render(&mut out, 2);
    // sin(0) = 0 maps to the unsigned midpoint
    assert_eq!(out[0], 32768);
    assert!(out.iter().any(|&s| s > 40000));
    assert!(out.iter().any(|&s| s < 25000));
}

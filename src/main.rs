//! phonon-sonify CLI - play the phonon spectrum of a material

use clap::{Args, Parser, Subcommand};
use phonon_sonify::config::{ConfigOverrides, SonifyConfig};
use phonon_sonify::pipeline::{prepare_each, PreparedVoices, RunSummary};
use phonon_sonify::source::{frequencies_from_mesh, MaterialsProjectClient};
use phonon_sonify::stream::{PlaybackOutcome, PlaybackStream};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "phonon-sonify")]
#[command(about = "Listen to the phonon spectrum of crystalline materials", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults to the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play each material's spectrum in turn
    Play {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Seconds to play each material (default: 5.0)
        #[arg(short, long)]
        duration: Option<f64>,

        /// Output sample rate in Hz (default: 44100)
        #[arg(short, long)]
        sample_rate: Option<u32>,

        /// Frames per audio callback (default: 44100)
        #[arg(short, long)]
        block_size: Option<u32>,
    },

    /// Print the voice table without opening an audio device
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        mapping: MappingArgs,
    },

    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        mapping: MappingArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Materials Project ids, e.g. mp-10378 mp-571386
    materials: Vec<String>,

    /// Read frequencies from a phonopy mesh.yaml instead of the database
    #[arg(short, long, conflicts_with = "materials")]
    mesh: Option<PathBuf>,
}

#[derive(Args)]
struct MappingArgs {
    /// Lower phonon bound in THz (default: lowest mode)
    #[arg(long)]
    min_phonon: Option<f64>,

    /// Upper phonon bound in THz (default: highest mode)
    #[arg(long)]
    max_phonon: Option<f64>,

    /// Lowest audible frequency in Hz (default: 20)
    #[arg(long)]
    min_audible: Option<f64>,

    /// Highest audible frequency in Hz (default: 8000)
    #[arg(long)]
    max_audible: Option<f64>,

    /// Temperature in K for Bose-Einstein weighting
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Keep only modes with occupation >= 1 at --temperature
    #[arg(long)]
    thermal_cutoff: bool,

    /// Use modes at every q-point instead of only the gamma point
    #[arg(long)]
    all_qpoints: bool,
}

impl MappingArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_phonon: self.min_phonon,
            max_phonon: self.max_phonon,
            min_audible: self.min_audible,
            max_audible: self.max_audible,
            temperature: self.temperature,
            thermal_cutoff: self.thermal_cutoff,
            all_qpoints: self.all_qpoints,
            ..Default::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = SonifyConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            source,
            mapping,
            duration,
            sample_rate,
            block_size,
        } => {
            config.apply_overrides(&ConfigOverrides {
                duration_secs: duration,
                sample_rate,
                block_size,
                ..mapping.overrides()
            });
            validate_or_exit(&config);

            let duration = config.audio.duration()?;
            let summary = for_each_material(&source, &config, |prepared| {
                let voices = prepared.bank.len();
                let stream = PlaybackStream::open(&config.audio, prepared.bank)?;
                info!(
                    "Playing {} ({} voices) on {} at {} Hz",
                    prepared.material,
                    voices,
                    stream.device_name(),
                    stream.config().sample_rate.0
                );
                if stream.play_for(duration)? == PlaybackOutcome::Halted {
                    warn!("{}: playback halted early", prepared.material);
                }
                Ok(())
            })?;
            info!(
                "Played {} material(s), skipped {}",
                summary.handled.len(),
                summary.skipped.len()
            );
        }

        Commands::Inspect { source, mapping } => {
            config.apply_overrides(&mapping.overrides());
            validate_or_exit(&config);
            for_each_material(&source, &config, |prepared| {
                print_voices(&prepared);
                Ok(())
            })?;
        }

        Commands::Config { mapping } => {
            config.apply_overrides(&mapping.overrides());
            validate_or_exit(&config);
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn validate_or_exit(config: &SonifyConfig) {
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(2);
    }
}

/// Fetch every requested material and hand its prepared voices to `handle`.
///
/// A material with no usable data is reported and skipped; audio device
/// failures abort the run.
fn for_each_material<F>(
    source: &SourceArgs,
    config: &SonifyConfig,
    handle: F,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnMut(PreparedVoices) -> phonon_sonify::Result<()>,
{
    let gamma_only = config.source.gamma_only;

    if let Some(path) = &source.mesh {
        let spectrum = frequencies_from_mesh(path, gamma_only)?;
        let id = spectrum.material.clone();
        return Ok(prepare_each(std::iter::once((id, Ok(spectrum))), config, handle)?);
    }

    if source.materials.is_empty() {
        return Err("give at least one material id or --mesh <file>".into());
    }

    let client = MaterialsProjectClient::from_env(&config.api)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let fetched = source
        .materials
        .iter()
        .map(|id| (id.clone(), runtime.block_on(client.fetch(id, gamma_only))));
    Ok(prepare_each(fetched, config, handle)?)
}

fn print_voices(prepared: &PreparedVoices) {
    println!("{} - {} voices", prepared.material, prepared.bank.len());
    println!("  {:>12}  {:>12}  {:>9}", "phonon THz", "audible Hz", "amplitude");
    for (mode, hz) in prepared.modes.iter().zip(&prepared.audible) {
        println!("  {:>12.4}  {:>12.2}  {:>9.4}", mode.frequency, hz, mode.weight);
    }
    println!();
}

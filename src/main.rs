use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use unmix::analysis::{AnalysisOptions, Analyzer, NmfOptions, OnsetOptions};
use unmix::cli;
use unmix::config::Config;
use unmix::dsp::{DefaultKernel, FluxOnsetDetector};
use unmix::separate::Separator;
use unmix::session::Session;
use unmix::store::SampleBank;

#[derive(Parser)]
#[command(name = "unmix")]
#[command(about = "Content-addressed audio analysis store with NMF separation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "unmix.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a WAV file into the sample store
    Add {
        /// Path to a WAV file
        file: String,
    },

    /// List stored samples
    List,

    /// Run an analysis on a sample
    Analyze {
        #[command(subcommand)]
        command: AnalyzeCommands,
    },

    /// Resynthesize components of the latest NMF analysis
    Separate {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,

        /// Resynthesize a single component instead of all of them
        #[arg(long)]
        component: Option<usize>,

        /// Directory to write component WAV files into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show slices from the latest onset analysis
    Slices {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,
    },

    /// List stored analyses for a sample
    Features {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,
    },

    /// List stored components for the latest NMF analysis
    Components {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,
    },
}

#[derive(Subcommand)]
enum AnalyzeCommands {
    /// Factorize the magnitude spectrogram into additive components
    Nmf {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,

        /// Number of components to extract
        #[arg(long)]
        components: Option<usize>,

        /// Multiplicative update iterations
        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        fft_size: Option<usize>,

        #[arg(long)]
        window_size: Option<usize>,

        #[arg(long)]
        hop_size: Option<usize>,

        /// RNG seed for basis initialization (-1 picks one)
        #[arg(long)]
        seed: Option<i64>,
    },

    /// Detect onsets via spectral flux and materialize slices
    Onsets {
        /// Sample hash prefix (defaults to the most recent sample)
        sample: Option<String>,

        /// Normalized flux threshold in [0, 1]
        #[arg(long)]
        threshold: Option<f32>,

        /// Moving-mean filter width in frames
        #[arg(long)]
        filter_size: Option<usize>,

        /// Minimum gap between onsets in frames
        #[arg(long)]
        min_slice_length: Option<usize>,

        #[arg(long)]
        fft_size: Option<usize>,

        #[arg(long)]
        window_size: Option<usize>,

        #[arg(long)]
        hop_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load config
    let config = Config::load(&args.config).unwrap_or_default();

    // Initialize store
    let store = Arc::new(Mutex::new(SampleBank::open(&config.database_path())?));
    let kernel = Arc::new(DefaultKernel);
    let session = Session::new();

    match args.command {
        Commands::Add { file } => {
            cli::add::run(&store, &file)?;
        }
        Commands::List => {
            cli::list::run(&store)?;
        }
        Commands::Analyze { command } => {
            let (sample, options) = match command {
                AnalyzeCommands::Nmf {
                    sample,
                    components,
                    iterations,
                    fft_size,
                    window_size,
                    hop_size,
                    seed,
                } => {
                    let base = config.nmf;
                    let options = NmfOptions {
                        components: components.unwrap_or(base.components),
                        iterations: iterations.unwrap_or(base.iterations),
                        fft_size: fft_size.unwrap_or(base.fft_size),
                        window_size: window_size.or(base.window_size),
                        hop_size: hop_size.or(base.hop_size),
                        seed: seed.unwrap_or(base.seed),
                    };
                    (sample, AnalysisOptions::Nmf(options))
                }
                AnalyzeCommands::Onsets {
                    sample,
                    threshold,
                    filter_size,
                    min_slice_length,
                    fft_size,
                    window_size,
                    hop_size,
                } => {
                    let base = config.onsets;
                    let options = OnsetOptions {
                        threshold: threshold.unwrap_or(base.threshold),
                        filter_size: filter_size.unwrap_or(base.filter_size),
                        min_slice_length: min_slice_length.unwrap_or(base.min_slice_length),
                        fft_size: fft_size.unwrap_or(base.fft_size),
                        window_size: window_size.or(base.window_size),
                        hop_size: hop_size.or(base.hop_size),
                    };
                    (sample, AnalysisOptions::OnsetSlice(options))
                }
            };

            let analyzer = Analyzer::new(store.clone(), kernel, Arc::new(FluxOnsetDetector));
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                cli::analyze::run(&analyzer, &store, &session, sample.as_deref(), options)
            })
            .await??;
        }
        Commands::Separate {
            sample,
            component,
            out,
        } => {
            let separator = Separator::new(store.clone(), kernel);
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                cli::separate::run(
                    &separator,
                    &store,
                    &session,
                    sample.as_deref(),
                    component,
                    out.as_deref(),
                )
            })
            .await??;
        }
        Commands::Slices { sample } => {
            cli::slices::run(&store, &session, sample.as_deref())?;
        }
        Commands::Features { sample } => {
            cli::features::run(&store, &session, sample.as_deref())?;
        }
        Commands::Components { sample } => {
            cli::components::run(&store, &session, sample.as_deref())?;
        }
    }

    Ok(())
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::DVec2;
use pbf_core::{RefinementConfig, SimConfig};
use pbf_geom::Aabb;
use tracing_subscriber::EnvFilter;

use crate::report::Summary;
use crate::run::{simulate, Backend, Mode, RunSpec};

/// Top-level arguments for `pbf-sim`.
#[derive(Parser)]
#[command(name = "pbf-sim")]
#[command(about = "Headless 2D position-based fluid simulator")]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// `pbf-sim` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Seed a scene, advance it and print a summary
    Run(RunArgs),
    /// Run, then list the particles whose indexed bound overlaps a rectangle
    Query {
        /// Scene and run options.
        #[command(flatten)]
        run: RunArgs,
        /// Query rectangle as MIN_X MIN_Y MAX_X MAX_Y
        #[arg(long, num_args = 4, allow_hyphen_values = true, value_names = ["MIN_X", "MIN_Y", "MAX_X", "MAX_Y"])]
        rect: Vec<f64>,
    },
    /// Print the default configuration as JSON
    Config,
}

/// Output format for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Two-column table.
    #[default]
    Table,
    /// Single JSON document.
    Json,
}

/// Scene and run options shared by `run` and `query`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Frames to advance
    #[arg(long, default_value = "240")]
    pub frames: u32,
    /// Particles to seed
    #[arg(long, default_value = "144")]
    pub particles: u32,
    /// Spatial index backend
    #[arg(long, value_enum, default_value_t = Backend::Tree)]
    pub backend: Backend,
    /// Per-frame strategy
    #[arg(long, value_enum, default_value_t = Mode::Fluid)]
    pub mode: Mode,
    /// JSON config file; missing keys take their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Frames per second; dt = 1 / fps
    #[arg(long, default_value = "24")]
    pub fps: f64,
    /// Seed for the lattice velocities and wall jitter
    #[arg(long)]
    pub seed: Option<u64>,
    /// Tree leaf margin (defaults to 2.5 particle radii)
    #[arg(long)]
    pub tree_margin: Option<f64>,
    /// Grid cell side
    #[arg(long, default_value = "5")]
    pub cell_size: f64,
    /// Enable XSPH viscosity and vorticity confinement with default strengths
    #[arg(long)]
    pub refine: bool,
    /// Validate the index every N frames (0 = never)
    #[arg(long, default_value = "0")]
    pub validate_every: u32,
    /// Summary format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

impl RunArgs {
    fn load_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<SimConfig>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => SimConfig::default(),
        };
        if self.refine {
            config.refinement = RefinementConfig::enabled();
        }
        if let Some(seed) = self.seed {
            config.jitter_seed = seed;
        }
        config.validate().context("invalid simulation config")?;
        Ok(config)
    }

    fn to_spec(&self, query: Option<Aabb>) -> Result<RunSpec> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            bail!("--fps must be finite and > 0, got {}", self.fps);
        }
        let config = self.load_config()?;
        let mut spec = RunSpec::new(config);
        spec.backend = self.backend;
        spec.mode = self.mode;
        spec.particles = self.particles;
        spec.frames = self.frames;
        spec.dt = 1.0 / self.fps;
        spec.cell_size = self.cell_size;
        spec.validate_every = self.validate_every;
        spec.query = query;
        if let Some(margin) = self.tree_margin {
            spec.tree_margin = margin;
        }
        Ok(spec)
    }
}

fn emit(summary: &Summary, format: Format) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match format {
        Format::Table => writeln!(out, "{}", summary.to_table())?,
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&summary.to_json())?)?,
    }
    Ok(())
}

/// Parses arguments, installs the log subscriber and dispatches.
///
/// Logs go to stderr so stdout carries only the summary.
pub fn entrypoint() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => {
            let summary = simulate(&args.to_spec(None)?)?;
            emit(&summary, args.format)?;
        }
        Commands::Query { run, rect } => {
            let [min_x, min_y, max_x, max_y] = rect[..] else {
                bail!("--rect takes exactly four numbers");
            };
            let window = Aabb::from_corners(DVec2::new(min_x, min_y), DVec2::new(max_x, max_y));
            let summary = simulate(&run.to_spec(Some(window))?)?;
            emit(&summary, run.format)?;
        }
        Commands::Config => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", serde_json::to_string_pretty(&SimConfig::default())?)?;
        }
    }

    Ok(())
}

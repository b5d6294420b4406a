// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use anyhow::{Context, Result};
use clap::ValueEnum;
use pbf_core::{DiscreteSolver, ParticleSet, PbfSolver, SimConfig};
use pbf_geom::{Aabb, DynamicBoundsTree, GridSpatialIndex, InvariantViolation, SpatialIndex};
use tracing::{info, trace};

use crate::report::{Summary, Totals};
use crate::seed::LatticeSeeder;

/// Spatial index used for neighbor and collision queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// Dynamic bounds tree with fattened leaves.
    #[default]
    Tree,
    /// Uniform grid hash.
    Grid,
}

impl Backend {
    /// Lowercase name as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Grid => "grid",
        }
    }
}

/// Per-frame strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Position-based fluids.
    #[default]
    Fluid,
    /// Ballistic motion with elastic collisions.
    Discrete,
}

impl Mode {
    /// Lowercase name as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fluid => "fluid",
            Self::Discrete => "discrete",
        }
    }
}

/// Everything one simulation run needs.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Solver parameters, already validated by the caller or rejected here.
    pub config: SimConfig,
    /// Index backend.
    pub backend: Backend,
    /// Frame strategy.
    pub mode: Mode,
    /// Particles to seed.
    pub particles: u32,
    /// Frames to advance.
    pub frames: u32,
    /// Fixed time step.
    pub dt: f64,
    /// Lattice velocity seed.
    pub seed: u64,
    /// Tree leaf margin.
    pub tree_margin: f64,
    /// Grid cell side.
    pub cell_size: f64,
    /// Validate the index every N frames; 0 disables.
    pub validate_every: u32,
    /// Box to query once the last frame is done.
    pub query: Option<Aabb>,
}

impl RunSpec {
    /// Default scene for `config`: 144 particles, 24 fps, tree margin `2.5R`,
    /// grid cells of 5.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            backend: Backend::Tree,
            mode: Mode::Fluid,
            particles: 144,
            frames: 240,
            dt: 1.0 / 24.0,
            seed: config.jitter_seed,
            tree_margin: 2.5 * config.particle_radius,
            cell_size: 5.0,
            validate_every: 0,
            query: None,
            config,
        }
    }
}

/// Seeds, steps and summarizes one run.
pub fn simulate(spec: &RunSpec) -> Result<Summary> {
    info!(
        backend = spec.backend.as_str(),
        mode = spec.mode.as_str(),
        particles = spec.particles,
        frames = spec.frames,
        dt = spec.dt,
        "simulation started"
    );
    let summary = match spec.backend {
        Backend::Tree => {
            let mut tree = DynamicBoundsTree::new(spec.tree_margin).context("invalid tree margin")?;
            drive(spec, &mut tree, DynamicBoundsTree::validate)?
        }
        Backend::Grid => {
            let mut grid = GridSpatialIndex::new(spec.cell_size).context("invalid grid cell size")?;
            drive(spec, &mut grid, GridSpatialIndex::validate)?
        }
    };
    info!(
        restructures = summary.totals.index_restructures,
        collisions = summary.totals.collisions,
        density_error = summary.totals.final_density_error,
        "simulation finished"
    );
    Ok(summary)
}

fn drive<I, C>(spec: &RunSpec, index: &mut I, check: C) -> Result<Summary>
where
    I: SpatialIndex,
    C: Fn(&I) -> Result<(), InvariantViolation>,
{
    let radius = spec.config.particle_radius;
    let mut particles = ParticleSet::new();
    LatticeSeeder::new(radius, spec.seed).populate(&mut particles, index, spec.particles, radius);

    let mut totals = Totals::default();
    let verify = |frame: u32, index: &I| -> Result<()> {
        if spec.validate_every > 0 && (frame + 1) % spec.validate_every == 0 {
            check(index).with_context(|| format!("index corrupted after frame {frame}"))?;
        }
        Ok(())
    };

    match spec.mode {
        Mode::Fluid => {
            let mut solver = PbfSolver::new(spec.config).context("invalid simulation config")?;
            for frame in 0..spec.frames {
                let stats = solver.step(&mut particles, index, spec.dt);
                trace!(frame, links = stats.neighbor_links, "frame");
                totals.absorb_fluid(&stats);
                verify(frame, index)?;
            }
        }
        Mode::Discrete => {
            let mut solver = DiscreteSolver::new(spec.config).context("invalid simulation config")?;
            for frame in 0..spec.frames {
                let stats = solver.step(&mut particles, index, spec.dt);
                trace!(frame, collisions = stats.collisions, "frame");
                totals.absorb_discrete(&stats);
                verify(frame, index)?;
            }
        }
    }

    let query_hits = spec.query.map(|window| {
        let mut hits = index.query_aabb(&window, false);
        hits.sort();
        hits
    });
    Ok(Summary::collect(spec, &particles, &*index, totals, query_hits))
}

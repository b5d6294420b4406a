// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    rust_2018_idioms,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![doc = r"Position-Based Fluids over a pluggable broad phase.

The solver never touches a concrete index type. It is generic over
`pbf_geom::SpatialIndex`, so the dynamic bounds tree and the uniform grid are
interchangeable per run.

Per frame the driver calls one of:
- [`PbfSolver::step`]: predict, neighbor search, density constraint solve,
  boundary projection, velocity reconstruction and optional refinement.
- [`DiscreteSolver::step`]: integrate, bounce off the walls and resolve
  pairwise equal-mass elastic collisions.

Both write back into the caller's [`ParticleSet`]. Nothing is retained between
frames except the boundary jitter RNG, which is seeded from [`SimConfig`].
"]

/// Discrete elastic-collision mode.
pub mod collision;
/// Simulation parameters and their validation.
pub mod config;
/// SPH smoothing kernels.
pub mod kernels;
/// Caller-owned particle records.
pub mod particle;
/// XSPH viscosity and vorticity confinement.
pub mod refine;
/// The PBF constraint solver.
pub mod solver;

pub use collision::{elastic_exchange, resolve_elastic_collisions, DiscreteSolver, DiscreteStats};
pub use config::{ConfigError, RefinementConfig, SimConfig};
pub use kernels::{Poly6, Spiky};
pub use particle::{Particle, ParticleSet};
pub use solver::{PbfSolver, StepStats};

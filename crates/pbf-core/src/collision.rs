// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Discrete mode: ballistic integration, wall bounces and pairwise
//! equal-mass elastic collisions.
//!
//! This is an alternative to [`PbfSolver`](crate::PbfSolver) over the same
//! particles and index; a frame uses one or the other, never both.

use pbf_geom::{Aabb, ProxyHandle, SpatialIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::config::{ConfigError, SimConfig};
use crate::particle::{Particle, ParticleSet};

/// Upper bound of the random offset applied after a wall bounce.
pub const WALL_JITTER: f64 = 1e-4;

/// Squared center distance below which two particles are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1e-12;

/// Summary of one discrete step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscreteStats {
    /// Particles advanced.
    pub particles: usize,
    /// Axis reflections off the domain walls.
    pub wall_bounces: usize,
    /// Pairs whose velocities were exchanged.
    pub collisions: usize,
    /// `update` calls that made the index restructure.
    pub index_restructures: usize,
}

/// Equal-mass elastic response between two discs.
///
/// Applies only when the discs overlap and are not already separating
/// (`x_ji · v_ji ≤ 0`). The impulse is
/// `Δv = (x_ji · v_ji / |x_ji|²) · x_ji`, added to `a` and subtracted from
/// `b`. Coincident centers are skipped. Returns `true` when velocities changed
/// hands.
pub fn elastic_exchange(a: &mut Particle, b: &mut Particle) -> bool {
    let x_ji = b.position - a.position;
    let v_ji = b.velocity - a.velocity;
    let dist2 = x_ji.length_squared();
    let reach = a.radius + b.radius;
    if dist2 >= reach * reach || dist2 < COINCIDENT_EPSILON {
        return false;
    }
    let approach = x_ji.dot(v_ji);
    if approach > 0.0 {
        return false;
    }
    let dv = x_ji * (approach / dist2);
    a.velocity += dv;
    b.velocity -= dv;
    true
}

/// Resolves every overlapping, approaching pair once.
///
/// Each particle queries a square centered on its position with half-width
/// `r_i + r_max`, which covers every center that can lie within `r_i + r_j`
/// on either backend. A pair is handled from its lower handle only. Velocities are updated in place as
/// pairs are visited, so later pairs see earlier responses. Returns the
/// number of pairs resolved.
pub fn resolve_elastic_collisions<I: SpatialIndex>(particles: &mut ParticleSet, index: &I) -> usize {
    let handles: Vec<ProxyHandle> = particles.handles().collect();
    let max_radius = particles.iter().map(|(_, p)| p.radius).fold(0.0, f64::max);
    let mut candidates = Vec::new();
    let mut resolved = 0;

    for i in handles {
        let Some(probe) = particles.get(i) else {
            continue;
        };
        let reach = probe.radius + max_radius;
        let window = Aabb::from_center_half_extents(probe.position, reach, reach);
        candidates.clear();
        index.query_into(&window, false, &mut candidates);
        candidates.sort_unstable();

        for &j in candidates.iter().filter(|&&j| j > i) {
            let (Some(mut a), Some(mut b)) = (particles.get(i).copied(), particles.get(j).copied()) else {
                continue;
            };
            if elastic_exchange(&mut a, &mut b) {
                if let Some(p) = particles.get_mut(i) {
                    p.velocity = a.velocity;
                }
                if let Some(p) = particles.get_mut(j) {
                    p.velocity = b.velocity;
                }
                resolved += 1;
            }
        }
    }
    resolved
}

/// Per-frame driver for the discrete mode.
#[derive(Debug, Clone)]
pub struct DiscreteSolver {
    config: SimConfig,
    rng: StdRng,
}

impl DiscreteSolver {
    /// Validates `config`. Only gravity, the domain and the particle radius
    /// are used.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { rng: StdRng::seed_from_u64(config.jitter_seed), config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Integrates, bounces off the walls, re-syncs the index and resolves
    /// collisions.
    ///
    /// # Panics
    /// Panics if `dt` is not finite and strictly positive.
    #[instrument(level = "debug", skip_all, fields(particles = particles.len(), dt = dt))]
    pub fn step<I: SpatialIndex>(&mut self, particles: &mut ParticleSet, index: &mut I, dt: f64) -> DiscreteStats {
        assert!(dt.is_finite() && dt > 0.0, "time step must be finite and > 0, got {dt}");

        let mut stats = DiscreteStats { particles: particles.len(), ..DiscreteStats::default() };
        for (&handle, particle) in particles.iter_mut() {
            particle.velocity += self.config.gravity * dt;
            particle.position += particle.velocity * dt;
            stats.wall_bounces += self.bounce(particle);
            if index.update(handle, &*particle) {
                stats.index_restructures += 1;
            }
        }

        stats.collisions = resolve_elastic_collisions(particles, index);
        debug!(
            bounces = stats.wall_bounces,
            collisions = stats.collisions,
            restructures = stats.index_restructures,
            "discrete step"
        );
        stats
    }

    /// Reflects the outward velocity component on each crossed wall.
    fn bounce(&mut self, particle: &mut Particle) -> usize {
        let (lo, hi) = self.config.wall_bounds(particle.radius);
        let mut bounces = 0;
        for axis in 0..2 {
            let (p, v) = (particle.position[axis], particle.velocity[axis]);
            if p < lo && v < 0.0 {
                particle.velocity[axis] = -v;
                particle.position[axis] = lo + self.rng.gen::<f64>() * WALL_JITTER;
                bounces += 1;
            } else if p > hi && v > 0.0 {
                particle.velocity[axis] = -v;
                particle.position[axis] = hi - self.rng.gen::<f64>() * WALL_JITTER;
                bounces += 1;
            }
        }
        bounces
    }
}

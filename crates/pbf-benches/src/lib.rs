// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared scene builders for the criterion benches.

use glam::DVec2;
use pbf_core::{Particle, ParticleSet};
use pbf_geom::SpatialIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used by every bench so inputs are identical across runs.
pub const BENCH_SEED: u64 = 0x5042_465f_6265_6e63;

/// Uniformly scattered points in `[0, extent]²`.
#[must_use]
pub fn scatter(n: usize, extent: f64) -> Vec<DVec2> {
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);
    (0..n).map(|_| DVec2::new(rng.gen::<f64>() * extent, rng.gen::<f64>() * extent)).collect()
}

/// Square block of `n` particles spaced `2 · radius` apart, starting at `(radius, radius)`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn block<I: SpatialIndex>(n: usize, radius: f64, index: &mut I) -> ParticleSet {
    let per_row = (n as f64).sqrt().ceil().max(1.0) as usize;
    let mut particles = ParticleSet::new();
    for k in 0..n {
        let (i, j) = ((k % per_row) as f64, (k / per_row) as f64);
        let p = Particle::new(DVec2::new(radius + 2.0 * radius * i, radius + 2.0 * radius * j), radius);
        particles.spawn(index, p);
    }
    particles
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use glam::DVec2;
use pbf_core::{Particle, ParticleSet};
use pbf_geom::SpatialIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Row-major lattice generator.
///
/// Positions advance by `step` along x and wrap to a new row after
/// `per_row` particles. Each coordinate is clamped into `[0, clamp_max]`;
/// the solver's boundary projection pulls anything seeded on a wall back
/// inside on the first frame.
#[derive(Debug, Clone)]
pub struct LatticeSeeder {
    origin: DVec2,
    step: f64,
    per_row: u32,
    clamp_max: f64,
    max_speed: f64,
    cursor: u32,
    rng: StdRng,
}

impl LatticeSeeder {
    /// Default scene: spacing `2R`, 15 per row, origin `(0, 10)`, clamped to
    /// 25, initial horizontal speed in `[0, 5)`.
    #[must_use]
    pub fn new(radius: f64, seed: u64) -> Self {
        Self {
            origin: DVec2::new(0.0, 10.0),
            step: 2.0 * radius,
            per_row: 15,
            clamp_max: 25.0,
            max_speed: 5.0,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Same lattice with a different row width.
    #[must_use]
    pub fn per_row(mut self, per_row: u32) -> Self {
        self.per_row = per_row.max(1);
        self
    }

    /// Next lattice position.
    pub fn next_position(&mut self) -> DVec2 {
        let (i, j) = (self.cursor % self.per_row, self.cursor / self.per_row);
        self.cursor += 1;
        let raw = self.origin + DVec2::new(f64::from(i), f64::from(j)) * self.step;
        raw.clamp(DVec2::ZERO, DVec2::splat(self.clamp_max))
    }

    /// Random rightward launch velocity.
    pub fn next_velocity(&mut self) -> DVec2 {
        DVec2::new(self.rng.gen::<f64>() * self.max_speed, 0.0)
    }

    /// Spawns `count` particles into `particles` and `index`.
    pub fn populate<I: SpatialIndex>(
        &mut self,
        particles: &mut ParticleSet,
        index: &mut I,
        count: u32,
        radius: f64,
    ) {
        for _ in 0..count {
            let particle = Particle::new(self.next_position(), radius).with_velocity(self.next_velocity());
            particles.spawn(index, particle);
        }
    }
}

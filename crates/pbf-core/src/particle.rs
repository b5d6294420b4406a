// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Particle records owned by the driver.
//!
//! The spatial index hands out a [`ProxyHandle`] per particle and keeps only
//! the bound or point it was last given. [`ParticleSet`] is the other half:
//! it maps those handles back to the particle state. Iteration order is the
//! handle order, so every pass over the set is deterministic.

use std::collections::btree_map::{self, BTreeMap};

use glam::DVec2;
use pbf_geom::{Aabb, Bounded, ProxyHandle, SpatialIndex};

/// A disc-shaped particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Center.
    pub position: DVec2,
    /// Linear velocity.
    pub velocity: DVec2,
    /// Disc radius; positive.
    pub radius: f64,
}

impl Particle {
    /// Particle at rest.
    #[must_use]
    pub fn new(position: DVec2, radius: f64) -> Self {
        Self { position, velocity: DVec2::ZERO, radius }
    }

    /// Same particle with `velocity`.
    #[must_use]
    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }
}

impl Bounded for Particle {
    fn point(&self) -> DVec2 {
        self.position
    }

    fn aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.radius, self.radius)
    }
}

/// Handle-keyed particle store.
#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    particles: BTreeMap<ProxyHandle, Particle>,
}

impl ParticleSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `particle` with `index` and stores it under the new handle.
    pub fn spawn<I: SpatialIndex>(&mut self, index: &mut I, particle: Particle) -> ProxyHandle {
        let handle = index.add(&particle);
        let previous = self.particles.insert(handle, particle);
        assert!(previous.is_none(), "index reissued live handle {handle}");
        handle
    }

    /// Removes the particle from both the set and `index`.
    ///
    /// Returns `None` (and leaves `index` untouched) if `handle` is unknown.
    pub fn despawn<I: SpatialIndex>(&mut self, index: &mut I, handle: ProxyHandle) -> Option<Particle> {
        let particle = self.particles.remove(&handle)?;
        index.remove(handle);
        Some(particle)
    }

    /// Particle stored under `handle`.
    #[must_use]
    pub fn get(&self, handle: ProxyHandle) -> Option<&Particle> {
        self.particles.get(&handle)
    }

    /// Mutable particle stored under `handle`.
    pub fn get_mut(&mut self, handle: ProxyHandle) -> Option<&mut Particle> {
        self.particles.get_mut(&handle)
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = ProxyHandle> + '_ {
        self.particles.keys().copied()
    }

    /// `(handle, particle)` pairs in ascending handle order.
    pub fn iter(&self) -> btree_map::Iter<'_, ProxyHandle, Particle> {
        self.particles.iter()
    }

    /// Mutable `(handle, particle)` pairs in ascending handle order.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, ProxyHandle, Particle> {
        self.particles.iter_mut()
    }
}

impl<'a> IntoIterator for &'a ParticleSet {
    type Item = (&'a ProxyHandle, &'a Particle);
    type IntoIter = btree_map::Iter<'a, ProxyHandle, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::ops::Index<ProxyHandle> for ParticleSet {
    type Output = Particle;

    fn index(&self, handle: ProxyHandle) -> &Particle {
        match self.particles.get(&handle) {
            Some(p) => p,
            None => unreachable!("no particle stored under {handle}"),
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Discrete elastic mode over a live index.

use glam::DVec2;
use pbf_core::{elastic_exchange, resolve_elastic_collisions, DiscreteSolver, Particle, ParticleSet, SimConfig};
use pbf_geom::{DynamicBoundsTree, GridSpatialIndex, SpatialIndex};
use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

const R: f64 = 0.8;

#[test]
fn approaching_overlap_ends_separating() {
    let mut tree = DynamicBoundsTree::new(2.5 * R).unwrap();
    let mut set = ParticleSet::new();
    let a = set.spawn(&mut tree, Particle::new(DVec2::new(10.0, 10.0), R).with_velocity(DVec2::new(2.0, 0.5)));
    let b = set.spawn(&mut tree, Particle::new(DVec2::new(11.2, 10.3), R).with_velocity(DVec2::new(-2.0, -0.5)));

    assert_eq!(resolve_elastic_collisions(&mut set, &tree), 1);

    let x_ji = set[b].position - set[a].position;
    let v_ji = set[b].velocity - set[a].velocity;
    assert!(x_ji.dot(v_ji) >= 0.0);

    // Already separating: a second pass leaves them alone.
    assert_eq!(resolve_elastic_collisions(&mut set, &tree), 0);
}

/// Two particles `gap` apart on x, moving toward each other.
fn approaching_pair<I: SpatialIndex>(index: &mut I, gap: f64, r_a: f64, r_b: f64) -> ParticleSet {
    let mut set = ParticleSet::new();
    set.spawn(index, Particle::new(DVec2::new(10.0, 10.0), r_a).with_velocity(DVec2::new(1.0, 0.0)));
    set.spawn(index, Particle::new(DVec2::new(10.0 + gap, 10.0), r_b).with_velocity(DVec2::new(-1.0, 0.0)));
    set
}

#[test]
fn near_contact_pair_is_found_on_both_backends() {
    let gap = 1.8 * R;

    let mut tree = DynamicBoundsTree::new(2.5 * R).unwrap();
    let mut set = approaching_pair(&mut tree, gap, R, R);
    assert_eq!(resolve_elastic_collisions(&mut set, &tree), 1);

    let mut grid = GridSpatialIndex::new(5.0).unwrap();
    let mut set = approaching_pair(&mut grid, gap, R, R);
    assert_eq!(resolve_elastic_collisions(&mut set, &grid), 1);
}

#[test]
fn grid_reach_covers_the_largest_radius() {
    // Small particle first, so the pair is handled from the small one's query.
    let mut grid = GridSpatialIndex::new(5.0).unwrap();
    let mut set = approaching_pair(&mut grid, 2.3, 0.5, 2.0);
    assert_eq!(resolve_elastic_collisions(&mut set, &grid), 1);

    let mut grid = GridSpatialIndex::new(5.0).unwrap();
    let mut set = approaching_pair(&mut grid, 2.6, 0.5, 2.0);
    assert_eq!(resolve_elastic_collisions(&mut set, &grid), 0);
}

#[test]
fn each_pair_is_resolved_once_per_pass() {
    let mut tree = DynamicBoundsTree::new(2.5 * R).unwrap();
    let mut set = ParticleSet::new();
    set.spawn(&mut tree, Particle::new(DVec2::new(5.0, 5.0), R).with_velocity(DVec2::new(1.0, 0.0)));
    set.spawn(&mut tree, Particle::new(DVec2::new(6.0, 5.0), R).with_velocity(DVec2::new(-1.0, 0.0)));
    set.spawn(&mut tree, Particle::new(DVec2::new(20.0, 20.0), R));

    assert_eq!(resolve_elastic_collisions(&mut set, &tree), 1);
}

#[test]
fn discrete_run_keeps_particles_near_the_box() {
    let cfg = SimConfig::default();
    let mut solver = DiscreteSolver::new(cfg).unwrap();
    let mut tree = DynamicBoundsTree::new(2.5 * R).unwrap();
    let mut set = ParticleSet::new();
    for n in 0..45_u32 {
        let pos = DVec2::new(2.0 + f64::from(n % 15) * 2.0 * R, 10.0 + f64::from(n / 15) * 2.0 * R);
        set.spawn(&mut tree, Particle::new(pos, R).with_velocity(DVec2::new(f64::from(n % 5), 0.0)));
    }

    let mut collisions = 0;
    for _ in 0..120 {
        let stats = solver.step(&mut set, &mut tree, 1.0 / 24.0);
        assert_eq!(stats.particles, 45);
        collisions += stats.collisions;
    }
    assert!(collisions > 0);
    tree.validate().expect("tree consistent");

    // A bounce only fires on outward motion, so a particle can end a frame
    // at most one step's travel past a wall.
    for (h, p) in &set {
        assert!(p.position.is_finite(), "{h} diverged");
        let slack = p.velocity.length() / 24.0 + 1e-3;
        assert!(p.position.min_element() > R - slack, "{h}: {p:?}");
        assert!(p.position.max_element() < cfg.domain_extent - R + slack, "{h}: {p:?}");
    }
}

#[test]
fn proptest_seed_pinned_exchange_conserves_momentum_and_energy() {
    const SEED_BYTES: [u8; 32] = [
        0x9b, 0x44, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0,
    ];

    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    let mut runner = TestRunner::new_with_rng(PropConfig::default(), rng);
    let offset = (-1.5..1.5f64, -1.5..1.5f64);
    let velocity = (-5.0..5.0f64, -5.0..5.0f64);

    runner
        .run(&(offset, velocity.clone(), velocity), |((dx, dy), (ax, ay), (bx, by))| {
            let mut a = Particle::new(DVec2::ZERO, R).with_velocity(DVec2::new(ax, ay));
            let mut b = Particle::new(DVec2::new(dx, dy), R).with_velocity(DVec2::new(bx, by));
            let momentum = a.velocity + b.velocity;
            let energy = a.velocity.length_squared() + b.velocity.length_squared();

            let exchanged = elastic_exchange(&mut a, &mut b);

            prop_assert!((a.velocity + b.velocity - momentum).length() < 1e-9);
            let after = a.velocity.length_squared() + b.velocity.length_squared();
            prop_assert!((after - energy).abs() < 1e-9 * energy.max(1.0));
            if exchanged {
                // The normal component of the relative velocity flips sign.
                prop_assert!(b.position.dot(b.velocity - a.velocity) >= -1e-9);
            }
            Ok(())
        })
        .expect("exchange is conservative for all pinned cases");
}

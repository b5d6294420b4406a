// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the uniform grid index.

use glam::DVec2;
use pbf_geom::{Aabb, GridSpatialIndex, ProxyHandle, SpatialIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn points_in_separate_cells_query_independently() {
    let mut grid = GridSpatialIndex::new(5.0).expect("cell size");
    let a = grid.add(&DVec2::new(1.0, 1.0));
    let b = grid.add(&DVec2::new(6.0, 1.0));

    assert_ne!(grid.cell_of(DVec2::new(1.0, 1.0)), grid.cell_of(DVec2::new(6.0, 1.0)));
    assert_eq!(grid.bucket_count(), 2);
    assert_eq!(grid.query(DVec2::ZERO, DVec2::splat(4.0)), vec![a]);

    let mut both = grid.query(DVec2::ZERO, DVec2::new(7.0, 2.0));
    both.sort();
    assert_eq!(both, vec![a, b]);
}

#[test]
fn queries_match_brute_force_exactly() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut grid = GridSpatialIndex::new(2.5).expect("cell size");
    let mut points: Vec<(ProxyHandle, DVec2)> = Vec::new();

    for _ in 0..400 {
        let p = DVec2::new(rng.gen_range(-30.0..30.0), rng.gen_range(-30.0..30.0));
        points.push((grid.add(&p), p));
    }
    // Move a third of them, remove a few.
    for (handle, p) in points.iter_mut().step_by(3) {
        *p += DVec2::new(rng.gen_range(-7.0..7.0), rng.gen_range(-7.0..7.0));
        assert!(grid.update(*handle, &*p));
    }
    for (handle, _) in points.drain(..20) {
        grid.remove(handle);
    }
    grid.validate().expect("valid grid");

    for _ in 0..200 {
        let a = DVec2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
        let b = a + DVec2::new(rng.gen_range(-12.0..12.0), rng.gen_range(-12.0..12.0));
        let window = Aabb::from_corners(a, b);

        let mut hits = grid.query(a, b);
        hits.sort();
        let mut expected: Vec<_> = points
            .iter()
            .filter(|(_, p)| window.contains_point(*p))
            .map(|(h, _)| *h)
            .collect();
        expected.sort();
        assert_eq!(hits, expected);
    }
}

#[test]
fn boundary_points_are_included() {
    let mut grid = GridSpatialIndex::new(1.0).expect("cell size");
    let edge = grid.add(&DVec2::new(2.0, 2.0));
    assert_eq!(grid.query(DVec2::ZERO, DVec2::splat(2.0)), vec![edge]);
    assert_eq!(grid.query(DVec2::splat(2.0), DVec2::splat(3.0)), vec![edge]);
}

#[test]
fn insert_then_remove_restores_empty_state() {
    let mut grid = GridSpatialIndex::new(5.0).expect("cell size");
    let capacity = grid.capacity();
    let free_before = grid.free_slots();

    let h = grid.add(&DVec2::new(3.0, 3.0));
    grid.remove(h);

    assert_eq!(grid.bucket_count(), 0);
    assert!(grid.is_empty());
    assert_eq!(grid.capacity(), capacity);
    assert_eq!(grid.free_slots(), free_before);
}

#[test]
fn pool_accounting_holds_through_growth_and_churn() {
    let mut grid = GridSpatialIndex::new(1.0).expect("cell size");
    let mut handles = Vec::new();
    for i in 0..150_u32 {
        handles.push(grid.add(&DVec2::new(f64::from(i % 13), f64::from(i / 13))));
        assert_eq!(grid.free_count() + grid.len(), grid.capacity());
    }
    assert_eq!(grid.capacity(), 256);
    for h in handles.drain(..).step_by(2) {
        grid.remove(h);
        assert_eq!(grid.free_count() + grid.len(), grid.capacity());
    }
    assert_eq!(grid.len(), 75);
    grid.validate().expect("valid grid");
}

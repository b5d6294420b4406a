// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the dynamic bounds tree.

use std::collections::BTreeMap;

use glam::DVec2;
use pbf_geom::{Aabb, DynamicBoundsTree, ProxyHandle, SpatialIndex};
use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

fn lattice_cell(i: u32, j: u32) -> Aabb {
    let min = DVec2::new(f64::from(i), f64::from(j));
    Aabb::new(min, min + DVec2::ONE)
}

fn sorted(mut v: Vec<ProxyHandle>) -> Vec<ProxyHandle> {
    v.sort();
    v
}

#[test]
fn lattice_strict_query_returns_inner_block() {
    let mut tree = DynamicBoundsTree::new(0.0).expect("margin");
    let mut by_cell = BTreeMap::new();
    for i in 0..10 {
        for j in 0..10 {
            by_cell.insert((i, j), tree.add(&lattice_cell(i, j)));
        }
    }
    tree.validate().expect("valid lattice tree");

    let window = Aabb::new(DVec2::splat(3.0), DVec2::splat(5.0));
    let strict = sorted(tree.query_aabb(&window, true));
    let expected = sorted([(3, 3), (3, 4), (4, 3), (4, 4)].iter().map(|k| by_cell[k]).collect());
    assert_eq!(strict, expected);

    // Non-strict also picks up every box touching the window's edges.
    let loose = sorted(tree.query(DVec2::splat(5.0), DVec2::splat(3.0)));
    let touching = sorted(
        by_cell
            .iter()
            .filter(|((i, j), _)| (2..=5).contains(i) && (2..=5).contains(j))
            .map(|(_, h)| *h)
            .collect(),
    );
    assert_eq!(loose, touching);
    assert_eq!(loose.len(), 16);
}

#[test]
fn insert_then_remove_restores_empty_state() {
    let mut tree = DynamicBoundsTree::new(0.5).expect("margin");
    let capacity = tree.capacity();
    let free_before = tree.free_slots();

    let h = tree.add(&lattice_cell(1, 1));
    assert_eq!(tree.len(), 1);
    tree.remove(h);

    assert!(tree.root_ref().is_none());
    assert!(tree.is_empty());
    assert_eq!(tree.capacity(), capacity);
    assert_eq!(tree.free_slots(), free_before);
    tree.validate().expect("valid empty tree");
}

#[test]
fn pool_grows_past_initial_capacity_without_invalidating_handles() {
    let mut tree = DynamicBoundsTree::new(0.1).expect("margin");
    let initial = tree.capacity();
    let handles: Vec<_> = (0..100).map(|i| tree.add(&lattice_cell(i, i % 7))).collect();
    assert!(tree.capacity() > initial);
    assert_eq!(tree.node_count(), 2 * handles.len() - 1);
    assert_eq!(tree.free_count() + tree.node_count(), tree.capacity());
    for (i, h) in (0..100).zip(&handles) {
        let fat = tree.fat_aabb(*h).copied().expect("live leaf");
        assert!(fat.contains(&lattice_cell(i, i % 7)));
    }
    assert_eq!(tree.leaves().count(), 100);
    assert_eq!(tree.internal_bounds().count(), 99);
    tree.validate().expect("valid grown tree");
}

#[test]
fn margin_absorbs_small_motion() {
    let mut tree = DynamicBoundsTree::new(0.5).expect("margin");
    let h = tree.add(&lattice_cell(0, 0));
    let nudged = Aabb::new(DVec2::new(0.3, -0.2), DVec2::new(1.3, 0.8));
    assert!(!tree.update(h, &nudged));
    let far = Aabb::new(DVec2::new(3.0, 0.0), DVec2::new(4.0, 1.0));
    assert!(tree.update(h, &far));
    assert_eq!(tree.query(DVec2::new(3.5, 0.5), DVec2::new(3.5, 0.5)), vec![h]);
}

#[derive(Debug, Clone)]
enum Op {
    Add { x: f64, y: f64, w: f64, h: f64 },
    Remove(usize),
    Move { slot: usize, dx: f64, dy: f64 },
    Query { x: f64, y: f64, w: f64, h: f64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let coord = -50.0..50.0f64;
    let extent = 0.0..8.0f64;
    prop_oneof![
        4 => (coord.clone(), coord.clone(), extent.clone(), extent.clone())
            .prop_map(|(x, y, w, h)| Op::Add { x, y, w, h }),
        2 => any::<usize>().prop_map(Op::Remove),
        2 => (any::<usize>(), -6.0..6.0f64, -6.0..6.0f64)
            .prop_map(|(slot, dx, dy)| Op::Move { slot, dx, dy }),
        2 => (coord.clone(), coord, extent.clone(), extent)
            .prop_map(|(x, y, w, h)| Op::Query { x, y, w, h }),
    ]
}

#[test]
fn proptest_seed_pinned_tree_invariants() {
    const SEED_BYTES: [u8; 32] = [
        0x7e, 0x1f, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0,
    ];

    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    let mut runner = TestRunner::new_with_rng(PropConfig::default(), rng);

    runner
        .run(&prop::collection::vec(op_strategy(), 1..120), |ops| {
            let mut tree = DynamicBoundsTree::new(1.0).expect("margin");
            // Tight bounds as the caller last reported them.
            let mut live: BTreeMap<ProxyHandle, Aabb> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Add { x, y, w, h } => {
                        let b = Aabb::new(DVec2::new(x, y), DVec2::new(x + w, y + h));
                        let handle = tree.add(&b);
                        prop_assert!(live.insert(handle, b).is_none());
                    }
                    Op::Remove(slot) if !live.is_empty() => {
                        let handle = *live.keys().nth(slot % live.len()).expect("slot");
                        tree.remove(handle);
                        live.remove(&handle);
                        prop_assert!(!tree.contains(handle));
                    }
                    Op::Move { slot, dx, dy } if !live.is_empty() => {
                        let handle = *live.keys().nth(slot % live.len()).expect("slot");
                        let b = live[&handle];
                        let moved = Aabb::new(b.min() + DVec2::new(dx, dy), b.max() + DVec2::new(dx, dy));
                        tree.update(handle, &moved);
                        live.insert(handle, moved);
                        prop_assert!(tree.fat_aabb(handle).expect("leaf").contains(&moved));
                    }
                    Op::Query { x, y, w, h } => {
                        let window = Aabb::new(DVec2::new(x, y), DVec2::new(x + w, y + h));
                        let hits = tree.query_aabb(&window, false);
                        for (handle, b) in &live {
                            if window.overlaps(b) {
                                prop_assert!(hits.contains(handle), "missed {handle}");
                            }
                        }
                    }
                    Op::Remove(_) | Op::Move { .. } => {}
                }

                prop_assert_eq!(tree.validate(), Ok(()));
                prop_assert_eq!(tree.len(), live.len());
                prop_assert_eq!(tree.free_count() + tree.node_count(), tree.capacity());
            }
            Ok(())
        })
        .expect("tree invariants hold for all pinned cases");
}

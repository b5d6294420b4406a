// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Uniform grid keyed by integer cell coordinates.
//!
//! Entries are points. Each one lives in exactly one bucket, the bucket of
//! `cell_of(point)`; buckets that empty out are dropped from the map.

use glam::DVec2;
use rustc_hash::FxHashMap;

use crate::broad::pool::NodePool;
use crate::broad::{Bounded, ProxyHandle, SpatialIndex};
use crate::error::{GeomError, InvariantViolation};
use crate::types::aabb::Aabb;

/// Integer cell coordinates `(i, j)`.
pub type CellKey = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct GridNode {
    cell: CellKey,
    point: DVec2,
}

/// Hash-bucketed uniform grid with exact point queries.
#[derive(Debug, Clone)]
pub struct GridSpatialIndex {
    cell_size: f64,
    pool: NodePool<GridNode>,
    buckets: FxHashMap<CellKey, Vec<usize>>,
}

impl GridSpatialIndex {
    /// Creates an empty grid with square cells of side `cell_size`.
    pub fn new(cell_size: f64) -> Result<Self, GeomError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GeomError::InvalidCellSize(cell_size));
        }
        Ok(Self { cell_size, pool: NodePool::default(), buckets: FxHashMap::default() })
    }

    /// Side length of one cell.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Cell containing `p`. Negative coordinates floor toward −∞.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_of(&self, p: DVec2) -> CellKey {
        let c = (p / self.cell_size).floor();
        (c.x as i64, c.y as i64)
    }

    /// Free slots in the order the next allocations will take them.
    #[must_use]
    pub fn free_slots(&self) -> Vec<usize> {
        self.pool.free_indices()
    }

    /// Point last stored for `handle`.
    #[must_use]
    pub fn point(&self, handle: ProxyHandle) -> Option<DVec2> {
        self.pool.get(handle.index()).map(|node| node.point)
    }

    /// Checks bucket membership, cached cells and pool accounting. O(n).
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let free = self.pool.free_len();
        let active = self.pool.active();
        let capacity = self.pool.capacity();
        if free + active != capacity {
            return Err(InvariantViolation::PoolAccounting { free, active, capacity });
        }

        let mut seen: FxHashMap<usize, usize> = FxHashMap::default();
        for (cell, bucket) in &self.buckets {
            if bucket.is_empty() {
                return Err(InvariantViolation::EmptyBucket(cell.0, cell.1));
            }
            for &index in bucket {
                let Some(node) = self.pool.get(index) else {
                    return Err(InvariantViolation::BucketMembership { handle: index, occurrences: 0 });
                };
                if node.cell != *cell {
                    return Err(InvariantViolation::StaleCell(index));
                }
                *seen.entry(index).or_default() += 1;
            }
        }

        for (index, node) in self.pool.iter() {
            if node.cell != self.cell_of(node.point) {
                return Err(InvariantViolation::StaleCell(index));
            }
            let occurrences = seen.get(&index).copied().unwrap_or(0);
            if occurrences != 1 {
                return Err(InvariantViolation::BucketMembership { handle: index, occurrences });
            }
        }
        Ok(())
    }

    #[cfg(feature = "validate")]
    fn debug_validate(&self) {
        if let Err(violation) = self.validate() {
            unreachable!("grid index corrupted: {violation}");
        }
    }

    #[cfg(not(feature = "validate"))]
    #[allow(clippy::unused_self)]
    fn debug_validate(&self) {}

    fn expect_active(&self, handle: ProxyHandle) -> usize {
        let index = handle.index();
        assert!(self.pool.get(index).is_some(), "handle {handle} is not an active grid entry");
        index
    }

    fn link(&mut self, index: usize, cell: CellKey) {
        self.buckets.entry(cell).or_default().push(index);
    }

    fn unlink(&mut self, index: usize, cell: CellKey) {
        let Some(bucket) = self.buckets.get_mut(&cell) else {
            unreachable!("entry {index} points at missing bucket {cell:?}");
        };
        let Some(pos) = bucket.iter().position(|&i| i == index) else {
            unreachable!("entry {index} missing from bucket {cell:?}");
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&cell);
        }
    }
}

impl SpatialIndex for GridSpatialIndex {
    fn add<B: Bounded + ?Sized>(&mut self, item: &B) -> ProxyHandle {
        let point = item.point();
        let cell = self.cell_of(point);
        let index = self.pool.allocate(GridNode { cell, point });
        self.link(index, cell);
        self.debug_validate();
        ProxyHandle::from_index(index)
    }

    fn remove(&mut self, handle: ProxyHandle) {
        let index = self.expect_active(handle);
        let node = self.pool.release(index);
        self.unlink(index, node.cell);
        self.debug_validate();
    }

    fn update<B: Bounded + ?Sized>(&mut self, handle: ProxyHandle, item: &B) -> bool {
        let index = self.expect_active(handle);
        let point = item.point();
        let cell = self.cell_of(point);
        let old = self.pool.at(index).cell;
        if old != cell {
            self.unlink(index, old);
            self.link(index, cell);
        }
        *self.pool.at_mut(index) = GridNode { cell, point };
        self.debug_validate();
        true
    }

    fn query_into(&self, aabb: &Aabb, _strictly_contained: bool, out: &mut Vec<ProxyHandle>) {
        let (lo_i, lo_j) = self.cell_of(aabb.min());
        let (hi_i, hi_j) = self.cell_of(aabb.max());
        let accept = |bucket: &[usize], out: &mut Vec<ProxyHandle>| {
            out.extend(
                bucket
                    .iter()
                    .filter(|&&index| aabb.contains_point(self.pool.at(index).point))
                    .map(|&index| ProxyHandle::from_index(index)),
            );
        };

        // Wide boxes visit the occupied buckets instead of every cell in range.
        let span = (i128::from(hi_i) - i128::from(lo_i) + 1).saturating_mul(i128::from(hi_j) - i128::from(lo_j) + 1);
        if span > i128::try_from(self.buckets.len()).unwrap_or(i128::MAX) {
            for (&(i, j), bucket) in &self.buckets {
                if (lo_i..=hi_i).contains(&i) && (lo_j..=hi_j).contains(&j) {
                    accept(bucket.as_slice(), out);
                }
            }
            return;
        }

        for i in lo_i..=hi_i {
            for j in lo_j..=hi_j {
                if let Some(bucket) = self.buckets.get(&(i, j)) {
                    accept(bucket.as_slice(), out);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.pool.active()
    }

    fn contains(&self, handle: ProxyHandle) -> bool {
        self.pool.get(handle.index()).is_some()
    }

    fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    fn free_count(&self) -> usize {
        self.pool.free_len()
    }
}

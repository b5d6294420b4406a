// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Broad-phase spatial indices and their shared query contract.
//!
//! Contract (applies to every [`SpatialIndex`] implementation):
//! - Handles are pool slot indices wrapped in [`ProxyHandle`]. A handle stays
//!   valid until `remove`, including across `update` and pool growth.
//! - Queries never miss an entry whose indexed bound (tree: fattened box, grid:
//!   point) overlaps the query box. The grid is exact; the tree may return
//!   extra candidates because of fattening.
//! - Overlap is inclusive on edges.
//! - The index never owns caller data. It keeps only the bound or point it was
//!   last handed through [`Bounded`]; the handle is the caller's key back into
//!   its own store.

use glam::DVec2;

use crate::types::aabb::Aabb;

#[doc = "Uniform grid hash index."]
pub mod grid;
#[doc = "Tree insertion heuristics."]
pub mod policy;
pub(crate) mod pool;
#[doc = "Pooled, self-balancing bounding-volume tree."]
pub mod tree;

/// Stable reference to an entry in a spatial index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyHandle(usize);

impl ProxyHandle {
    /// Wraps a raw slot index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Raw slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-owned data that can be placed in a spatial index.
pub trait Bounded {
    /// Representative point (the grid keys entries by it).
    fn point(&self) -> DVec2;
    /// Tight bound (the tree fattens and stores it).
    fn aabb(&self) -> Aabb;
}

impl Bounded for Aabb {
    fn point(&self) -> DVec2 {
        self.center()
    }

    fn aabb(&self) -> Aabb {
        *self
    }
}

impl Bounded for DVec2 {
    fn point(&self) -> DVec2 {
        *self
    }

    fn aabb(&self) -> Aabb {
        Aabb::new(*self, *self)
    }
}

/// Query contract shared by [`tree::DynamicBoundsTree`] and
/// [`grid::GridSpatialIndex`].
///
/// Not safe for concurrent mutation; `&mut self` on the mutators leaves a
/// single writer at a time.
pub trait SpatialIndex {
    /// Inserts `item` and returns its handle.
    fn add<B: Bounded + ?Sized>(&mut self, item: &B) -> ProxyHandle;

    /// Removes an active entry.
    ///
    /// # Panics
    /// Panics if `handle` is not active.
    fn remove(&mut self, handle: ProxyHandle);

    /// Re-syncs the entry to `item`'s current bound/point.
    ///
    /// Returns `true` when the index had to restructure for the move.
    ///
    /// # Panics
    /// Panics if `handle` is not active.
    fn update<B: Bounded + ?Sized>(&mut self, handle: ProxyHandle, item: &B) -> bool;

    /// Appends to `out` every entry whose indexed bound overlaps `aabb`.
    ///
    /// With `strictly_contained`, only entries whose indexed bound lies fully
    /// inside `aabb` are reported.
    fn query_into(&self, aabb: &Aabb, strictly_contained: bool, out: &mut Vec<ProxyHandle>);

    /// Returns every entry whose indexed bound overlaps `aabb`.
    fn query_aabb(&self, aabb: &Aabb, strictly_contained: bool) -> Vec<ProxyHandle> {
        let mut out = Vec::new();
        self.query_into(aabb, strictly_contained, &mut out);
        out
    }

    /// Queries the box spanned by two corners given in any order.
    fn query(&self, a: DVec2, b: DVec2) -> Vec<ProxyHandle> {
        self.query_aabb(&Aabb::from_corners(a, b), false)
    }

    /// Number of entries.
    fn len(&self) -> usize;

    /// Returns `true` when the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `handle` refers to a live entry.
    fn contains(&self, handle: ProxyHandle) -> bool;

    /// Total node slots owned by the pool.
    fn capacity(&self) -> usize;

    /// Length of the pool's free list.
    fn free_count(&self) -> usize;
}

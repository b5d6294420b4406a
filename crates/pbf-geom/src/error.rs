// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for index construction and structural validation.

use thiserror::Error;

/// Rejected construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeomError {
    /// The tree enlargement margin must be finite and non-negative.
    #[error("invalid fattening margin: {0} (expected finite and >= 0)")]
    InvalidMargin(f64),
    /// The grid cell size must be finite and strictly positive.
    #[error("invalid cell size: {0} (expected finite and > 0)")]
    InvalidCellSize(f64),
}

/// Structural defect found by a `validate()` pass.
///
/// These are programming errors in the index itself; the mutating operations
/// never produce them unless the implementation is broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root node records a parent.
    #[error("root {0} has a parent")]
    RootHasParent(usize),
    /// A child does not point back at the node that owns it.
    #[error("node {child} lists parent {found:?}, expected {expected}")]
    ParentMismatch {
        /// Child slot.
        child: usize,
        /// Owning internal node.
        expected: usize,
        /// Parent stored on the child.
        found: Option<usize>,
    },
    /// A child index refers to a free or out-of-range slot.
    #[error("node {parent} links to inactive slot {child}")]
    DanglingChild {
        /// Internal node holding the link.
        parent: usize,
        /// Slot it points to.
        child: usize,
    },
    /// Cached height disagrees with the recomputed height.
    #[error("node {node} caches height {cached}, structure says {computed}")]
    HeightMismatch {
        /// Internal node slot.
        node: usize,
        /// Stored height.
        cached: u32,
        /// Height derived from the children.
        computed: u32,
    },
    /// Cached bound is not the union of the descendants' leaf bounds.
    #[error("node {0} bound is not the union of its subtree")]
    BoundMismatch(usize),
    /// Reachable node count differs from the pool's active count.
    #[error("{reachable} nodes reachable from root but {active} active in pool")]
    Unreachable {
        /// Nodes found by walking from the root.
        reachable: usize,
        /// Nodes the pool reports as occupied.
        active: usize,
    },
    /// Leaf bookkeeping disagrees with the structure.
    #[error("leaf count {counted} differs from recorded {recorded}")]
    LeafCount {
        /// Leaves found in the structure.
        counted: usize,
        /// Leaves the index believes it holds.
        recorded: usize,
    },
    /// Free-list length plus active nodes does not equal capacity.
    #[error("free {free} + active {active} != capacity {capacity}")]
    PoolAccounting {
        /// Free-list length.
        free: usize,
        /// Active node count.
        active: usize,
        /// Slot capacity.
        capacity: usize,
    },
    /// A grid entry's cached cell is not the cell of its point.
    #[error("entry {0} is cached under a stale cell")]
    StaleCell(usize),
    /// An empty bucket was left in the bucket map.
    #[error("bucket ({0}, {1}) is empty but still mapped")]
    EmptyBucket(i64, i64),
    /// A grid entry is missing from, or duplicated across, the buckets.
    #[error("entry {handle} appears {occurrences} times in buckets")]
    BucketMembership {
        /// Entry slot.
        handle: usize,
        /// Number of buckets containing it.
        occurrences: usize,
    },
}

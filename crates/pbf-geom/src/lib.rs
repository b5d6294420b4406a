// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    rust_2018_idioms,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![doc = r"2D geometry primitives and broad-phase indices.

This crate provides:
- Axis-aligned bounding boxes (`Aabb`) over `glam::DVec2`.
- A pooled, self-balancing dynamic bounds tree (`DynamicBoundsTree`) with a
  pluggable insertion heuristic (`InsertionPolicy`).
- A uniform grid hash (`GridSpatialIndex`) with exact point queries.
- The `SpatialIndex` contract both backends implement, so callers can swap
  them without code changes.

Design notes:
- Handles are plain pool slot indices; they survive `update` and pool growth.
- The indices never own caller data; they keep only the last bound or point
  they were handed.
- `f64` throughout. Overlap and containment are inclusive on edges.
- Structural invariants can be checked with `validate()`; the `validate`
  feature runs that check after every index mutation.
"]

/// Spatial indices and the shared query contract.
pub mod broad;
/// Error types for construction and validation.
pub mod error;
/// Foundational geometric types.
pub mod types;

pub use broad::grid::GridSpatialIndex;
pub use broad::policy::{AreaCostPolicy, Descend, InsertionPolicy};
pub use broad::tree::{DynamicBoundsTree, NodeRef};
pub use broad::{Bounded, ProxyHandle, SpatialIndex};
pub use error::{GeomError, InvariantViolation};
pub use types::aabb::{Aabb, Axis};

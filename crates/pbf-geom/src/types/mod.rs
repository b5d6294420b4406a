// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core geometry value types.
//!
//! Overlap semantics are inclusive on edges so touching boxes count as
//! neighbors and queries never drop an entry sitting exactly on the boundary.

#[doc = "Axis-aligned bounding boxes."]
pub mod aabb;

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use glam::DVec2;

/// Coordinate axis selector for per-axis extents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal axis.
    X,
    /// Vertical axis.
    Y,
}

/// Axis-aligned bounding box in simulation space.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
/// - The only mutators are [`Aabb::inflate`], [`Aabb::union_in_place`] and
///   [`Aabb::as_union_of`]; everything else returns a fresh value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: DVec2,
    max: DVec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self { min: DVec2::ZERO, max: DVec2::ZERO }
    }
}

impl Aabb {
    /// Default tolerance used by [`Aabb::approx_eq`] callers.
    pub const EPSILON: f64 = 1e-10;

    /// Constructs an AABB from its minimum and maximum corners.
    ///
    /// # Panics
    /// Panics if any component of `min` is greater than its counterpart in `max`.
    #[must_use]
    pub fn new(min: DVec2, max: DVec2) -> Self {
        assert!(min.x <= max.x && min.y <= max.y, "invalid AABB: min > max");
        Self { min, max }
    }

    /// Builds the AABB spanned by two arbitrary corners (order-independent).
    #[must_use]
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Builds an AABB centered at `center` with half-extents `hx, hy`.
    #[must_use]
    pub fn from_center_half_extents(center: DVec2, hx: f64, hy: f64) -> Self {
        let he = DVec2::new(hx, hy);
        Self::new(center - he, center + he)
    }

    /// Returns the minimum corner.
    #[must_use]
    pub fn min(&self) -> DVec2 {
        self.min
    }

    /// Returns the maximum corner.
    #[must_use]
    pub fn max(&self) -> DVec2 {
        self.max
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> DVec2 {
        0.5 * (self.min + self.max)
    }

    /// Extent along `axis`.
    #[must_use]
    pub fn length(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.max.x - self.min.x,
            Axis::Y => self.max.y - self.min.y,
        }
    }

    /// Sum of the four edge lengths.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.length(Axis::X) + self.length(Axis::Y))
    }

    /// Enclosed area; the cost metric of the tree insertion heuristic.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.length(Axis::X) * self.length(Axis::Y)
    }

    /// Grows the box by `dx` horizontally and `dy` vertically on both sides.
    pub fn inflate(&mut self, dx: f64, dy: f64) -> &mut Self {
        let delta = DVec2::new(dx, dy);
        self.min -= delta;
        self.max += delta;
        self
    }

    /// Returns a copy grown by `dx`/`dy` on both sides.
    #[must_use]
    pub fn inflated(&self, dx: f64, dy: f64) -> Self {
        let mut out = *self;
        out.inflate(dx, dy);
        out
    }

    /// Returns the union of two AABBs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Expands `self` so that it also covers `other`.
    pub fn union_in_place(&mut self, other: &Self) -> &mut Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self
    }

    /// Overwrites `self` with the union of `a` and `b`.
    pub fn as_union_of(&mut self, a: &Self, b: &Self) -> &mut Self {
        self.min = a.min.min(b.min);
        self.max = a.max.max(b.max);
        self
    }

    /// Returns `true` if this AABB overlaps another (inclusive on edges).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        // Touching edges count as overlap so contact pairs do not flicker.
        !(other.max.x < self.min.x
            || self.max.x < other.min.x
            || other.max.y < self.min.y
            || self.max.y < other.min.y)
    }

    /// Returns `true` if `other` lies entirely inside `self` (inclusive).
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
    }

    /// Returns `true` if `p` lies inside or on the boundary of `self`.
    #[must_use]
    pub fn contains_point(&self, p: DVec2) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Component-wise comparison with an absolute tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let dmin = (self.min - other.min).abs();
        let dmax = (self.max - other.max).abs();
        dmin.x <= epsilon && dmin.y <= epsilon && dmax.x <= epsilon && dmax.y <= epsilon
    }

    /// Overlapping region of two boxes, or `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self { min: self.min.max(other.min), max: self.max.min(other.max) })
    }
}

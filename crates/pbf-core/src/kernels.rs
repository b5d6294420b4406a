// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Smoothing kernels with support radius `h`.
//!
//! Both kernels precompute their normalization once per `h`; evaluation is a
//! handful of multiplies.

use std::f64::consts::PI;

use glam::DVec2;

/// Squared lengths below this are treated as coincident points.
const COINCIDENT_EPSILON: f64 = 1e-12;

/// `W_poly6(r) = 315 / (64 π h⁹) · (h² − |r|²)³` inside the support, else 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poly6 {
    h: f64,
    h2: f64,
    factor: f64,
}

impl Poly6 {
    /// Builds the kernel for support radius `h > 0`.
    #[must_use]
    pub fn new(h: f64) -> Self {
        debug_assert!(h > 0.0, "kernel support must be positive");
        let h2 = h * h;
        let h9 = h2 * h2 * h2 * h2 * h;
        Self { h, h2, factor: 315.0 / (64.0 * PI) / h9 }
    }

    /// Support radius.
    #[must_use]
    pub fn h(&self) -> f64 {
        self.h
    }

    /// Kernel value at offset `r`.
    #[must_use]
    pub fn value(&self, r: DVec2) -> f64 {
        let r2 = r.length_squared();
        if r2 >= self.h2 {
            return 0.0;
        }
        let d = self.h2 - r2;
        self.factor * d * d * d
    }
}

/// Gradient of the spiky kernel.
///
/// `∇W(r) = −3 · 15 / (π h⁶) · (h − |r|)² · r / |r|` for `1e-12 ≤ |r|² < h²`,
/// zero otherwise. The extra factor of 3 is part of the tuned behavior and is
/// kept as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spiky {
    h: f64,
    h2: f64,
    factor: f64,
}

impl Spiky {
    /// Builds the kernel for support radius `h > 0`.
    #[must_use]
    pub fn new(h: f64) -> Self {
        debug_assert!(h > 0.0, "kernel support must be positive");
        let h3 = h * h * h;
        Self { h, h2: h * h, factor: 15.0 / PI / (h3 * h3) }
    }

    /// Support radius.
    #[must_use]
    pub fn h(&self) -> f64 {
        self.h
    }

    /// Gradient at offset `r`; the zero vector outside the support or at `r ≈ 0`.
    #[must_use]
    pub fn gradient(&self, r: DVec2) -> DVec2 {
        let r2 = r.length_squared();
        if r2 >= self.h2 || r2 < COINCIDENT_EPSILON {
            return DVec2::ZERO;
        }
        let len = r2.sqrt();
        let falloff = self.h - len;
        r * (-3.0 * self.factor / len * falloff * falloff)
    }
}

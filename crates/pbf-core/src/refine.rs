// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Post-solve velocity refinement.
//!
//! Inputs are slot-indexed: `positions[i]`, `velocities[i]` and
//! `neighbors[i]` (slots of the particles within `h` of slot `i`). Each pass
//! reads a snapshot of the velocities, so the result does not depend on slot
//! order.

use glam::DVec2;

use crate::kernels::{Poly6, Spiky};

/// XSPH viscosity: `v_i += c · Σ_j (v_j − v_i) · W_poly6(p_i − p_j)`.
pub fn apply_xsph(
    positions: &[DVec2],
    velocities: &mut [DVec2],
    neighbors: &[Vec<usize>],
    kernel: &Poly6,
    c: f64,
) {
    let before = velocities.to_vec();
    for (i, v) in velocities.iter_mut().enumerate() {
        let blended: DVec2 = neighbors[i]
            .iter()
            .map(|&j| (before[j] - before[i]) * kernel.value(positions[i] - positions[j]))
            .sum();
        *v = before[i] + blended * c;
    }
}

/// Scalar 2D vorticity `ω_i = Σ_j (v_j − v_i) × ∇W_spiky(p_i − p_j)`.
#[must_use]
pub fn vorticity(
    positions: &[DVec2],
    velocities: &[DVec2],
    neighbors: &[Vec<usize>],
    kernel: &Spiky,
) -> Vec<f64> {
    (0..positions.len())
        .map(|i| {
            neighbors[i]
                .iter()
                .map(|&j| {
                    (velocities[j] - velocities[i]).perp_dot(kernel.gradient(positions[i] - positions[j]))
                })
                .sum()
        })
        .collect()
}

/// Vorticity confinement: pushes velocity along `N × ω` where `N` is the
/// normalized gradient of `|ω|`.
///
/// `N` is the zero vector wherever that gradient vanishes.
pub fn apply_vorticity_confinement(
    positions: &[DVec2],
    velocities: &mut [DVec2],
    neighbors: &[Vec<usize>],
    kernel: &Spiky,
    epsilon: f64,
    dt: f64,
) {
    let omega = vorticity(positions, velocities, neighbors, kernel);
    let scale = epsilon * dt;
    for (i, v) in velocities.iter_mut().enumerate() {
        let eta: DVec2 = neighbors[i]
            .iter()
            .map(|&j| kernel.gradient(positions[i] - positions[j]) * omega[j].abs())
            .sum();
        let n = eta.normalize_or_zero();
        // (N, 0) × (0, 0, ω) restricted to the plane.
        let force = DVec2::new(n.y * omega[i], -n.x * omega[i]);
        *v += force * scale;
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use glam::DVec2;
use thiserror::Error;

/// Optional post-solve velocity passes. Both are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RefinementConfig {
    /// XSPH viscosity coefficient `c`; `None` skips the pass.
    pub xsph_viscosity: Option<f64>,
    /// Vorticity confinement strength `ε_v`; `None` skips the pass.
    pub vorticity_epsilon: Option<f64>,
}

impl RefinementConfig {
    /// Coefficients the reference scene uses when refinement is switched on.
    #[must_use]
    pub const fn enabled() -> Self {
        Self { xsph_viscosity: Some(0.01), vorticity_epsilon: Some(0.1) }
    }
}

/// Simulation parameters shared by [`PbfSolver`](crate::PbfSolver) and
/// [`DiscreteSolver`](crate::DiscreteSolver).
///
/// Coordinates are screen-space: `y` grows downward, so the default gravity
/// points along `+y`. The domain is the square `[0, domain_extent]²`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Constant acceleration applied during prediction.
    pub gravity: DVec2,
    /// Side length of the square domain.
    pub domain_extent: f64,
    /// Particle radius `R`; also the wall offset.
    pub particle_radius: f64,
    /// Rest density `ρ_0`.
    pub rest_density: f64,
    /// Kernel support radius `h`.
    pub smoothing_radius: f64,
    /// Constraint iterations per step.
    pub solver_iterations: u32,
    /// Relaxation `ε` added to the λ denominator.
    pub relaxation_epsilon: f64,
    /// Tensile correction strength `k`.
    pub scorr_k: f64,
    /// Tensile correction reference distance as a fraction of `h`.
    pub scorr_delta_q: f64,
    /// Tensile correction exponent `n`.
    pub scorr_exponent: i32,
    /// Upper bound of the random offset applied when a particle is clamped
    /// back inside the domain.
    pub boundary_jitter: f64,
    /// Seed of the jitter RNG.
    pub jitter_seed: u64,
    /// Optional velocity refinement.
    pub refinement: RefinementConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: DVec2::new(0.0, 15.0),
            domain_extent: 35.0,
            particle_radius: 0.8,
            rest_density: 0.1,
            smoothing_radius: 3.3,
            solver_iterations: 2,
            relaxation_epsilon: 5.0,
            scorr_k: 0.1,
            scorr_delta_q: 0.2,
            scorr_exponent: 4,
            boundary_jitter: 0.1,
            jitter_seed: 0,
            refinement: RefinementConfig::default(),
        }
    }
}

/// Rejected simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// A length or density that must be strictly positive and finite.
    #[error("{field} must be finite and > 0, got {value}")]
    NotPositive {
        /// Offending field.
        field: &'static str,
        /// Value supplied.
        value: f64,
    },
    /// A coefficient that must be finite and non-negative.
    #[error("{field} must be finite and >= 0, got {value}")]
    Negative {
        /// Offending field.
        field: &'static str,
        /// Value supplied.
        value: f64,
    },
    /// The domain cannot fit a single particle.
    #[error("domain extent {extent} is smaller than particle diameter {diameter}")]
    DomainTooSmall {
        /// Domain side length.
        extent: f64,
        /// `2 · particle_radius`.
        diameter: f64,
    },
    /// At least one constraint iteration is required.
    #[error("solver_iterations must be at least 1")]
    ZeroIterations,
    /// Gravity has a NaN or infinite component.
    #[error("gravity must be finite, got {0}")]
    NonFiniteGravity(DVec2),
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl SimConfig {
    /// Checks every parameter; solvers call this on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() {
            return Err(ConfigError::NonFiniteGravity(self.gravity));
        }
        positive("domain_extent", self.domain_extent)?;
        positive("particle_radius", self.particle_radius)?;
        positive("rest_density", self.rest_density)?;
        positive("smoothing_radius", self.smoothing_radius)?;
        positive("scorr_delta_q", self.scorr_delta_q)?;
        non_negative("relaxation_epsilon", self.relaxation_epsilon)?;
        non_negative("scorr_k", self.scorr_k)?;
        non_negative("boundary_jitter", self.boundary_jitter)?;
        if let Some(c) = self.refinement.xsph_viscosity {
            non_negative("refinement.xsph_viscosity", c)?;
        }
        if let Some(eps) = self.refinement.vorticity_epsilon {
            non_negative("refinement.vorticity_epsilon", eps)?;
        }

        let diameter = 2.0 * self.particle_radius;
        if self.domain_extent < diameter {
            return Err(ConfigError::DomainTooSmall { extent: self.domain_extent, diameter });
        }
        if self.solver_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// Lowest admissible coordinate for a particle of the default radius.
    #[must_use]
    pub fn wall_min(&self) -> f64 {
        self.wall_bounds(self.particle_radius).0
    }

    /// Highest admissible coordinate for a particle of the default radius.
    #[must_use]
    pub fn wall_max(&self) -> f64 {
        self.wall_bounds(self.particle_radius).1
    }

    /// Admissible coordinate range `[r, E − r]` on either axis for a particle
    /// of radius `radius`.
    #[must_use]
    pub fn wall_bounds(&self, radius: f64) -> (f64, f64) {
        (radius, self.domain_extent - radius)
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use comfy_table::{presets::UTF8_FULL, Table};
use pbf_core::{DiscreteStats, ParticleSet, StepStats};
use pbf_geom::{Aabb, ProxyHandle, SpatialIndex};
use serde_json::{json, Value};

use crate::run::{Backend, Mode, RunSpec};

/// Counters accumulated over every frame of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// Directed neighbor links, summed over frames.
    pub neighbor_links: usize,
    /// Largest neighborhood seen in any frame.
    pub max_neighbors: usize,
    /// Index restructures caused by `update`.
    pub index_restructures: usize,
    /// Boundary projections (fluid mode).
    pub boundary_clamps: usize,
    /// Wall reflections (discrete mode).
    pub wall_bounces: usize,
    /// Resolved collision pairs (discrete mode).
    pub collisions: usize,
    /// Largest `|C_i|` in the last fluid frame.
    pub final_density_error: f64,
}

impl Totals {
    /// Adds one fluid frame.
    pub fn absorb_fluid(&mut self, stats: &StepStats) {
        self.neighbor_links += stats.neighbor_links;
        self.max_neighbors = self.max_neighbors.max(stats.max_neighbors);
        self.index_restructures += stats.index_restructures;
        self.boundary_clamps += stats.boundary_clamps;
        self.final_density_error = stats.max_density_error;
    }

    /// Adds one discrete frame.
    pub fn absorb_discrete(&mut self, stats: &DiscreteStats) {
        self.index_restructures += stats.index_restructures;
        self.wall_bounces += stats.wall_bounces;
        self.collisions += stats.collisions;
    }
}

/// End-of-run report.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Backend used.
    pub backend: Backend,
    /// Mode used.
    pub mode: Mode,
    /// Particles simulated.
    pub particles: usize,
    /// Frames advanced.
    pub frames: u32,
    /// Fixed time step.
    pub dt: f64,
    /// Frame counters.
    pub totals: Totals,
    /// Mean particle speed after the last frame.
    pub mean_speed: f64,
    /// Fastest particle after the last frame.
    pub max_speed: f64,
    /// Bounding box of all particle centers; `None` with no particles.
    pub extent: Option<Aabb>,
    /// Index pool capacity.
    pub index_capacity: usize,
    /// Index free-list length.
    pub index_free: usize,
    /// Sorted handles inside the query box, when one was requested.
    pub query_hits: Option<Vec<ProxyHandle>>,
}

impl Summary {
    /// Measures the final particle state.
    #[allow(clippy::cast_precision_loss)]
    pub fn collect<I: SpatialIndex>(
        spec: &RunSpec,
        particles: &ParticleSet,
        index: &I,
        totals: Totals,
        query_hits: Option<Vec<ProxyHandle>>,
    ) -> Self {
        let mut extent: Option<Aabb> = None;
        let mut speed_sum = 0.0;
        let mut max_speed: f64 = 0.0;
        for (_, p) in particles {
            let point = Aabb::new(p.position, p.position);
            extent = Some(extent.map_or(point, |e| e.union(&point)));
            let speed = p.velocity.length();
            speed_sum += speed;
            max_speed = max_speed.max(speed);
        }
        let mean_speed = if particles.is_empty() { 0.0 } else { speed_sum / particles.len() as f64 };

        Self {
            backend: spec.backend,
            mode: spec.mode,
            particles: particles.len(),
            frames: spec.frames,
            dt: spec.dt,
            totals,
            mean_speed,
            max_speed,
            extent,
            index_capacity: index.capacity(),
            index_free: index.free_count(),
            query_hits,
        }
    }

    /// Machine-readable form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let extent = self.extent.map(|e| json!({ "min": e.min().to_array(), "max": e.max().to_array() }));
        let hits = self
            .query_hits
            .as_ref()
            .map(|hits| hits.iter().map(|h| h.index()).collect::<Vec<_>>());
        json!({
            "backend": self.backend.as_str(),
            "mode": self.mode.as_str(),
            "particles": self.particles,
            "frames": self.frames,
            "dt": self.dt,
            "neighbor_links": self.totals.neighbor_links,
            "max_neighbors": self.totals.max_neighbors,
            "index_restructures": self.totals.index_restructures,
            "boundary_clamps": self.totals.boundary_clamps,
            "wall_bounces": self.totals.wall_bounces,
            "collisions": self.totals.collisions,
            "final_density_error": self.totals.final_density_error,
            "mean_speed": self.mean_speed,
            "max_speed": self.max_speed,
            "extent": extent,
            "index_capacity": self.index_capacity,
            "index_free": self.index_free,
            "query_hits": hits,
        })
    }

    /// Human-readable two-column table.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["metric", "value"]);
        let rows: Vec<(&str, String)> = vec![
            ("backend", self.backend.as_str().to_owned()),
            ("mode", self.mode.as_str().to_owned()),
            ("particles", self.particles.to_string()),
            ("frames", self.frames.to_string()),
            ("dt", format!("{:.5}", self.dt)),
            ("neighbor links", self.totals.neighbor_links.to_string()),
            ("max neighbors", self.totals.max_neighbors.to_string()),
            ("index restructures", self.totals.index_restructures.to_string()),
            ("boundary clamps", self.totals.boundary_clamps.to_string()),
            ("wall bounces", self.totals.wall_bounces.to_string()),
            ("collisions", self.totals.collisions.to_string()),
            ("density error", format!("{:.4}", self.totals.final_density_error)),
            ("mean speed", format!("{:.3}", self.mean_speed)),
            ("max speed", format!("{:.3}", self.max_speed)),
            ("index capacity / free", format!("{} / {}", self.index_capacity, self.index_free)),
        ];
        for (metric, value) in rows {
            table.add_row(vec![metric.to_owned(), value]);
        }
        if let Some(e) = self.extent {
            table.add_row(vec!["extent".to_owned(), format!("{} .. {}", e.min(), e.max())]);
        }
        if let Some(hits) = &self.query_hits {
            let listed: Vec<String> = hits.iter().map(ToString::to_string).collect();
            table.add_row(vec![format!("query hits ({})", hits.len()), listed.join(" ")]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_keep_last_density_error_and_peak_neighbors() {
        let mut t = Totals::default();
        t.absorb_fluid(&StepStats { neighbor_links: 10, max_neighbors: 4, max_density_error: 0.5, ..StepStats::default() });
        t.absorb_fluid(&StepStats { neighbor_links: 6, max_neighbors: 2, max_density_error: 0.25, ..StepStats::default() });
        assert_eq!(t.neighbor_links, 16);
        assert_eq!(t.max_neighbors, 4);
        assert!((t.final_density_error - 0.25).abs() < f64::EPSILON);
    }
}

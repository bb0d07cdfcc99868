//! Extraction tunables
//!
//! All knobs are plain `Copy` data with serde support so a host can keep
//! them in a settings file.

use serde::{Deserialize, Serialize};

/// Configuration for one `generate` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsosurfaceConfig {
    /// Maximum output vertices, 0 = unbounded (default: 0)
    pub max_verts: u32,
    /// Maximum output indices, 0 = unbounded (default: 0)
    pub max_indices: u32,
    /// Offset used for central-difference normals (default: 0.1)
    pub normal_sample_offset: f32,
    /// Solve vertices against edge planes and sample edge normals (default: true)
    ///
    /// When false, vertices sit at the mean of their edge intersections and
    /// normals come from the voxel corner samples.
    pub dual_contouring: bool,
    /// Vertex solve constants
    pub solve: SolveConfig,
    /// Edge intersection refinement
    pub trace: TraceConfig,
}

impl Default for IsosurfaceConfig {
    fn default() -> Self {
        IsosurfaceConfig {
            max_verts: 0,
            max_indices: 0,
            normal_sample_offset: 0.1,
            dual_contouring: true,
            solve: SolveConfig::default(),
            trace: TraceConfig::default(),
        }
    }
}

impl IsosurfaceConfig {
    /// Config with output budgets
    pub fn with_budget(max_verts: u32, max_indices: u32) -> Self {
        IsosurfaceConfig {
            max_verts,
            max_indices,
            ..Default::default()
        }
    }

    /// Effective vertex limit
    #[inline]
    pub(crate) fn vertex_limit(&self) -> usize {
        match self.max_verts {
            0 => usize::MAX,
            n => n as usize,
        }
    }

    /// Effective index limit
    #[inline]
    pub(crate) fn index_limit(&self) -> usize {
        match self.max_indices {
            0 => usize::MAX,
            n => n as usize,
        }
    }
}

/// Iterative plane-projection solve (simplified QEF)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Projection passes over all contributing edges (default: 10)
    pub iterations: u32,
    /// Fraction of each plane distance applied per projection (default: 0.5)
    pub step: f32,
    /// Final blend toward the plain mean of edge points (default: 0.1)
    pub average_bias: f32,
}

impl Default for SolveConfig {
    fn default() -> Self {
        SolveConfig {
            iterations: 10,
            step: 0.5,
            average_bias: 0.1,
        }
    }
}

/// Sphere tracing along intersected voxel edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Maximum tracing steps per edge, 0 disables tracing (default: 8)
    pub max_steps: u32,
    /// Distance at which the trace counts as a hit (default: 0.01)
    pub hit_distance: f32,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_steps: 8,
            hit_distance: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_unbounded() {
        let config = IsosurfaceConfig::default();
        assert_eq!(config.vertex_limit(), usize::MAX);
        assert_eq!(config.index_limit(), usize::MAX);

        let config = IsosurfaceConfig::with_budget(12, 18);
        assert_eq!(config.vertex_limit(), 12);
        assert_eq!(config.index_limit(), 18);
    }

    #[test]
    fn test_default_solve_and_trace_constants() {
        let solve = SolveConfig::default();
        assert_eq!(solve.iterations, 10);
        assert_eq!(solve.step, 0.5);
        assert_eq!(solve.average_bias, 0.1);
        assert_eq!(TraceConfig::default().max_steps, 8);
    }
}

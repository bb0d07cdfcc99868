//! Generation statistics and progress reporting

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters and timings for one generation pass.
///
/// Reset at the start of every `generate` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Lattice samples that missed the cache and called the sampler
    pub sample_raw_count: u64,
    /// Lattice samples served from the cache
    pub sample_cache_count: u64,
    /// Off-lattice samples (edge tracing, normals), never cached
    pub sample_extra_count: u64,
    /// Octree nodes visited
    pub octree_node_count: u64,
    /// Voxels handed to the edge processor
    pub voxel_check_count: u64,
    /// Voxels skipped by pruning or lying outside the bounds
    pub voxel_skip_count: u64,
    /// Voxels covered by the root octree node
    pub voxel_total: u64,
    /// Output vertices whose position has been solved
    pub vertex_solve_count: u64,
    /// Output vertex count
    pub vertex_count: u64,
    /// Output index count
    pub index_count: u64,
    /// The search stopped early on an output budget
    pub budget_exceeded: bool,
    /// Wall time of the whole pass so far
    pub elapsed: Duration,
    /// Time spent in the octree search
    pub voxel_time: Duration,
    /// Time spent solving vertices
    pub mesh_time: Duration,
}

impl Stats {
    /// Fraction of voxels searched or skipped, in `[0, 1]`
    pub fn voxel_progress(&self) -> f32 {
        if self.voxel_total == 0 {
            return 0.0;
        }
        let done = self.voxel_check_count.saturating_add(self.voxel_skip_count);
        (done as f64 / self.voxel_total as f64).min(1.0) as f32
    }

    /// Fraction of output vertices solved, in `[0, 1]`
    pub fn mesh_progress(&self) -> f32 {
        if self.vertex_count == 0 {
            return 0.0;
        }
        (self.vertex_solve_count as f64 / self.vertex_count as f64).min(1.0) as f32
    }

    /// Total lattice lookups
    pub fn lattice_sample_count(&self) -> u64 {
        self.sample_raw_count + self.sample_cache_count
    }
}

/// Integer percent of a progress fraction
#[inline]
fn percent(fraction: f32) -> u32 {
    (fraction * 100.0).floor() as u32
}

/// Calls the host callback whenever progress crosses a 1% step.
#[derive(Debug, Default)]
pub(crate) struct ProgressReporter {
    prev_voxel_percent: Option<u32>,
    prev_mesh_percent: Option<u32>,
}

impl ProgressReporter {
    /// Forget previously reported progress
    pub(crate) fn clear(&mut self) {
        *self = ProgressReporter::default();
    }

    /// True when either percentage differs from the last report
    pub(crate) fn changed(&self, stats: &Stats) -> bool {
        self.prev_voxel_percent != Some(percent(stats.voxel_progress()))
            || self.prev_mesh_percent != Some(percent(stats.mesh_progress()))
    }

    /// Invoke `stats_fn` if progress moved a full percent
    pub(crate) fn report(&mut self, stats: &Stats, stats_fn: &mut Option<&mut dyn FnMut(&Stats)>) {
        if self.changed(stats) {
            self.force(stats, stats_fn);
        }
    }

    /// Invoke `stats_fn` unconditionally, e.g. at the end of a phase
    pub(crate) fn force(&mut self, stats: &Stats, stats_fn: &mut Option<&mut dyn FnMut(&Stats)>) {
        self.prev_voxel_percent = Some(percent(stats.voxel_progress()));
        self.prev_mesh_percent = Some(percent(stats.mesh_progress()));
        if let Some(f) = stats_fn.as_mut() {
            f(stats);
        }
    }
}

//! Per-call inputs to [`IsosurfaceExtractor::generate`]
//!
//! [`IsosurfaceExtractor::generate`]: crate::IsosurfaceExtractor::generate

use glam::Vec3;

use crate::config::IsosurfaceConfig;
use crate::sampler::SdfSampler;
use crate::stats::Stats;
use crate::types::Aabb;

/// Everything one generation pass reads from the caller.
///
/// Borrowed for the duration of the call only. Optional hooks are attached
/// with the `with_*` builders.
///
/// ```rust
/// use sdf_isosurface::prelude::*;
///
/// let sphere = exact(|p: Vec3| p.length() - 2.0);
/// let mut progress = Vec::new();
/// let mut on_stats = |s: &Stats| progress.push(s.voxel_progress());
///
/// let params = IsosurfaceParams::new(&sphere, Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0)))
///     .with_stats_fn(&mut on_stats);
///
/// let mut extractor = IsosurfaceExtractor::new();
/// assert!(extractor.generate(params));
/// ```
pub struct IsosurfaceParams<'a> {
    /// Field to mesh
    pub sampler: &'a dyn SdfSampler,
    /// Region to search
    pub aabb: Aabb,
    /// Budgets and tunables
    pub config: IsosurfaceConfig,
    /// Called whenever voxel or mesh progress crosses a 1% step
    pub stats_fn: Option<&'a mut dyn FnMut(&Stats)>,
    /// Receives the box of every visited octree node
    pub octree_boxes: Option<&'a mut Vec<Aabb>>,
    /// Receives voxels where the field is not a valid SDF.
    ///
    /// Flagged voxels are skipped while a sink is attached, so the mesh
    /// differs from a run without one.
    pub error_points: Option<&'a mut Vec<Vec3>>,
}

impl<'a> IsosurfaceParams<'a> {
    /// Params with default config and no hooks
    pub fn new(sampler: &'a dyn SdfSampler, aabb: Aabb) -> Self {
        IsosurfaceParams {
            sampler,
            aabb,
            config: IsosurfaceConfig::default(),
            stats_fn: None,
            octree_boxes: None,
            error_points: None,
        }
    }

    /// Replace the config
    pub fn with_config(mut self, config: IsosurfaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set output budgets (0 = unbounded)
    pub fn with_budget(mut self, max_verts: u32, max_indices: u32) -> Self {
        self.config.max_verts = max_verts;
        self.config.max_indices = max_indices;
        self
    }

    /// Toggle dual contouring
    pub fn with_dual_contouring(mut self, enabled: bool) -> Self {
        self.config.dual_contouring = enabled;
        self
    }

    /// Attach a progress callback
    pub fn with_stats_fn(mut self, f: &'a mut dyn FnMut(&Stats)) -> Self {
        self.stats_fn = Some(f);
        self
    }

    /// Collect visited octree boxes
    pub fn with_octree_boxes(mut self, sink: &'a mut Vec<Aabb>) -> Self {
        self.octree_boxes = Some(sink);
        self
    }

    /// Collect points where the field breaks the distance bound.
    ///
    /// Those voxels emit no quads while the sink is attached, which leaves
    /// holes in the mesh; use it for diagnosis, not production meshing.
    pub fn with_error_points(mut self, sink: &'a mut Vec<Vec3>) -> Self {
        self.error_points = Some(sink);
        self
    }
}

impl std::fmt::Debug for IsosurfaceParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsosurfaceParams")
            .field("aabb", &self.aabb)
            .field("config", &self.config)
            .field("stats_fn", &self.stats_fn.is_some())
            .field("octree_boxes", &self.octree_boxes.is_some())
            .field("error_points", &self.error_points.is_some())
            .finish()
    }
}

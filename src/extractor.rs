//! Isosurface extractor
//!
//! Owns the output buffers and the transient working state (sample cache,
//! voxel map). One `generate` call runs:
//!
//! 1. Octree search over the AABB, emitting quads with placeholder vertices
//! 2. Vertex solve over every created vertex
//!
//! The extractor is meant to be kept around: `reset` and `generate` clear
//! the buffers without releasing their capacity, so after a `reserve` a
//! host can regenerate meshes without reallocating.

use std::time::Instant;

use glam::{IVec3, Vec3};
use log::{debug, warn};

use crate::cache::DualSampleCache;
use crate::config::IsosurfaceConfig;
use crate::error::ExtractError;
use crate::mesh::{IsosurfaceVertex, Mesh, VoxelMap};
use crate::octree::{root_half_size, voxel_count, BORDER_LAYERS};
use crate::params::IsosurfaceParams;
use crate::sampler::SdfSampler;
use crate::stats::{ProgressReporter, Stats};
use crate::types::{Aabb, LatticeCoord, SampleValue};

/// Adaptive dual-contouring mesher for signed distance fields
#[derive(Debug, Default)]
pub struct IsosurfaceExtractor {
    vertices: Vec<IsosurfaceVertex>,
    indices: Vec<u32>,
    /// Voxel of each output vertex, parallel to `vertices`
    vertex_voxels: Vec<LatticeCoord>,
    cache: DualSampleCache,
    voxels: VoxelMap,
    stats: Stats,
    reporter: ProgressReporter,
    abort: Option<ExtractError>,
}

impl IsosurfaceExtractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh the zero set of `params.sampler` inside `params.aabb`.
    ///
    /// Returns `false` only when no triangles were produced. Hitting an
    /// output budget stops the search early but keeps (and solves) the
    /// partial mesh; check [`abort_reason`](Self::abort_reason) or
    /// [`Stats::budget_exceeded`] to tell the two apart.
    ///
    /// An invalid AABB (non-finite or inverted) is a no-op returning `true`
    /// with empty outputs.
    pub fn generate(&mut self, params: IsosurfaceParams<'_>) -> bool {
        let IsosurfaceParams {
            sampler,
            aabb,
            config,
            stats_fn,
            octree_boxes,
            error_points,
        } = params;

        self.reset();
        if !aabb.is_valid() {
            warn!("isosurface: invalid bounds {:?}, nothing generated", aabb);
            return true;
        }

        let start = Instant::now();
        let (voxel_min, voxel_max) = aabb.voxel_bounds();
        debug!(
            "isosurface: generating over voxels {} .. {} (dual contouring: {})",
            voxel_min, voxel_max, config.dual_contouring
        );

        let result = {
            let mut pass = Pass {
                sampler,
                config,
                voxel_min,
                voxel_max,
                search_min: voxel_min - IVec3::splat(BORDER_LAYERS),
                vertices: &mut self.vertices,
                indices: &mut self.indices,
                vertex_voxels: &mut self.vertex_voxels,
                cache: &mut self.cache,
                voxels: &mut self.voxels,
                stats: &mut self.stats,
                reporter: &mut self.reporter,
                stats_fn,
                octree_boxes,
                error_points,
                start,
            };
            pass.run(&aabb)
        };

        if let Err(err) = result {
            self.abort = Some(err);
        }
        if self.indices.is_empty() {
            self.vertices.clear();
            self.vertex_voxels.clear();
        }
        self.stats.vertex_count = self.vertices.len() as u64;
        self.stats.index_count = self.indices.len() as u64;
        self.stats.elapsed = start.elapsed();

        debug!(
            "isosurface: {} vertices, {} triangles in {:?} ({} raw / {} cached / {} extra samples, {} nodes)",
            self.stats.vertex_count,
            self.stats.index_count / 3,
            self.stats.elapsed,
            self.stats.sample_raw_count,
            self.stats.sample_cache_count,
            self.stats.sample_extra_count,
            self.stats.octree_node_count,
        );
        !self.indices.is_empty()
    }

    /// Pre-size outputs and working storage
    pub fn reserve(&mut self, verts: usize, indices: usize) {
        self.vertices.reserve(verts);
        self.vertex_voxels.reserve(verts);
        self.indices.reserve(indices);
        self.voxels.reserve(verts);
        self.cache.reserve(verts.saturating_mul(2));
    }

    /// Clear outputs, working state and stats, keeping allocated capacity
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.vertex_voxels.clear();
        self.cache.clear();
        self.voxels.clear();
        self.stats = Stats::default();
        self.reporter.clear();
        self.abort = None;
    }

    /// Output vertices of the last `generate`
    pub fn vertices(&self) -> &[IsosurfaceVertex] {
        &self.vertices
    }

    /// Output triangle indices of the last `generate`
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Stats of the last `generate`
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Budget that stopped the last `generate`, if any
    pub fn abort_reason(&self) -> Option<ExtractError> {
        self.abort
    }

    /// Distinct lattice points sampled by the last `generate`
    pub fn sample_cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Owned copy of the outputs
    pub fn to_mesh(&self) -> Mesh {
        Mesh {
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
        }
    }
}

/// Working view of one `generate` call.
///
/// Borrows the extractor's buffers alongside the caller's sampler and
/// hooks; the octree, voxel and solve stages are methods on it.
pub(crate) struct Pass<'e, 'p> {
    pub(crate) sampler: &'p dyn SdfSampler,
    pub(crate) config: IsosurfaceConfig,
    /// Inclusive minimum voxel
    pub(crate) voxel_min: IVec3,
    /// Exclusive maximum voxel
    pub(crate) voxel_max: IVec3,
    /// Inclusive minimum voxel visited by the search (bounds plus border)
    pub(crate) search_min: IVec3,
    pub(crate) vertices: &'e mut Vec<IsosurfaceVertex>,
    pub(crate) indices: &'e mut Vec<u32>,
    pub(crate) vertex_voxels: &'e mut Vec<LatticeCoord>,
    cache: &'e mut DualSampleCache,
    pub(crate) voxels: &'e mut VoxelMap,
    pub(crate) stats: &'e mut Stats,
    reporter: &'e mut ProgressReporter,
    stats_fn: Option<&'p mut dyn FnMut(&Stats)>,
    pub(crate) octree_boxes: Option<&'p mut Vec<Aabb>>,
    pub(crate) error_points: Option<&'p mut Vec<Vec3>>,
    start: Instant,
}

impl Pass<'_, '_> {
    fn run(&mut self, aabb: &Aabb) -> Result<(), ExtractError> {
        let search_start = Instant::now();
        let result = if self.voxel_min.cmplt(self.voxel_max).all() {
            let center = aabb.center().floor().as_ivec3();
            let half_size = root_half_size(center, self.search_min, self.voxel_max);
            self.stats.voxel_total = voxel_count(half_size);
            self.search(center, half_size)
        } else {
            debug!("isosurface: bounds contain no voxels");
            Ok(())
        };
        if let Err(err) = &result {
            debug!("isosurface: search stopped early: {}", err);
            self.stats.budget_exceeded = true;
        }
        self.stats.voxel_time = search_start.elapsed();
        self.finish_phase();

        let mesh_start = Instant::now();
        self.solve_vertices();
        self.stats.mesh_time = mesh_start.elapsed();
        result
    }

    /// Lattice sample through the cache
    #[inline]
    pub(crate) fn sample(&mut self, lattice: LatticeCoord) -> SampleValue {
        self.cache.sample_dual(self.sampler, lattice)
    }

    /// Uncached sample between lattice points
    #[inline]
    pub(crate) fn sample_off_lattice(&mut self, position: Vec3) -> SampleValue {
        self.stats.sample_extra_count += 1;
        self.sampler.sample(position)
    }

    /// Copy counters owned by the cache and buffers into the stats
    pub(crate) fn sync_stats(&mut self) {
        self.stats.sample_raw_count = self.cache.raw_count();
        self.stats.sample_cache_count = self.cache.cache_count();
        self.stats.vertex_count = self.vertices.len() as u64;
        self.stats.index_count = self.indices.len() as u64;
    }

    /// Report progress if it moved a full percent
    pub(crate) fn report(&mut self) {
        if self.stats_fn.is_none() {
            return;
        }
        self.sync_stats();
        if self.reporter.changed(self.stats) {
            self.stats.elapsed = self.start.elapsed();
            self.reporter.report(self.stats, &mut self.stats_fn);
        }
    }

    /// Report unconditionally at the end of a phase
    pub(crate) fn finish_phase(&mut self) {
        self.sync_stats();
        self.stats.elapsed = self.start.elapsed();
        self.reporter.force(self.stats, &mut self.stats_fn);
    }
}

#[cfg(test)]
impl IsosurfaceExtractor {
    /// Pass over this extractor's buffers with no hooks attached
    pub(crate) fn pass<'e, 'p>(
        &'e mut self,
        sampler: &'p dyn SdfSampler,
        config: IsosurfaceConfig,
        aabb: Aabb,
    ) -> Pass<'e, 'p> {
        let (voxel_min, voxel_max) = aabb.voxel_bounds();
        Pass {
            sampler,
            config,
            voxel_min,
            voxel_max,
            search_min: voxel_min - IVec3::splat(BORDER_LAYERS),
            vertices: &mut self.vertices,
            indices: &mut self.indices,
            vertex_voxels: &mut self.vertex_voxels,
            cache: &mut self.cache,
            voxels: &mut self.voxels,
            stats: &mut self.stats,
            reporter: &mut self.reporter,
            stats_fn: None,
            octree_boxes: None,
            error_points: None,
            start: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::exact;

    fn sphere_bounds() -> Aabb {
        Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0))
    }

    #[test]
    fn test_generate_sphere() {
        let sphere = exact(|p: Vec3| p.length() - 2.0);
        let mut extractor = IsosurfaceExtractor::new();
        assert!(extractor.generate(IsosurfaceParams::new(&sphere, sphere_bounds())));
        assert!(!extractor.vertices().is_empty());
        assert_eq!(extractor.indices().len() % 3, 0);
        assert!(extractor.abort_reason().is_none());
        assert!(!extractor.stats().budget_exceeded);
    }

    #[test]
    fn test_stats_match_cache() {
        let sphere = exact(|p: Vec3| p.length() - 2.0);
        let mut extractor = IsosurfaceExtractor::new();
        extractor.generate(IsosurfaceParams::new(&sphere, sphere_bounds()));
        let stats = extractor.stats();
        assert_eq!(stats.sample_raw_count as usize, extractor.sample_cache_len());
        assert!(stats.sample_cache_count > 0);
        assert_eq!(stats.vertex_count as usize, extractor.vertices().len());
        assert_eq!(stats.vertex_solve_count, stats.vertex_count);
        assert_eq!(stats.voxel_progress(), 1.0);
    }

    #[test]
    fn test_invalid_bounds_is_noop() {
        let sphere = exact(|p: Vec3| p.length() - 2.0);
        let mut extractor = IsosurfaceExtractor::new();
        let inverted = Aabb::new(Vec3::splat(3.0), Vec3::splat(-3.0));
        assert!(extractor.generate(IsosurfaceParams::new(&sphere, inverted)));
        assert!(extractor.vertices().is_empty());
        assert_eq!(extractor.sample_cache_len(), 0);

        let nan = Aabb::new(Vec3::splat(f32::NAN), Vec3::ONE);
        assert!(extractor.generate(IsosurfaceParams::new(&sphere, nan)));
    }

    #[test]
    fn test_zero_volume_bounds_is_empty() {
        let sphere = exact(|p: Vec3| p.length() - 2.0);
        let mut extractor = IsosurfaceExtractor::new();
        let flat = Aabb::new(Vec3::new(-3.0, -3.0, 0.0), Vec3::new(3.0, 3.0, 0.0));
        assert!(!extractor.generate(IsosurfaceParams::new(&sphere, flat)));
        assert!(extractor.indices().is_empty());
    }

    #[test]
    fn test_reset_clears_outputs() {
        let sphere = exact(|p: Vec3| p.length() - 2.0);
        let mut extractor = IsosurfaceExtractor::new();
        extractor.generate(IsosurfaceParams::new(&sphere, sphere_bounds()));
        extractor.reset();
        assert!(extractor.vertices().is_empty());
        assert!(extractor.indices().is_empty());
        assert_eq!(extractor.sample_cache_len(), 0);
        assert_eq!(*extractor.stats(), Stats::default());
    }
}

//! Vertex solve
//!
//! Each output vertex belongs to one voxel. Its position is fitted to the
//! Hermite data of the up to 12 intersected edges of that voxel, which are
//! owned by the voxel itself and 6 of its lower neighbours.
//!
//! The fit is an iterative projection onto the edge tangent planes rather
//! than a full least-squares solve: it cannot blow up on degenerate normal
//! sets, and the final pull toward the mass point keeps vertices near their
//! voxel.

use glam::{IVec3, Vec3};

use crate::config::SolveConfig;
use crate::extractor::Pass;
use crate::mesh::voxel::VoxelMap;
use crate::mesh::IsosurfaceVertex;
use crate::types::LatticeCoord;

/// The 12 edges of a voxel as `(owner offset, owned edge)`
const NEIGHBOR_EDGES: [(IVec3, usize); 12] = [
    (IVec3::new(0, 0, 0), 0),
    (IVec3::new(0, 0, 0), 1),
    (IVec3::new(0, 0, 0), 2),
    (IVec3::new(-1, 0, 0), 1),
    (IVec3::new(-1, 0, 0), 2),
    (IVec3::new(0, -1, 0), 0),
    (IVec3::new(0, -1, 0), 2),
    (IVec3::new(-1, -1, 0), 2),
    (IVec3::new(-1, 0, -1), 1),
    (IVec3::new(0, -1, -1), 0),
    (IVec3::new(0, 0, -1), 0),
    (IVec3::new(0, 0, -1), 1),
];

/// Intersected edges around one voxel, in that voxel's local frame
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeSamples {
    /// Intersection points
    pub points: [Vec3; 12],
    /// Unit normals (zero when not sampled)
    pub normals: [Vec3; 12],
    /// Number of valid entries
    pub len: usize,
}

impl EdgeSamples {
    /// Add one intersection
    #[inline]
    pub fn push(&mut self, point: Vec3, normal: Vec3) {
        if self.len < 12 {
            self.points[self.len] = point;
            self.normals[self.len] = normal;
            self.len += 1;
        }
    }

    /// True if no edge is intersected
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mean of the intersection points, or the voxel center when empty
    pub fn mass_point(&self) -> Vec3 {
        if self.len == 0 {
            return Vec3::splat(0.5);
        }
        self.points[..self.len].iter().copied().sum::<Vec3>() / self.len as f32
    }

    /// Normalized sum of the edge normals
    pub fn mean_normal(&self) -> Vec3 {
        self.normals[..self.len]
            .iter()
            .copied()
            .sum::<Vec3>()
            .normalize_or_zero()
    }

    /// Collect the intersected edges of `voxel` from the voxel map
    pub fn gather(voxels: &VoxelMap, voxel: LatticeCoord) -> Self {
        let mut samples = EdgeSamples::default();
        for (offset, edge) in NEIGHBOR_EDGES {
            let Some(owner) = voxels.get(&(voxel + offset)) else {
                continue;
            };
            if owner.has_edge(edge) {
                samples.push(
                    owner.edge_pos[edge] + offset.as_vec3(),
                    owner.edge_normal[edge],
                );
            }
        }
        samples
    }
}

/// Fit a vertex to the edge tangent planes, in the voxel's local frame.
///
/// Starting from the mass point, every iteration moves the point part of
/// the way onto each edge plane in turn, then the result is pulled back
/// toward the mass point by `average_bias`.
pub fn solve_position(samples: &EdgeSamples, solve: &SolveConfig) -> Vec3 {
    let mass_point = samples.mass_point();
    let mut p = mass_point;
    for _ in 0..solve.iterations {
        for i in 0..samples.len {
            let n = samples.normals[i];
            let e = samples.points[i];
            p += n * (n.dot(e - p) * solve.step);
        }
    }
    p.lerp(mass_point, solve.average_bias)
}

/// Dual-contouring vertex for `voxel`
#[inline]
fn solve_vertex(voxels: &VoxelMap, voxel: LatticeCoord, solve: &SolveConfig) -> IsosurfaceVertex {
    let samples = EdgeSamples::gather(voxels, voxel);
    let local = solve_position(&samples, solve);
    IsosurfaceVertex::new(voxel.as_vec3() + local, samples.mean_normal())
}

/// Normal from the 8 corner distances of a voxel, indexed by octant bits
fn corner_normal(corners: &[f32; 8]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, d) in corners.iter().enumerate() {
        let sign = |bit: usize| if i & bit != 0 { *d } else { -*d };
        n += Vec3::new(sign(1), sign(2), sign(4));
    }
    n.normalize_or_zero()
}

impl Pass<'_, '_> {
    /// Replace every placeholder vertex with its solved position and normal
    pub(crate) fn solve_vertices(&mut self) {
        if self.config.dual_contouring {
            self.solve_dual_contouring();
        } else {
            self.solve_mass_points();
        }
        self.finish_phase();
    }

    #[cfg(not(feature = "parallel"))]
    fn solve_dual_contouring(&mut self) {
        let solve = self.config.solve;
        for i in 0..self.vertex_voxels.len() {
            let voxel = self.vertex_voxels[i];
            self.vertices[i] = solve_vertex(self.voxels, voxel, &solve);
            self.stats.vertex_solve_count += 1;
            self.report();
        }
    }

    /// Solved vertices only read the voxel map, so the pass runs in parallel.
    /// Progress is reported once at the end.
    #[cfg(feature = "parallel")]
    fn solve_dual_contouring(&mut self) {
        use rayon::prelude::*;

        let solve = self.config.solve;
        let voxels: &VoxelMap = &*self.voxels;
        self.vertices
            .par_iter_mut()
            .zip(self.vertex_voxels.par_iter())
            .for_each(|(vertex, &voxel)| *vertex = solve_vertex(voxels, voxel, &solve));
        self.stats.vertex_solve_count = self.vertices.len() as u64;
    }

    /// Mass-point placement with normals from the cached corner samples
    fn solve_mass_points(&mut self) {
        for i in 0..self.vertex_voxels.len() {
            let voxel = self.vertex_voxels[i];
            let samples = EdgeSamples::gather(self.voxels, voxel);

            let mut corners = [0.0f32; 8];
            for (bit, corner) in corners.iter_mut().enumerate() {
                let offset = IVec3::new((bit & 1) as i32, ((bit >> 1) & 1) as i32, ((bit >> 2) & 1) as i32);
                *corner = self.sample(voxel + offset).distance;
            }

            self.vertices[i] = IsosurfaceVertex::new(
                voxel.as_vec3() + samples.mass_point(),
                corner_normal(&corners),
            );
            self.stats.vertex_solve_count += 1;
            self.report();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::voxel::Voxel;

    #[test]
    fn test_neighbor_edges_are_distinct_and_on_the_voxel() {
        let corner_offsets = [IVec3::new(0, 1, 1), IVec3::new(1, 0, 1), IVec3::new(1, 1, 0)];
        let mut seen = Vec::new();
        for (offset, edge) in NEIGHBOR_EDGES {
            // Endpoints relative to the gathering voxel
            let a = offset + IVec3::ONE;
            let b = offset + corner_offsets[edge];
            for p in [a, b] {
                assert!(p.cmpge(IVec3::ZERO).all() && p.cmple(IVec3::ONE).all(), "{:?}", p);
            }
            let key = (a.min(b), a.max(b));
            assert!(!seen.contains(&key));
            seen.push(key);
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn test_solve_planar() {
        // Four intersections on the plane z = 0.3
        let mut samples = EdgeSamples::default();
        for p in [
            Vec3::new(0.0, 0.0, 0.3),
            Vec3::new(1.0, 0.0, 0.3),
            Vec3::new(0.0, 1.0, 0.3),
            Vec3::new(1.0, 1.0, 0.3),
        ] {
            samples.push(p, Vec3::Z);
        }
        let p = solve_position(&samples, &SolveConfig::default());
        assert!((p.z - 0.3).abs() < 1e-4, "z = {}", p.z);
        assert!((p.x - 0.5).abs() < 1e-4 && (p.y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_solve_finds_sharp_corner() {
        // Two perpendicular planes x = 0.7 and y = 0.2
        let mut samples = EdgeSamples::default();
        samples.push(Vec3::new(0.7, 0.0, 0.0), Vec3::X);
        samples.push(Vec3::new(0.7, 1.0, 1.0), Vec3::X);
        samples.push(Vec3::new(0.0, 0.2, 0.0), Vec3::Y);
        samples.push(Vec3::new(1.0, 0.2, 1.0), Vec3::Y);
        let config = SolveConfig {
            average_bias: 0.0,
            ..Default::default()
        };
        let p = solve_position(&samples, &config);
        assert!((p.x - 0.7).abs() < 1e-2, "x = {}", p.x);
        assert!((p.y - 0.2).abs() < 1e-2, "y = {}", p.y);
    }

    #[test]
    fn test_empty_samples_use_voxel_center() {
        let samples = EdgeSamples::default();
        assert!(samples.is_empty());
        assert_eq!(solve_position(&samples, &SolveConfig::default()), Vec3::splat(0.5));
        assert_eq!(samples.mean_normal(), Vec3::ZERO);
    }

    #[test]
    fn test_gather_shifts_neighbor_edges() {
        let mut voxels = VoxelMap::new();
        let mut owner = Voxel::default();
        owner.edge_mask = 0b010;
        owner.edge_pos[1] = Vec3::new(1.0, 0.25, 1.0);
        owner.edge_normal[1] = Vec3::X;
        voxels.insert(IVec3::new(-1, 0, 0), owner);

        let samples = EdgeSamples::gather(&voxels, IVec3::ZERO);
        assert_eq!(samples.len, 1);
        assert_eq!(samples.points[0], Vec3::new(0.0, 0.25, 1.0));
        assert_eq!(samples.normals[0], Vec3::X);
    }

    #[test]
    fn test_corner_normal_follows_gradient() {
        // d = x - 0.5
        let mut corners = [0.0f32; 8];
        for (i, c) in corners.iter_mut().enumerate() {
            *c = (i & 1) as f32 - 0.5;
        }
        let n = corner_normal(&corners);
        assert!((n - Vec3::X).length() < 1e-6);
    }
}

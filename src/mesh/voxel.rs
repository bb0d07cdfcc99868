//! Voxel/edge processing
//!
//! Voxel `(x, y, z)` owns the 3 lattice edges that meet at its shared corner
//! `(x+1, y+1, z+1)`:
//!
//! | edge | axis | other corner |
//! |------|------|--------------|
//! | 0    | x    | `(x, y+1, z+1)` |
//! | 1    | y    | `(x+1, y, z+1)` |
//! | 2    | z    | `(x+1, y+1, z)` |
//!
//! The other 9 edges of the voxel are owned by its lower neighbours, so every
//! lattice edge is tested exactly once per pass. An intersected edge is
//! shared by 4 voxels and becomes one quad joining their dual vertices.

use std::collections::HashMap;

use glam::{IVec3, Vec3};
use log::trace;

use crate::error::ExtractError;
use crate::extractor::Pass;
use crate::mesh::IsosurfaceVertex;
use crate::sampler::gradient_cd;
use crate::types::{LatticeCoord, SampleValue};

/// Vertex index sentinel: no output vertex assigned yet
pub const NO_VERTEX: u32 = u32::MAX;

/// Space diagonal of a unit voxel
const VOXEL_DIAGONAL: f32 = 1.732_050_8;

/// Largest distance change allowed between adjacent lattice points of a
/// valid SDF (1 voxel plus rounding slack)
const LIPSCHITZ_LIMIT: f32 = 1.01;

/// Replaces exact zeros so a surface lying on a lattice plane still
/// produces a sign change on one side
const ZERO_NUDGE: f32 = 0.0001;

/// Other corner of each owned edge, relative to the voxel
const CORNER_OFFSETS: [IVec3; 3] = [
    IVec3::new(0, 1, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, 0),
];

/// Voxels sharing each owned edge, relative to the owning voxel
const QUAD_OFFSETS: [[IVec3; 4]; 3] = [
    [
        IVec3::new(0, 0, 0),
        IVec3::new(0, 1, 0),
        IVec3::new(0, 0, 1),
        IVec3::new(0, 1, 1),
    ],
    [
        IVec3::new(0, 0, 0),
        IVec3::new(1, 0, 0),
        IVec3::new(0, 0, 1),
        IVec3::new(1, 0, 1),
    ],
    [
        IVec3::new(0, 0, 0),
        IVec3::new(0, 1, 0),
        IVec3::new(1, 0, 0),
        IVec3::new(1, 1, 0),
    ],
];

/// Hermite data for the 3 edges a voxel owns, plus its dual vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    /// Bit `e` set when owned edge `e` crosses the surface
    pub edge_mask: u8,
    /// Intersection point per edge, in the voxel's local `[0, 1]^3` frame
    pub edge_pos: [Vec3; 3],
    /// Unit normal per edge (zero unless dual contouring is enabled)
    pub edge_normal: [Vec3; 3],
    /// Output vertex of this voxel, or [`NO_VERTEX`]
    pub vertex_index: u32,
}

impl Default for Voxel {
    fn default() -> Self {
        Voxel {
            edge_mask: 0,
            edge_pos: [Vec3::ZERO; 3],
            edge_normal: [Vec3::ZERO; 3],
            vertex_index: NO_VERTEX,
        }
    }
}

impl Voxel {
    /// True if owned edge `edge` crosses the surface
    #[inline(always)]
    pub fn has_edge(&self, edge: usize) -> bool {
        self.edge_mask & (1 << edge) != 0
    }

    /// True once an output vertex has been created for this voxel
    #[inline(always)]
    pub fn has_vertex(&self) -> bool {
        self.vertex_index != NO_VERTEX
    }
}

/// Sparse voxel storage keyed by the voxel's minimum corner
pub type VoxelMap = HashMap<LatticeCoord, Voxel>;

#[inline(always)]
fn nudge(mut sample: SampleValue) -> SampleValue {
    if sample.distance == 0.0 {
        sample.distance = ZERO_NUDGE;
    }
    sample
}

#[inline(always)]
fn crosses(a: f32, b: f32) -> bool {
    (a < 0.0) != (b < 0.0)
}

/// Quad winding for an owned edge, counter-clockwise seen from outside
#[inline(always)]
fn quad_triangles(edge: usize, shared_distance: f32, q: [u32; 4]) -> [u32; 6] {
    let flip = if edge == 0 {
        shared_distance > 0.0
    } else {
        shared_distance < 0.0
    };
    if flip {
        [q[0], q[1], q[2], q[1], q[3], q[2]]
    } else {
        [q[0], q[2], q[1], q[1], q[2], q[3]]
    }
}

impl Pass<'_, '_> {
    /// Test the 3 owned edges of `voxel` and emit quads for the in-bounds ones
    pub(crate) fn process_voxel(&mut self, voxel: LatticeCoord) -> Result<(), ExtractError> {
        let shared = nudge(self.sample(voxel + IVec3::ONE));
        if shared.min_surface_distance() > VOXEL_DIAGONAL {
            return Ok(());
        }

        let corners = [
            nudge(self.sample(voxel + CORNER_OFFSETS[0])),
            nudge(self.sample(voxel + CORNER_OFFSETS[1])),
            nudge(self.sample(voxel + CORNER_OFFSETS[2])),
        ];

        let unstable = corners.iter().any(|c| {
            (c.distance - shared.distance).abs()
                > LIPSCHITZ_LIMIT + c.error_margin + shared.error_margin
        });
        if unstable {
            if let Some(sink) = self.error_points.as_mut() {
                sink.push(voxel.as_vec3());
                return Ok(());
            }
            trace!("field exceeds the distance bound near voxel {}", voxel);
        }

        let mut mask = 0u8;
        for (e, corner) in corners.iter().enumerate() {
            if crosses(corner.distance, shared.distance) {
                mask |= 1 << e;
            }
        }
        if mask == 0 {
            return Ok(());
        }

        let mut edge_pos = [Vec3::ZERO; 3];
        let mut edge_normal = [Vec3::ZERO; 3];
        for e in 0..3 {
            if mask & (1 << e) == 0 {
                continue;
            }
            let local = self.edge_intersection(voxel, e, shared, corners[e]);
            debug_assert!(local.is_finite(), "non-finite edge intersection {:?}", local);
            edge_pos[e] = local;
            if self.config.dual_contouring {
                edge_normal[e] = self.edge_normal(voxel.as_vec3() + local);
            }
        }

        let record = self.voxels.entry(voxel).or_default();
        record.edge_mask |= mask;
        for e in 0..3 {
            if mask & (1 << e) != 0 {
                record.edge_pos[e] = edge_pos[e];
                record.edge_normal[e] = edge_normal[e];
            }
        }

        for e in 0..3 {
            if mask & (1 << e) != 0 && self.edge_in_bounds(voxel, e) {
                self.emit_quad(voxel, e, shared.distance)?;
            }
        }
        Ok(())
    }

    /// Intersection of owned edge `edge` with the surface, local to `voxel`.
    ///
    /// Linear interpolation, refined by sphere tracing when the samples are
    /// trustworthy. The two estimates are blended by the error margin so
    /// noisy fields fall back to plain interpolation.
    fn edge_intersection(
        &mut self,
        voxel: LatticeCoord,
        edge: usize,
        shared: SampleValue,
        other: SampleValue,
    ) -> Vec3 {
        let shared_local = Vec3::ONE;
        let other_local = CORNER_OFFSETS[edge].as_vec3();

        // Fraction of the way from the shared corner to the other corner
        let linear = shared.distance / (shared.distance - other.distance);
        let margin = shared.error_margin.max(other.error_margin);

        let t = if self.config.trace.max_steps > 0 && margin < 1.0 {
            let traced = self.trace_edge(voxel, shared_local, other_local, shared, other);
            let w = margin.clamp(0.0, 1.0);
            traced + (linear - traced) * w
        } else {
            linear
        };

        shared_local.lerp(other_local, t.clamp(0.0, 1.0))
    }

    /// Sphere trace from the outside corner toward the inside corner.
    ///
    /// Returns the hit as a fraction from the shared corner.
    fn trace_edge(
        &mut self,
        voxel: LatticeCoord,
        shared_local: Vec3,
        other_local: Vec3,
        shared: SampleValue,
        other: SampleValue,
    ) -> f32 {
        let shared_outside = shared.distance > other.distance;
        let (start, end, start_distance) = if shared_outside {
            (shared_local, other_local, shared.distance)
        } else {
            (other_local, shared_local, other.distance)
        };

        let base = voxel.as_vec3();
        let trace = self.config.trace;
        let mut depth = 0.0f32;
        let mut distance = start_distance;
        for _ in 0..trace.max_steps {
            if distance < trace.hit_distance {
                break;
            }
            depth += distance;
            if depth >= 1.0 {
                depth = 1.0;
                break;
            }
            distance = self.sample_off_lattice(base + start.lerp(end, depth)).distance;
        }

        if shared_outside {
            depth
        } else {
            1.0 - depth
        }
    }

    fn edge_normal(&mut self, world: Vec3) -> Vec3 {
        self.stats.sample_extra_count += 6;
        gradient_cd(self.sampler, world, self.config.normal_sample_offset)
    }

    /// An edge belongs to the region containing its lower endpoint, so
    /// regions tiling space emit every lattice edge exactly once
    fn edge_in_bounds(&self, voxel: LatticeCoord, edge: usize) -> bool {
        let start = voxel + CORNER_OFFSETS[edge];
        start.cmpge(self.voxel_min).all() && start.cmplt(self.voxel_max).all()
    }

    /// Append the quad for owned edge `edge`, creating dual vertices on
    /// first use
    fn emit_quad(
        &mut self,
        voxel: LatticeCoord,
        edge: usize,
        shared_distance: f32,
    ) -> Result<(), ExtractError> {
        let max_verts = self.config.vertex_limit();
        if self.vertices.len() + 4 > max_verts {
            return Err(ExtractError::VertexBudget {
                requested: self.vertices.len() + 4,
                max: max_verts,
            });
        }
        let max_indices = self.config.index_limit();
        if self.indices.len() + 6 > max_indices {
            return Err(ExtractError::IndexBudget {
                requested: self.indices.len() + 6,
                max: max_indices,
            });
        }

        let offsets = &QUAD_OFFSETS[edge];
        let quad = [
            self.dual_vertex(voxel + offsets[0]),
            self.dual_vertex(voxel + offsets[1]),
            self.dual_vertex(voxel + offsets[2]),
            self.dual_vertex(voxel + offsets[3]),
        ];
        self.indices
            .extend_from_slice(&quad_triangles(edge, shared_distance, quad));
        Ok(())
    }

    /// Output vertex of `voxel`, created lazily
    fn dual_vertex(&mut self, voxel: LatticeCoord) -> u32 {
        let record = self.voxels.entry(voxel).or_default();
        if record.has_vertex() {
            return record.vertex_index;
        }
        let index = self.vertices.len() as u32;
        record.vertex_index = index;
        self.vertices.push(IsosurfaceVertex::voxel_center(voxel));
        self.vertex_voxels.push(voxel);
        index
    }
}

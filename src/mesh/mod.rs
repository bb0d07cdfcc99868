//! Mesh side of the extractor
//!
//! - **Voxel/edge processing** (`voxel`): tests the 3 edges each voxel owns,
//!   records Hermite data (intersection + normal) and emits quads.
//! - **Vertex solve** (`solve`): places each dual vertex from the up to 12
//!   edge intersections around it.

pub mod solve;
pub mod voxel;

pub use solve::{solve_position, EdgeSamples};
pub use voxel::{Voxel, VoxelMap, NO_VERTEX};

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::types::LatticeCoord;

/// Output vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsosurfaceVertex {
    /// World position, `w = 1`
    pub position: Vec4,
    /// Unit surface normal (zero if undefined)
    pub normal: Vec3,
}

impl IsosurfaceVertex {
    /// Create a vertex from a 3D position
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        IsosurfaceVertex {
            position: position.extend(1.0),
            normal,
        }
    }

    /// Vertex at the center of a voxel, used until the solve pass runs
    pub(crate) fn voxel_center(voxel: LatticeCoord) -> Self {
        IsosurfaceVertex::new(voxel.as_vec3() + Vec3::splat(0.5), Vec3::ZERO)
    }

    /// Position without the homogeneous coordinate
    #[inline(always)]
    pub fn position3(&self) -> Vec3 {
        self.position.truncate()
    }
}

/// Owned copy of an extractor's output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh vertices
    pub vertices: Vec<IsosurfaceVertex>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

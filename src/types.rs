//! Core value types: SampleValue, LatticeCoord, Aabb
//!
//! The extractor works on a unit lattice: lattice point `(x, y, z)` sits at
//! world position `(x, y, z)`, and voxel `(x, y, z)` spans `[x, x + 1]` on
//! each axis. Callers that need a different resolution scale their SDF.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Integer dual-grid coordinate.
///
/// Used as the key of both the sample cache and the voxel map. Keys compare
/// on the full triple, so there are no collisions anywhere in `i32` range.
pub type LatticeCoord = IVec3;

/// World position of a lattice point
#[inline(always)]
pub fn lattice_to_world(lattice: LatticeCoord) -> Vec3 {
    lattice.as_vec3()
}

/// One SDF sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleValue {
    /// Signed distance to the surface (negative inside)
    pub distance: f32,
    /// Radius within which the field may deviate from a true SDF
    pub error_margin: f32,
}

impl SampleValue {
    /// Create a sample with an explicit error margin
    #[inline(always)]
    pub fn new(distance: f32, error_margin: f32) -> Self {
        SampleValue {
            distance,
            error_margin,
        }
    }

    /// Create a sample from an exact signed distance (zero error margin)
    #[inline(always)]
    pub fn exact(distance: f32) -> Self {
        SampleValue {
            distance,
            error_margin: 0.0,
        }
    }

    /// Conservative lower bound on the distance to the surface
    #[inline(always)]
    pub fn min_surface_distance(&self) -> f32 {
        self.distance.abs() - self.error_margin
    }
}

impl From<f32> for SampleValue {
    fn from(distance: f32) -> Self {
        SampleValue::exact(distance)
    }
}

/// World-space box handed to the extractor. Its voxel range is derived
/// with [`voxel_bounds`](Self::voxel_bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower corner
    pub min: Vec3,
    /// Upper corner
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning `min ..= max`
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Box reaching `half_size` from `center` along each axis
    pub fn centered(center: Vec3, half_size: Vec3) -> Self {
        Aabb::new(center - half_size, center + half_size)
    }

    /// Midpoint; the octree root sits on its floor
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Inclusive point test
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Finite and not inverted, i.e. the box contains its own center
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.contains(self.center())
    }

    /// Integer voxel range covered by this box: `(floor(min), ceil(max))`.
    ///
    /// Voxel `v` is inside when `min <= v < max` on every axis.
    pub fn voxel_bounds(&self) -> (IVec3, IVec3) {
        (self.min.floor().as_ivec3(), self.max.ceil().as_ivec3())
    }
}

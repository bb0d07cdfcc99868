//! # sdf-isosurface
//!
//! **Adaptive dual-contouring mesher for signed distance fields**
//!
//! Turns any SDF into a triangle mesh without evaluating a dense grid.
//! An octree search skips regions the distance bound proves empty, every
//! lattice sample is memoized, and each voxel tests only the 3 edges it
//! owns.
//!
//! ## Features
//!
//! - **Octree search**: conservative pruning from `|d| - margin`
//! - **Dual sample cache**: one sampler call per lattice point
//! - **Edge processing**: sphere-traced intersections, central-difference normals
//! - **Vertex solve**: iterative tangent-plane projection (QEF-style)
//! - **Budgets**: hard vertex/index caps with a partial mesh on abort
//! - **Progress**: stats callback on every 1% step
//! - **Parallel**: optional rayon vertex solve (`parallel` feature)
//!
//! ## Example
//!
//! ```rust
//! use sdf_isosurface::prelude::*;
//!
//! // Sphere of radius 2, in voxel units
//! let sphere = exact(|p: Vec3| p.length() - 2.0);
//!
//! let mut extractor = IsosurfaceExtractor::new();
//! let params = IsosurfaceParams::new(&sphere, Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0)))
//!     .with_budget(10_000, 60_000);
//!
//! assert!(extractor.generate(params));
//! let mesh = extractor.to_mesh();
//! assert!(mesh.triangle_count() > 0);
//! ```

#![warn(missing_docs)]

pub mod types;
pub mod sampler;
pub mod config;
pub mod params;
pub mod error;
pub mod stats;
pub mod cache;
pub mod mesh;
pub mod extractor;

mod octree;

pub use extractor::IsosurfaceExtractor;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::{Aabb, LatticeCoord, SampleValue};
    pub use crate::sampler::{exact, ExactSdf, SdfSampler};
    pub use crate::config::{IsosurfaceConfig, SolveConfig, TraceConfig};
    pub use crate::params::IsosurfaceParams;
    pub use crate::stats::Stats;
    pub use crate::error::ExtractError;
    pub use crate::mesh::{IsosurfaceVertex, Mesh};
    pub use crate::extractor::IsosurfaceExtractor;
    pub use glam::{IVec3, Vec3, Vec4};
}

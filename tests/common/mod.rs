//! Common test helpers for sdf-isosurface integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use sdf_isosurface::prelude::*;

// ============================================================================
// Logging
// ============================================================================

/// Route `log` output through the test harness (safe to call repeatedly)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Standard test fields
// ============================================================================

/// Sphere at the origin
pub fn sphere(radius: f32) -> ExactSdf<impl Fn(Vec3) -> f32> {
    exact(move |p: Vec3| p.length() - radius)
}

/// Plane `z = 0`, outside toward +z
pub fn plane_z() -> ExactSdf<impl Fn(Vec3) -> f32> {
    exact(|p: Vec3| p.z)
}

/// Bounds used by the sphere scenarios
pub fn sphere_bounds() -> Aabb {
    Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0))
}

/// Thin slab around the `z = 0` plane
pub fn plane_bounds() -> Aabb {
    Aabb::new(Vec3::new(-2.0, -2.0, -0.5), Vec3::new(2.0, 2.0, 0.5))
}

/// Run one generation with default config
pub fn extract(sampler: &dyn SdfSampler, aabb: Aabb) -> (bool, IsosurfaceExtractor) {
    init_logging();
    let mut extractor = IsosurfaceExtractor::new();
    let ok = extractor.generate(IsosurfaceParams::new(sampler, aabb));
    (ok, extractor)
}

// ============================================================================
// Mesh validation
// ============================================================================

/// Index buffer forms whole triangles over existing, finite vertices
pub fn assert_valid_topology(vertices: &[IsosurfaceVertex], indices: &[u32]) {
    assert_eq!(indices.len() % 3, 0, "index count {} not a multiple of 3", indices.len());
    for &i in indices {
        assert!(
            (i as usize) < vertices.len(),
            "index {} out of range ({} vertices)",
            i,
            vertices.len()
        );
    }
    for tri in indices.chunks(3) {
        assert!(
            tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2],
            "degenerate triangle {:?}",
            tri
        );
    }
    for v in vertices {
        assert!(v.position.is_finite(), "non-finite vertex {:?}", v);
        assert_eq!(v.position.w, 1.0);
    }
}

/// Every directed edge is matched by its reverse: the mesh is closed and
/// consistently oriented
pub fn assert_closed_and_oriented(indices: &[u32]) {
    let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
    for tri in indices.chunks(3) {
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            *edges.entry((a, b)).or_default() += 1;
        }
    }
    for (&(a, b), &count) in &edges {
        let reverse = edges.get(&(b, a)).copied().unwrap_or(0);
        assert_eq!(count, reverse, "edge {} -> {} used {} times, reverse {}", a, b, count, reverse);
    }
}

/// Geometric normal of a triangle (unnormalized)
pub fn face_normal(vertices: &[IsosurfaceVertex], tri: &[u32]) -> Vec3 {
    let a = vertices[tri[0] as usize].position3();
    let b = vertices[tri[1] as usize].position3();
    let c = vertices[tri[2] as usize].position3();
    (b - a).cross(c - a)
}

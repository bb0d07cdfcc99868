//! Adaptive octree search
//!
//! Walks an implicit octree over the voxel bounds and hands every voxel that
//! may touch the surface to the edge processor.
//!
//! # Algorithm
//!
//! 1. Root node is centered on the floored AABB center, with a power-of-two
//!    half size large enough to reach every bound
//! 2. Sample the SDF at the node center (a lattice point, so it is cached)
//! 3. If the surface is provably farther than the node's half diagonal,
//!    skip the whole subtree
//! 4. Otherwise recurse into the 8 children that overlap the bounds
//! 5. At half size 1 the children are single voxels
//!
//! A node `(c, h)` covers voxels `c - h ..= c + h - 1` on each axis.
//!
//! The search also visits [`BORDER_LAYERS`] voxel layers below the lower
//! bound. Those voxels only record Hermite data and the quads of edges that
//! start inside the bounds, so dual vertices on the lower face solve exactly
//! as they would in a neighbouring region that contains them.
//!
//! Bounds are expected to stay within about `±2^29` voxels of the origin.

use glam::{IVec3, Vec3};
use log::trace;

use crate::error::ExtractError;
use crate::extractor::Pass;
use crate::types::{Aabb, LatticeCoord};

const SQRT_3: f32 = 1.732_050_8;

/// Extra voxel layers searched below the lower bound: one for the quad
/// vertices of lower-face edges, one for the Hermite data those vertices
/// gather
pub(crate) const BORDER_LAYERS: i32 = 2;

/// Largest root half size; keeps `c ± h` inside `i32`
const MAX_HALF_SIZE: u32 = 1 << 30;

/// Root half size for a search centered on `center` that covers
/// `voxel_min .. voxel_max` (exclusive max)
pub(crate) fn root_half_size(center: LatticeCoord, voxel_min: IVec3, voxel_max: IVec3) -> u32 {
    let mut reach: i64 = 1;
    for axis in 0..3 {
        let below = center[axis] as i64 - voxel_min[axis] as i64;
        let above = voxel_max[axis] as i64 - center[axis] as i64;
        reach = reach.max(below).max(above);
    }
    (reach.min(MAX_HALF_SIZE as i64) as u32)
        .next_power_of_two()
        .min(MAX_HALF_SIZE)
}

/// Voxels covered by a node of half size `h`, saturating
#[inline]
pub(crate) fn voxel_count(half_size: u32) -> u64 {
    let edge = 2 * half_size as u64;
    edge.saturating_mul(edge).saturating_mul(edge)
}

/// Center of child `octant` (bit 0 = +x, bit 1 = +y, bit 2 = +z)
#[inline]
pub(crate) fn child_center(center: LatticeCoord, half_size: u32, octant: usize) -> LatticeCoord {
    let q = (half_size / 2) as i32;
    let pick = |bit: usize| if octant & bit != 0 { q } else { -q };
    center + IVec3::new(pick(1), pick(2), pick(4))
}

/// Voxel for octant `octant` of a half-size-1 node
#[inline]
pub(crate) fn leaf_voxel(center: LatticeCoord, octant: usize) -> LatticeCoord {
    let pick = |bit: usize| if octant & bit != 0 { 0 } else { -1 };
    center + IVec3::new(pick(1), pick(2), pick(4))
}

impl Pass<'_, '_> {
    /// True if the node shares at least one voxel with the bounds
    fn node_overlaps_bounds(&self, center: LatticeCoord, half_size: u32) -> bool {
        let h = half_size as i64;
        (0..3).all(|axis| {
            let c = center[axis] as i64;
            c - h < self.voxel_max[axis] as i64 && c + h > self.search_min[axis] as i64
        })
    }

    fn voxel_in_bounds(&self, voxel: LatticeCoord) -> bool {
        voxel.cmpge(self.search_min).all() && voxel.cmplt(self.voxel_max).all()
    }

    /// Recursive search below node `(center, half_size)`
    pub(crate) fn search(&mut self, center: LatticeCoord, half_size: u32) -> Result<(), ExtractError> {
        self.stats.octree_node_count += 1;
        if let Some(boxes) = self.octree_boxes.as_mut() {
            boxes.push(Aabb::centered(
                center.as_vec3(),
                Vec3::splat(half_size as f32),
            ));
        }

        let sample = self.sample(center);
        if sample.min_surface_distance() > SQRT_3 * half_size as f32 {
            self.stats.voxel_skip_count = self
                .stats
                .voxel_skip_count
                .saturating_add(voxel_count(half_size));
            self.report();
            return Ok(());
        }

        if half_size == 1 {
            for octant in 0..8 {
                let voxel = leaf_voxel(center, octant);
                if self.voxel_in_bounds(voxel) {
                    self.stats.voxel_check_count += 1;
                    self.process_voxel(voxel)?;
                } else {
                    self.stats.voxel_skip_count += 1;
                }
            }
            self.report();
            return Ok(());
        }

        for octant in 0..8 {
            let child = child_center(center, half_size, octant);
            let child_half = half_size / 2;
            if self.node_overlaps_bounds(child, child_half) {
                self.search(child, child_half)?;
            } else {
                trace!("octree child {} (h = {}) outside bounds", child, child_half);
                self.stats.voxel_skip_count = self
                    .stats
                    .voxel_skip_count
                    .saturating_add(voxel_count(child_half));
                self.report();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_covers_bounds() {
        let cases = [
            Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0)),
            Aabb::new(Vec3::new(-2.0, -2.0, -0.5), Vec3::new(2.0, 2.0, 0.5)),
            Aabb::new(Vec3::ZERO, Vec3::ONE),
            Aabb::new(Vec3::new(5.2, -7.0, 100.0), Vec3::new(37.5, 1.1, 100.9)),
        ];
        for aabb in cases {
            let (min, max) = aabb.voxel_bounds();
            let c = aabb.center().floor().as_ivec3();
            let h = root_half_size(c, min, max);
            assert!(h.is_power_of_two());
            let h = h as i32;
            assert!((c - h).cmple(min).all(), "{:?} {} {:?}", c, h, min);
            assert!((c + h).cmpge(max).all(), "{:?} {} {:?}", c, h, max);
        }
    }

    #[test]
    fn test_root_of_huge_bounds_is_clamped() {
        let h = root_half_size(IVec3::ZERO, IVec3::splat(i32::MIN / 2), IVec3::splat(i32::MAX / 2));
        assert_eq!(h, MAX_HALF_SIZE);
        assert_eq!(voxel_count(MAX_HALF_SIZE), u64::MAX);
    }

    #[test]
    fn test_children_partition_parent() {
        let center = IVec3::new(4, -2, 0);
        let h = 4u32;
        let mut total = 0;
        for octant in 0..8 {
            let c = child_center(center, h, octant);
            // Child range stays inside the parent range
            let q = (h / 2) as i32;
            let hh = h as i32;
            assert!((c - q).cmpge(center - hh).all());
            assert!((c + q).cmple(center + hh).all());
            total += voxel_count(h / 2);
        }
        assert_eq!(total, voxel_count(h));
    }

    #[test]
    fn test_leaf_voxels_cover_node() {
        let center = IVec3::new(1, 1, 1);
        let mut voxels: Vec<IVec3> = (0..8).map(|o| leaf_voxel(center, o)).collect();
        voxels.sort_by_key(|v| (v.x, v.y, v.z));
        voxels.dedup();
        assert_eq!(voxels.len(), 8);
        for v in voxels {
            assert!(v.cmpge(IVec3::ZERO).all() && v.cmple(IVec3::ONE).all());
        }
    }
}

//! SDF sampler adapter
//!
//! The extractor never decides what field it meshes; it only calls
//! [`SdfSampler::sample`]. Every closure `Fn(Vec3) -> SampleValue` is a
//! sampler, and [`ExactSdf`] lifts a plain `Fn(Vec3) -> f32` distance
//! function into one with a zero error margin.
//!
//! Samplers must be deterministic and free of side effects: lattice samples
//! are cached for the whole generation pass.

use glam::Vec3;

use crate::types::SampleValue;

/// Source of signed distance samples
pub trait SdfSampler {
    /// Sample the field at a world position
    fn sample(&self, position: Vec3) -> SampleValue;
}

impl<F> SdfSampler for F
where
    F: Fn(Vec3) -> SampleValue,
{
    #[inline(always)]
    fn sample(&self, position: Vec3) -> SampleValue {
        self(position)
    }
}

/// Adapter for exact distance functions
#[derive(Debug, Clone, Copy)]
pub struct ExactSdf<F>(pub F);

impl<F> SdfSampler for ExactSdf<F>
where
    F: Fn(Vec3) -> f32,
{
    #[inline(always)]
    fn sample(&self, position: Vec3) -> SampleValue {
        SampleValue::exact((self.0)(position))
    }
}

/// Wrap an exact distance function as a sampler
pub fn exact<F: Fn(Vec3) -> f32>(f: F) -> ExactSdf<F> {
    ExactSdf(f)
}

/// Central-difference gradient of the field, normalized.
///
/// Returns zero when the gradient vanishes. Counts as six off-lattice
/// samples.
#[inline(always)]
pub(crate) fn gradient_cd(sampler: &dyn SdfSampler, p: Vec3, eps: f32) -> Vec3 {
    let d = |q: Vec3| sampler.sample(q).distance;
    Vec3::new(
        d(p + Vec3::X * eps) - d(p - Vec3::X * eps),
        d(p + Vec3::Y * eps) - d(p - Vec3::Y * eps),
        d(p + Vec3::Z * eps) - d(p - Vec3::Z * eps),
    )
    .normalize_or_zero()
}

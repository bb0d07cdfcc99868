//! Dual sample cache
//!
//! Memoizes SDF samples by lattice coordinate so the up to 8 voxels sharing
//! a corner pay for one sampler call. There is no invalidation: the sampler
//! must be deterministic for the lifetime of a generation pass.

use std::collections::HashMap;

use crate::sampler::SdfSampler;
use crate::types::{lattice_to_world, LatticeCoord, SampleValue};

/// Lattice-keyed sample memo with hit/miss counters
#[derive(Debug, Default)]
pub struct DualSampleCache {
    samples: HashMap<LatticeCoord, SampleValue>,
    raw_count: u64,
    cache_count: u64,
}

impl DualSampleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the lattice point, calling `sampler` only on a miss
    #[inline]
    pub fn sample_dual(&mut self, sampler: &dyn SdfSampler, lattice: LatticeCoord) -> SampleValue {
        if let Some(value) = self.samples.get(&lattice) {
            self.cache_count += 1;
            return *value;
        }
        let value = sampler.sample(lattice_to_world(lattice));
        self.samples.insert(lattice, value);
        self.raw_count += 1;
        value
    }

    /// Number of distinct lattice points sampled
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sampler calls made through the cache
    pub fn raw_count(&self) -> u64 {
        self.raw_count
    }

    /// Lookups served from the cache
    pub fn cache_count(&self) -> u64 {
        self.cache_count
    }

    /// Pre-size for `additional` lattice points
    pub fn reserve(&mut self, additional: usize) {
        self.samples.reserve(additional);
    }

    /// Drop all samples and counters, keeping capacity
    pub fn clear(&mut self) {
        self.samples.clear();
        self.raw_count = 0;
        self.cache_count = 0;
    }
}

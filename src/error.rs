//! Extraction errors
//!
//! The only failure is running out of output budget. It aborts the octree
//! search but keeps whatever mesh was built up to that point.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Budget errors raised while emitting quads
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractError {
    /// Appending a quad would exceed `max_verts`
    #[error("vertex budget exceeded: {requested} requested, {max} allowed")]
    VertexBudget {
        /// Vertex count after the rejected quad
        requested: usize,
        /// Configured maximum
        max: usize,
    },

    /// Appending a quad would exceed `max_indices`
    #[error("index budget exceeded: {requested} requested, {max} allowed")]
    IndexBudget {
        /// Index count after the rejected quad
        requested: usize,
        /// Configured maximum
        max: usize,
    },
}

//! Error types for scene input.

use terra_raytrace::MeshError;
use thiserror::Error;

/// Errors raised while turning world data into geometry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Terrain side length of zero.
    #[error("terrain length must be at least 1")]
    EmptyTerrain,

    /// Height array does not cover the grid.
    #[error("terrain of length {length} needs {expected} heights, got {actual}")]
    HeightCount {
        /// Grid side length.
        length: usize,
        /// `length * length`.
        expected: usize,
        /// Heights supplied.
        actual: usize,
    },

    /// Generated or supplied mesh data is invalid.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

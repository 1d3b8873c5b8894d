//! Error types for bake setup.

use terra_scene::SceneError;
use thiserror::Error;

/// Errors raised while generating bake geometry, before the bake starts.
/// A running bake cannot fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BakeError {
    /// Terrain or block geometry could not be generated.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for bake operations.
pub type Result<T> = std::result::Result<T, BakeError>;

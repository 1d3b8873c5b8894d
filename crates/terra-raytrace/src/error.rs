//! Error types for mesh input validation.

use thiserror::Error;

/// Errors raised while validating mesh input handed over by an asset loader.
///
/// BVH construction and queries themselves never fail; these only guard the
/// boundary where untrusted index data enters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending triangle.
        triangle: usize,
        /// Offending vertex index.
        index: u16,
        /// Number of positions in the mesh.
        vertex_count: usize,
    },

    /// More vertices than 16-bit indices can address.
    #[error("mesh has {0} vertices, at most 65536 are addressable")]
    TooManyVertices(usize),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;

#![warn(missing_docs)]

//! World geometry for ray queries: terrain, blocks and placed models.
//!
//! # Architecture
//!
//! - [`Terrain`] - Square height grid, its triangulation and vertex normals
//! - [`Blocks`] - Boxes, ramps, quads, cylinders and cones as packed meshes
//! - [`Model`], [`SceneObject`], [`Layers`] - Shared model trees and their placements
//! - [`SceneGeometry`] - Gathers the relevant geometry for one query session
//! - [`pick_object`], [`point_inside_terrain_cut`] - Session queries built on it
//!
//! Generated meshes are split so no chunk exceeds 65,536 vertices, the
//! limit of 16-bit triangle indices.

pub mod assemble;
pub mod blocks;
pub mod error;
pub mod object;
pub mod pick;
pub mod terrain;
pub mod terrain_cut;

pub use assemble::{InstanceSource, SceneGeometry};
pub use blocks::{BlockBox, BlockCone, BlockCylinder, BlockPlacement, BlockQuad, BlockRamp, Blocks};
pub use error::{Result, SceneError};
pub use object::{Layers, Model, SceneObject};
pub use pick::{pick_object, PickHit};
pub use terrain::Terrain;
pub use terrain_cut::{point_inside_terrain_cut, TerrainCutBox};

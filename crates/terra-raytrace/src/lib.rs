#![warn(missing_docs)]

//! Ray queries against triangle meshes and placed mesh instances.
//!
//! # Architecture
//!
//! - [`intersect`] - Closed-form ray-primitive intersectors
//! - [`MeshBvh`] - Binned-SAH tree over one mesh's triangles
//! - [`InstanceBvh`] - Tree over rigidly placed [`MeshBvh`]s, built per query session
//! - [`Ray`], [`RayFlags`], [`RayHit`] - Query inputs and results
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terra_raytrace::{BvhOptions, Instance, InstanceBvh, MeshBvh, RayFlags};
//!
//! let bvh = MeshBvh::build(Arc::new(mesh), BvhOptions::default());
//! let instances = [Instance::new(&bvh, rotation, position)];
//! let scene = InstanceBvh::build(&instances);
//!
//! if let Some(hit) = scene.raycast(&origin, &direction, f32::MAX, RayFlags::default()) {
//!     println!("hit instance {} at {}", hit.instance, hit.distance);
//! }
//! ```

mod build;
pub mod bvh;
pub mod error;
pub mod intersect;
mod ray;
pub mod tlas;

pub use build::{BvhNode, TRAVERSAL_STACK_SIZE};
pub use bvh::{BvhOptions, MeshBvh, TriangleMesh, MAX_MESH_VERTICES};
pub use error::{MeshError, Result};
pub use ray::{Ray, RayFlags, RayHit, TraversalStats};
pub use tlas::{Instance, InstanceBvh, InstanceHit};

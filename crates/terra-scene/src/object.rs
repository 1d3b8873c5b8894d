//! Models, placed objects and layer visibility.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use terra_math::{Quat, RigidTransform, Vec3};
use terra_raytrace::{BvhOptions, MeshBvh, TriangleMesh};

/// Per-layer activity flags. Layers past the end are inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layers(pub Vec<bool>);

impl Layers {
    /// Every layer in `0..count` active.
    pub fn all(count: usize) -> Self {
        Self(vec![true; count])
    }

    /// Whether `layer` is active.
    pub fn is_active(&self, layer: usize) -> bool {
        self.0.get(layer).copied().unwrap_or(false)
    }

    /// Set a layer's flag, growing the table if needed.
    pub fn set(&mut self, layer: usize, active: bool) {
        if layer >= self.0.len() {
            self.0.resize(layer + 1, false);
        }
        self.0[layer] = active;
    }
}

impl Default for Layers {
    /// Only the base layer.
    fn default() -> Self {
        Self(vec![true])
    }
}

/// Ray-queryable geometry of one model asset.
///
/// Each mesh gets its own tree so a model with many parts still yields
/// small, tight boxes in the instance tree.
#[derive(Debug, Clone)]
pub struct Model {
    /// Asset name.
    pub name: String,
    /// One tree per mesh part.
    pub meshes: Vec<MeshBvh>,
    /// Closed mesh whose interior removes terrain, if the model has one.
    pub terrain_cut: Option<MeshBvh>,
}

impl Model {
    /// Build the per-part trees in parallel.
    pub fn build(
        name: impl Into<String>,
        meshes: Vec<TriangleMesh>,
        terrain_cut: Option<TriangleMesh>,
        options: BvhOptions,
    ) -> Self {
        let name = name.into();
        let meshes: Vec<MeshBvh> = meshes
            .into_par_iter()
            .map(|mesh| MeshBvh::build(Arc::new(mesh), options))
            .collect();
        // Cut meshes are counted two-sided, so culling must stay off.
        let terrain_cut = terrain_cut
            .map(|mesh| MeshBvh::build(Arc::new(mesh), BvhOptions { backface_cull: false }));

        log::debug!(
            "built model '{}': {} part(s), terrain cut: {}",
            name,
            meshes.len(),
            terrain_cut.is_some()
        );

        Self {
            name,
            meshes,
            terrain_cut,
        }
    }

    /// Total triangles over all parts.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|bvh| bvh.mesh().triangle_count()).sum()
    }
}

/// A model placed in the world.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Instance name.
    pub name: String,
    /// Shared model geometry.
    pub model: Arc<Model>,
    /// Local-to-world transform.
    pub transform: RigidTransform,
    /// Layer the object lives on.
    pub layer: usize,
    /// Hidden objects never take part in queries.
    pub hidden: bool,
}

impl SceneObject {
    /// A visible object on the base layer.
    pub fn new(name: impl Into<String>, model: Arc<Model>, rotation: Quat, position: Vec3) -> Self {
        Self {
            name: name.into(),
            model,
            transform: RigidTransform::new(rotation, position),
            layer: 0,
            hidden: false,
        }
    }

    /// Whether the object takes part in queries under `layers`.
    pub fn is_visible(&self, layers: &Layers) -> bool {
        !self.hidden && layers.is_active(self.layer)
    }
}

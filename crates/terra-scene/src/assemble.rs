//! Gathers the currently relevant geometry for one query session.
//!
//! [`SceneGeometry`] owns (or shares) every mesh tree; the session borrows
//! it to place instances and build the instance tree:
//!
//! ```ignore
//! let instances = geometry.instances();
//! let scene = InstanceBvh::build(&instances);
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use terra_math::RigidTransform;
use terra_raytrace::{BvhOptions, Instance, MeshBvh, TriangleMesh};

use crate::blocks::Blocks;
use crate::error::Result;
use crate::object::{Layers, Model, SceneObject};
use crate::terrain::Terrain;

/// Where an instance of the session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSource {
    /// Generated terrain or block chunk `index`.
    Chunk(usize),
    /// Part `part` of object placement `object`.
    Object {
        /// Index of the placement in insertion order.
        object: usize,
        /// Mesh part of the model.
        part: usize,
    },
}

/// Session geometry: generated world-space chunks plus placed models.
#[derive(Debug, Clone, Default)]
pub struct SceneGeometry {
    chunks: Vec<MeshBvh>,
    objects: Vec<(Arc<Model>, RigidTransform)>,
}

impl SceneGeometry {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the terrain grid as chunk meshes.
    pub fn add_terrain(&mut self, terrain: &Terrain) -> Result<()> {
        let meshes = terrain.chunk_meshes()?;
        log::debug!("terrain: {} chunk(s)", meshes.len());
        self.add_chunks(meshes);
        Ok(())
    }

    /// Add every block as packed chunk meshes.
    pub fn add_blocks(&mut self, blocks: &Blocks) -> Result<()> {
        let meshes = blocks.chunk_meshes()?;
        log::debug!("blocks: {} block(s) in {} chunk(s)", blocks.len(), meshes.len());
        self.add_chunks(meshes);
        Ok(())
    }

    /// Add world-space meshes. They are open surfaces, so culling is off.
    pub fn add_chunks(&mut self, meshes: Vec<TriangleMesh>) {
        let options = BvhOptions {
            backface_cull: false,
        };
        let built: Vec<MeshBvh> = meshes
            .into_par_iter()
            .map(|mesh| MeshBvh::build(Arc::new(mesh), options))
            .collect();
        self.chunks.extend(built);
    }

    /// Add every object visible under `layers`. Returns how many were added.
    pub fn add_objects(&mut self, objects: &[SceneObject], layers: &Layers) -> usize {
        let before = self.objects.len();
        self.objects.extend(
            objects
                .iter()
                .filter(|object| object.is_visible(layers))
                .map(|object| (Arc::clone(&object.model), object.transform)),
        );
        self.objects.len() - before
    }

    /// Generated chunk trees.
    pub fn chunks(&self) -> &[MeshBvh] {
        &self.chunks
    }

    /// Number of placed objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.objects.is_empty()
    }

    /// Place every tree for an instance-tree build: object parts first,
    /// then chunks at the identity transform.
    pub fn instances(&self) -> Vec<Instance<'_>> {
        self.instances_with_sources().into_iter().map(|(i, _)| i).collect()
    }

    /// [`Self::instances`] paired with where each one came from.
    pub fn instances_with_sources(&self) -> Vec<(Instance<'_>, InstanceSource)> {
        let parts: usize = self.objects.iter().map(|(m, _)| m.meshes.len()).sum();
        let mut out = Vec::with_capacity(parts + self.chunks.len());

        for (object, (model, transform)) in self.objects.iter().enumerate() {
            for (part, bvh) in model.meshes.iter().enumerate() {
                out.push((
                    Instance {
                        transform: *transform,
                        bvh,
                    },
                    InstanceSource::Object { object, part },
                ));
            }
        }

        for (index, bvh) in self.chunks.iter().enumerate() {
            out.push((Instance::identity(bvh), InstanceSource::Chunk(index)));
        }

        out
    }
}

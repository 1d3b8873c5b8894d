//! Object picking.

use terra_math::Vec3;
use terra_raytrace::{Instance, InstanceBvh, RayFlags};

use crate::object::{Layers, SceneObject};

/// Nearest object along a pick ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Distance along the ray.
    pub distance: f32,
    /// World-space face normal at the hit.
    pub normal: Vec3,
    /// Index into the object slice.
    pub object: usize,
}

/// Nearest visible object hit by the ray closer than `max_distance`.
///
/// Builds a throwaway instance tree over every part of every visible object.
pub fn pick_object(
    objects: &[SceneObject],
    layers: &Layers,
    origin: &Vec3,
    direction: &Vec3,
    max_distance: f32,
) -> Option<PickHit> {
    let mut instances = Vec::new();
    let mut owners = Vec::new();

    for (index, object) in objects.iter().enumerate() {
        if !object.is_visible(layers) {
            continue;
        }
        for bvh in &object.model.meshes {
            instances.push(Instance {
                transform: object.transform,
                bvh,
            });
            owners.push(index);
        }
    }

    if instances.is_empty() {
        return None;
    }

    let scene = InstanceBvh::build(&instances);
    let hit = scene.raycast(origin, direction, max_distance, RayFlags::default())?;

    Some(PickHit {
        distance: hit.distance,
        normal: hit.normal,
        object: owners[hit.instance],
    })
}

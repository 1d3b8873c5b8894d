//! Terrain-cut containment: is a point inside geometry that removes terrain?

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use terra_math::{Quat, Vec3};
use terra_raytrace::{Instance, InstanceBvh};

use crate::object::{Layers, SceneObject};

/// An oriented box that removes terrain inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainCutBox {
    /// Orientation of the box.
    pub rotation: Quat,
    /// Center of the box.
    pub position: Vec3,
    /// Half extents.
    pub size: Vec3,
}

impl TerrainCutBox {
    /// Inside or on the surface of the box.
    pub fn contains(&self, point: &Vec3) -> bool {
        let local = self.rotation.inverse() * (point - self.position);
        (0..3).all(|axis| local[axis].abs() <= self.size[axis])
    }
}

/// True when `point` lies inside a cut box or inside the terrain-cut mesh of
/// a visible object.
///
/// Mesh containment casts a ray from the point along `ray_direction` and
/// counts crossings; an odd count means inside. Pick a direction that does
/// not graze edges (a slightly tilted up vector works for terrain).
pub fn point_inside_terrain_cut(
    point: &Vec3,
    ray_direction: &Vec3,
    objects: &[SceneObject],
    layers: &Layers,
    cut_boxes: &[TerrainCutBox],
) -> bool {
    if cut_boxes.iter().any(|cut| cut.contains(point)) {
        return true;
    }

    let instances: Vec<Instance<'_>> = objects
        .iter()
        .filter(|object| object.is_visible(layers))
        .filter_map(|object| {
            object.model.terrain_cut.as_ref().map(|bvh| Instance {
                transform: object.transform,
                bvh,
            })
        })
        .collect();

    if instances.is_empty() {
        return false;
    }

    let scene = InstanceBvh::build(&instances);
    scene
        .for_each_candidate(point, ray_direction, |_, instance, origin, direction| {
            if instance.bvh.count_intersections(origin, direction) % 2 == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::cube_model;

    fn up() -> Vec3 {
        Vec3::new(0.013, 1.0, 0.021).normalize()
    }

    #[test]
    fn test_cut_box_contains() {
        let cut = TerrainCutBox {
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_4),
            position: Vec3::new(10.0, 0.0, 0.0),
            size: Vec3::new(1.0, 1.0, 1.0),
        };
        assert!(cut.contains(&Vec3::new(10.0, 0.5, 0.0)));
        // The rotated box reaches sqrt(2) along world X.
        assert!(cut.contains(&Vec3::new(11.3, 0.0, 0.0)));
        assert!(!cut.contains(&Vec3::new(11.0, 0.0, 0.9)));
        assert!(point_inside_terrain_cut(&Vec3::new(10.0, 0.0, 0.0), &up(), &[], &Layers::default(), &[cut]));
    }

    #[test]
    fn test_point_inside_cut_mesh() {
        let objects = [SceneObject::new(
            "cut",
            cube_model(2.0, true),
            Quat::identity(),
            Vec3::new(0.0, 0.0, -5.0),
        )];
        let layers = Layers::default();

        assert!(point_inside_terrain_cut(&Vec3::new(0.3, -0.5, -5.2), &up(), &objects, &layers, &[]));
        assert!(!point_inside_terrain_cut(&Vec3::new(0.3, -3.0, -5.2), &up(), &objects, &layers, &[]));
        assert!(!point_inside_terrain_cut(&Vec3::new(3.0, 0.0, -5.0), &up(), &objects, &layers, &[]));
    }

    #[test]
    fn test_objects_without_cut_or_hidden_are_ignored() {
        let plain = SceneObject::new("plain", cube_model(2.0, false), Quat::identity(), Vec3::zeros());
        let mut hidden = SceneObject::new("hidden", cube_model(2.0, true), Quat::identity(), Vec3::zeros());
        hidden.hidden = true;
        let point = Vec3::new(0.1, 0.2, 0.3);

        assert!(!point_inside_terrain_cut(&point, &up(), &[plain, hidden.clone()], &Layers::default(), &[]));

        hidden.hidden = false;
        assert!(point_inside_terrain_cut(&point, &up(), &[hidden], &Layers::default(), &[]));
    }
}

//! Instance BVH: a top-level tree over rigidly placed mesh BVHs.
//!
//! Built fresh for one query session (a pick, a terrain-cut test, a bake)
//! and dropped afterwards. Both the instance list and the mesh trees are
//! borrowed, so the borrow checker keeps them alive and in place for the
//! session.

use std::ops::ControlFlow;

use terra_math::{Aabb, Quat, RigidTransform, Vec3};

use crate::build::{self, BvhNode, Primitives, TRAVERSAL_STACK_SIZE};
use crate::{MeshBvh, Ray, RayFlags};

/// Centroid bins per axis. Matches the mesh builder; instance counts are
/// small enough that more bins buy nothing.
const INSTANCE_BINS: usize = 8;

/// A mesh BVH placed in the shared coordinate space.
#[derive(Debug, Clone, Copy)]
pub struct Instance<'a> {
    /// Local-to-world transform, inverse precomputed.
    pub transform: RigidTransform,
    /// The placed tree.
    pub bvh: &'a MeshBvh,
}

impl<'a> Instance<'a> {
    /// Place `bvh` with the given rotation and position.
    pub fn new(bvh: &'a MeshBvh, rotation: Quat, position: Vec3) -> Self {
        Self {
            transform: RigidTransform::new(rotation, position),
            bvh,
        }
    }

    /// An instance at the origin, for geometry already in world space.
    pub fn identity(bvh: &'a MeshBvh) -> Self {
        Self {
            transform: RigidTransform::identity(),
            bvh,
        }
    }

    /// The mesh's root box carried into world space. An empty mesh gets a
    /// point box at the instance position so it still has a centroid.
    pub fn world_bounds(&self) -> Aabb {
        let local = self.bvh.bounds();
        if local.is_empty() {
            let p = self.transform.position;
            return Aabb::new(p, p);
        }
        local.transformed(&self.transform.rotation, &self.transform.position)
    }
}

/// Hit on an instance, reported in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceHit {
    /// Distance along the world ray.
    pub distance: f32,
    /// Unit face normal in world space.
    pub normal: Vec3,
    /// Index into the instance slice the tree was built from.
    pub instance: usize,
}

struct InstanceBounds(Vec<Aabb>);

impl Primitives for InstanceBounds {
    fn primitive_count(&self) -> usize {
        self.0.len()
    }

    fn primitive_bounds(&self, index: u32) -> Aabb {
        self.0[index as usize]
    }

    fn primitive_centroid(&self, index: u32) -> Vec3 {
        self.0[index as usize].center()
    }
}

/// BVH over instances. Leaves index into the borrowed instance slice.
#[derive(Debug, Clone)]
pub struct InstanceBvh<'a> {
    nodes: Vec<BvhNode>,
    permutation: Vec<u32>,
    instances: &'a [Instance<'a>],
}

impl<'a> InstanceBvh<'a> {
    /// Build over the instances' world-space boxes.
    pub fn build(instances: &'a [Instance<'a>]) -> Self {
        let bounds = InstanceBounds(instances.iter().map(Instance::world_bounds).collect());
        let tree = build::build::<_, INSTANCE_BINS>(&bounds);

        log::debug!(
            "built instance BVH: {} instances, {} nodes, depth {}",
            instances.len(),
            tree.nodes.len(),
            tree.depth
        );

        Self {
            nodes: tree.nodes,
            permutation: tree.permutation,
            instances,
        }
    }

    /// The instances this tree was built over.
    pub fn instances(&self) -> &'a [Instance<'a>] {
        self.instances
    }

    /// The node arena; the root is node 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Leaf order of instance indices.
    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    /// Bounds of every instance.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or_else(Aabb::empty, |root| root.bounds)
    }

    /// Closest hit over all instances closer than `max_distance`, or with
    /// `accept_first_hit` the first one found.
    pub fn raycast(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        max_distance: f32,
        flags: RayFlags,
    ) -> Option<InstanceHit> {
        let root = self.nodes.first()?;
        let ray = Ray::new(*origin, *direction);
        ray.intersect_aabb(&root.bounds, max_distance)?;

        let mut closest = max_distance;
        let mut best = None;

        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if node.is_leaf() {
                for &index in &self.permutation[node.range()] {
                    let instance = &self.instances[index as usize];
                    let (local_origin, local_direction) = to_instance_space(instance, origin, direction);

                    let Some(hit) = instance
                        .bvh
                        .raycast(&local_origin, &local_direction, closest, flags)
                    else {
                        continue;
                    };

                    closest = hit.distance;
                    best = Some(InstanceHit {
                        distance: hit.distance,
                        normal: instance.transform.transform_vector(&hit.normal),
                        instance: index as usize,
                    });

                    if flags.accept_first_hit {
                        return best;
                    }
                }
                continue;
            }

            let left = node.left();
            let right = left + 1;
            let t_left = ray.intersect_aabb(&self.nodes[left].bounds, closest);
            let t_right = ray.intersect_aabb(&self.nodes[right].bounds, closest);

            match (t_left, t_right) {
                (Some(tl), Some(tr)) => {
                    let (near, far) = if tl <= tr { (left, right) } else { (right, left) };
                    stack[top] = far as u32;
                    stack[top + 1] = near as u32;
                    top += 2;
                }
                (Some(_), None) => {
                    stack[top] = left as u32;
                    top += 1;
                }
                (None, Some(_)) => {
                    stack[top] = right as u32;
                    top += 1;
                }
                (None, None) => {}
            }
        }

        best
    }

    /// True if anything lies on the ray closer than `max_distance`.
    pub fn is_occluded(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        max_distance: f32,
        flags: RayFlags,
    ) -> bool {
        let flags = RayFlags {
            accept_first_hit: true,
            ..flags
        };
        self.raycast(origin, direction, max_distance, flags).is_some()
    }

    /// Visit every instance whose world box the ray enters, nearer subtrees
    /// first, with the ray carried into that instance's space. The visitor
    /// ends the walk by returning `ControlFlow::Break`.
    pub fn for_each_candidate<B>(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        mut visit: impl FnMut(usize, &Instance<'a>, &Vec3, &Vec3) -> ControlFlow<B>,
    ) -> Option<B> {
        let root = self.nodes.first()?;
        let ray = Ray::new(*origin, *direction);
        ray.intersect_aabb(&root.bounds, f32::INFINITY)?;

        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if node.is_leaf() {
                for &index in &self.permutation[node.range()] {
                    let instance = &self.instances[index as usize];
                    if ray.intersect_aabb(&instance.world_bounds(), f32::INFINITY).is_none() {
                        continue;
                    }
                    let (local_origin, local_direction) = to_instance_space(instance, origin, direction);
                    if let ControlFlow::Break(b) =
                        visit(index as usize, instance, &local_origin, &local_direction)
                    {
                        return Some(b);
                    }
                }
                continue;
            }

            let left = node.left();
            let t_left = ray.intersect_aabb(&self.nodes[left].bounds, f32::INFINITY);
            let t_right = ray.intersect_aabb(&self.nodes[left + 1].bounds, f32::INFINITY);
            for (child, t) in [(left, t_left), (left + 1, t_right)] {
                if t.is_some() {
                    stack[top] = child as u32;
                    top += 1;
                }
            }
            if let (Some(tl), Some(tr)) = (t_left, t_right) {
                if tl < tr {
                    stack.swap(top - 1, top - 2);
                }
            }
        }

        None
    }
}

/// The ray in the instance's local frame. Rotation keeps the direction's
/// length, so local hit distances stay in the caller's units.
#[inline]
fn to_instance_space(instance: &Instance<'_>, origin: &Vec3, direction: &Vec3) -> (Vec3, Vec3) {
    let t = &instance.transform;
    (
        t.inverse_transform_point(origin),
        t.inverse_transform_vector(direction),
    )
}

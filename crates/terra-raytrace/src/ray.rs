//! Ray representation, query flags and hit records.

use terra_math::{Aabb, Vec3};

/// A ray in 3D space defined by origin and direction.
///
/// The direction is used as given; distances reported by queries are in
/// multiples of its length, so callers pass unit directions.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Direction of the ray.
    pub direction: Vec3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.map(|d| 1.0 / d),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against a box, limited to `[0, t_limit]`.
    ///
    /// Returns the entry distance (clamped to zero when the origin is inside).
    /// An axis the ray runs parallel to only checks the origin's slab.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb, t_limit: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = t_limit;

        for axis in 0..3 {
            if self.direction[axis] == 0.0 {
                if self.origin[axis] < aabb.min[axis] || self.origin[axis] > aabb.max[axis] {
                    return None;
                }
                continue;
            }

            let t1 = (aabb.min[axis] - self.origin[axis]) * self.inv_direction[axis];
            let t2 = (aabb.max[axis] - self.origin[axis]) * self.inv_direction[axis];

            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        (t_min <= t_max).then_some(t_min)
    }
}

/// Per-query switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayFlags {
    /// Reject triangles facing away from the ray on meshes built with culling.
    pub allow_backface_cull: bool,
    /// Stop at the first hit found instead of the closest.
    pub accept_first_hit: bool,
}

impl Default for RayFlags {
    fn default() -> Self {
        Self {
            allow_backface_cull: true,
            accept_first_hit: false,
        }
    }
}

impl RayFlags {
    /// Flags for "is anything in the way" queries: both faces block and the
    /// first hit ends the walk.
    pub fn shadow() -> Self {
        Self {
            allow_backface_cull: false,
            accept_first_hit: true,
        }
    }
}

/// Result of a mesh raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray.
    pub distance: f32,
    /// Unit face normal of the hit triangle.
    pub normal: Vec3,
}

/// Counters filled in by traversal, for profiling and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// BVH nodes popped off the traversal stack.
    pub nodes_visited: u32,
    /// Ray-triangle tests performed.
    pub triangles_tested: u32,
}

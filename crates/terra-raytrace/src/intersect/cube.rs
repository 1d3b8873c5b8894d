//! Ray-box intersection.

use terra_math::{Aabb, Vec3};

use super::MISS;

/// Entry and exit distances through a box, plus the normal of the face
/// crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxHit {
    /// Entry distance, negative when the origin is inside.
    pub t_near: f32,
    /// Exit distance, negative on a miss.
    pub t_far: f32,
    /// Entry face normal, or the exit face normal (facing back along the
    /// ray) when the origin is inside.
    pub normal: Vec3,
}

impl BoxHit {
    /// True if the ray touches the box in front of its origin.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t_far >= 0.0
    }
}

/// Intersect a ray with a box centered on the origin with the given half
/// size.
pub fn intersect_box(origin: &Vec3, direction: &Vec3, half_size: &Vec3) -> BoxHit {
    let miss = BoxHit {
        t_near: MISS,
        t_far: MISS,
        normal: Vec3::zeros(),
    };

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut near_axis = 0;
    let mut far_axis = 0;

    for axis in 0..3 {
        if direction[axis] == 0.0 {
            if origin[axis].abs() > half_size[axis] {
                return miss;
            }
            continue;
        }

        let m = 1.0 / direction[axis];
        let n = m * origin[axis];
        let k = m.abs() * half_size[axis];
        let t1 = -n - k;
        let t2 = -n + k;

        if t1 > t_near {
            t_near = t1;
            near_axis = axis;
        }
        if t2 < t_far {
            t_far = t2;
            far_axis = axis;
        }
    }

    if t_near > t_far || t_far < 0.0 {
        return miss;
    }

    let axis = if t_near > 0.0 { near_axis } else { far_axis };
    let mut normal = Vec3::zeros();
    normal[axis] = -direction[axis].signum();

    BoxHit {
        t_near,
        t_far,
        normal,
    }
}

/// Intersect a ray with an axis-aligned box given by its corners.
pub fn intersect_aabb(origin: &Vec3, direction: &Vec3, aabb: &Aabb) -> BoxHit {
    intersect_box(&(origin - aabb.center()), direction, &(aabb.extent() * 0.5))
}

//! Triangle-vs-frustum overlap, used for box selection.

use terra_math::frustum::{EDGES, FACES};
use terra_math::{Frustum, Vec3};

use super::intersect_triangle;

/// True if the segment `a -> b` crosses the triangle.
pub fn segment_intersects_triangle(a: &Vec3, b: &Vec3, v0: &Vec3, v1: &Vec3, v2: &Vec3) -> bool {
    let delta = b - a;
    let length = delta.norm();
    if length == 0.0 {
        return false;
    }

    let hit = intersect_triangle(a, &(delta / length), v0, v1, v2);
    hit.is_hit() && hit.t <= length
}

/// True if any part of the triangle lies inside the frustum.
///
/// Checks, in order of cost: a vertex inside the frustum, a triangle edge
/// crossing a frustum face, a frustum edge crossing the triangle. The last
/// case catches triangles large enough to cut through the frustum with all
/// three vertices outside it.
pub fn triangle_intersects_frustum(frustum: &Frustum, v0: &Vec3, v1: &Vec3, v2: &Vec3) -> bool {
    if [v0, v1, v2].iter().any(|v| frustum.contains_point(v)) {
        return true;
    }

    let c = &frustum.corners;

    for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
        for [i0, i1, i2, i3] in FACES {
            if segment_intersects_triangle(a, b, &c[i0], &c[i1], &c[i2])
                || segment_intersects_triangle(a, b, &c[i0], &c[i2], &c[i3])
            {
                return true;
            }
        }
    }

    EDGES
        .iter()
        .any(|&[i, j]| segment_intersects_triangle(&c[i], &c[j], v0, v1, v2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_math::Mat4;

    fn unit_frustum() -> Frustum {
        Frustum::from_inv_view_projection(&Mat4::identity())
    }

    #[test]
    fn test_vertex_inside() {
        let f = unit_frustum();
        assert!(triangle_intersects_frustum(
            &f,
            &Vec3::new(0.0, 0.0, 0.5),
            &Vec3::new(5.0, 0.0, 0.5),
            &Vec3::new(5.0, 5.0, 0.5),
        ));
    }

    #[test]
    fn test_edge_crosses_frustum() {
        let f = unit_frustum();
        assert!(triangle_intersects_frustum(
            &f,
            &Vec3::new(-5.0, 0.0, 0.3),
            &Vec3::new(5.0, 0.0, 0.3),
            &Vec3::new(5.0, 0.0, 0.6),
        ));
    }

    #[test]
    fn test_large_triangle_cuts_through() {
        let f = unit_frustum();
        assert!(triangle_intersects_frustum(
            &f,
            &Vec3::new(-50.0, -50.0, 0.5),
            &Vec3::new(50.0, -50.0, 0.5),
            &Vec3::new(0.0, 50.0, 0.5),
        ));
    }

    #[test]
    fn test_triangle_outside() {
        let f = unit_frustum();
        assert!(!triangle_intersects_frustum(
            &f,
            &Vec3::new(5.0, 5.0, 0.5),
            &Vec3::new(6.0, 5.0, 0.5),
            &Vec3::new(6.0, 6.0, 0.5),
        ));
    }

    #[test]
    fn test_segment_too_short() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let a = Vec3::new(0.2, 0.2, 2.0);
        assert!(!segment_intersects_triangle(&a, &Vec3::new(0.2, 0.2, 1.0), &v0, &v1, &v2));
        assert!(segment_intersects_triangle(&a, &Vec3::new(0.2, 0.2, -1.0), &v0, &v1, &v2));
    }
}
